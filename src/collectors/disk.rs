use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(not(unix))]
use sysinfo::Disks;

use super::{percent, Collector, SampleError, Signal};

/// Used space on the filesystem mounted at `mount_point`.
pub struct DiskCollector {
    mount_point: PathBuf,
}

impl DiskCollector {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        DiskCollector {
            mount_point: mount_point.into(),
        }
    }

    pub fn root() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl Collector for DiskCollector {
    fn signal(&self) -> Signal {
        Signal::Disk
    }

    async fn collect(&mut self) -> Result<f64, SampleError> {
        #[cfg(unix)]
        {
            used_percent(statvfs(&self.mount_point)?)
        }

        #[cfg(not(unix))]
        {
            // Re-listed every cycle so remounts are picked up.
            let disks = Disks::new_with_refreshed_list();
            let usage = disks
                .list()
                .iter()
                .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space()));
            mount_used_percent(&self.mount_point, usage)
        }
    }
}

/// Block counts of one filesystem, all in fragment-size units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsStats {
    pub blocks: u64,
    /// Free blocks, including those reserved for root.
    pub bfree: u64,
    /// Free blocks available to unprivileged users.
    pub bavail: u64,
}

/// Used share as `df` reports it: `used / (used + bavail)` with
/// `used = blocks - bfree`, so root-reserved blocks count as neither.
pub fn used_percent(stats: FsStats) -> Result<f64, SampleError> {
    let used = stats.blocks.saturating_sub(stats.bfree);
    percent(used as f64, (used + stats.bavail) as f64, "disk")
}

#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
fn statvfs(path: &Path) -> Result<FsStats, SampleError> {
    use std::ffi::CString;
    use std::io;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| SampleError::Parse {
        path: "statvfs",
        detail: e.to_string(),
    })?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: `c_path` is NUL-terminated and `stat` is a writable statvfs.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(SampleError::Io {
            path: "statvfs",
            source: io::Error::last_os_error(),
        });
    }
    // SAFETY: statvfs returned 0, so the struct is initialized.
    let stat = unsafe { stat.assume_init() };

    Ok(FsStats {
        blocks: stat.f_blocks as u64,
        bfree: stat.f_bfree as u64,
        bavail: stat.f_bavail as u64,
    })
}

/// Finds `mount_point` among `(mount point, total bytes, available bytes)`
/// entries and returns its used share.
#[cfg(not(unix))]
pub fn mount_used_percent<'a, I>(mount_point: &Path, disks: I) -> Result<f64, SampleError>
where
    I: IntoIterator<Item = (&'a Path, u64, u64)>,
{
    let (_, total, available) = disks
        .into_iter()
        .find(|(mount, _, _)| *mount == mount_point)
        .ok_or(SampleError::Empty("disk"))?;
    let used = total.saturating_sub(available);
    percent(used as f64, total as f64, "disk")
}
