use std::fs;
use std::io::{BufRead, BufReader};

use crate::collectors::{percent, SampleError};

const PROC_STAT: &str = "/proc/stat";

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl std::ops::Sub for CpuTimes {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self {
            user: self.user.saturating_sub(other.user),
            nice: self.nice.saturating_sub(other.nice),
            system: self.system.saturating_sub(other.system),
            idle: self.idle.saturating_sub(other.idle),
            iowait: self.iowait.saturating_sub(other.iowait),
            irq: self.irq.saturating_sub(other.irq),
            softirq: self.softirq.saturating_sub(other.softirq),
            steal: self.steal.saturating_sub(other.steal),
        }
    }
}

impl CpuTimes {
    // guest and guest_nice are already counted in user and nice.
    fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    fn busy(&self) -> u64 {
        self.total() - self.idle - self.iowait
    }
}

/// Reads the aggregate `cpu` line of `/proc/stat`.
pub fn read_times() -> Result<CpuTimes, SampleError> {
    let file = fs::File::open(PROC_STAT).map_err(SampleError::io(PROC_STAT))?;
    parse_times(BufReader::new(file))
}

pub fn parse_times<R: BufRead>(reader: R) -> Result<CpuTimes, SampleError> {
    for line in reader.lines() {
        let line = line.map_err(SampleError::io(PROC_STAT))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"cpu") {
            continue;
        }
        if parts.len() < 9 {
            return Err(SampleError::Parse {
                path: PROC_STAT,
                detail: format!("expected at least 8 counters, got {}", parts.len() - 1),
            });
        }

        let field = |i: usize| -> Result<u64, SampleError> {
            parts[i].parse().map_err(|e| SampleError::Parse {
                path: PROC_STAT,
                detail: format!("field {i} ({}): {e}", parts[i]),
            })
        };

        return Ok(CpuTimes {
            user: field(1)?,
            nice: field(2)?,
            system: field(3)?,
            idle: field(4)?,
            iowait: field(5)?,
            irq: field(6)?,
            softirq: field(7)?,
            steal: field(8)?,
        });
    }

    Err(SampleError::Empty("cpu"))
}

/// Busy share of the interval between two snapshots.
pub fn busy_percent(before: CpuTimes, after: CpuTimes) -> Result<f64, SampleError> {
    let delta = after - before;
    let busy = percent(delta.busy() as f64, delta.total() as f64, "cpu")?;
    Ok(busy.clamp(0.0, 100.0))
}
