#[cfg(target_os = "linux")]
pub mod linux;

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod system;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use cpu::CpuCollector;
use disk::DiskCollector;
use memory::MemoryCollector;
use system::LoadCollector;

/// Measurement window for CPU utilization.
pub const CPU_WINDOW: Duration = Duration::from_secs(1);

/// OS-sourced signals, one register each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Cpu,
    Memory,
    Disk,
    Load1,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Cpu => "cpu",
            Signal::Memory => "memory",
            Signal::Disk => "disk",
            Signal::Load1 => "load1",
        }
    }
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("malformed {path}: {detail}")]
    Parse { path: &'static str, detail: String },
    #[error("no data reported for {0}")]
    Empty(&'static str),
}

impl SampleError {
    pub(crate) fn io(path: &'static str) -> impl FnOnce(io::Error) -> SampleError {
        move |source| SampleError::Io { path, source }
    }
}

/// A source for one signal. Each call returns the freshly observed value or
/// the reason no value could be observed.
#[async_trait]
pub trait Collector: Send {
    fn signal(&self) -> Signal;
    async fn collect(&mut self) -> Result<f64, SampleError>;
}

/// The fixed collector set sampled every cycle.
pub fn default_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(CpuCollector::new(CPU_WINDOW)),
        Box::new(MemoryCollector::new()),
        Box::new(DiskCollector::root()),
        Box::new(LoadCollector::new()),
    ]
}

/// `part / total` as a percentage, or `Empty` when `total` is zero.
pub(crate) fn percent(part: f64, total: f64, what: &'static str) -> Result<f64, SampleError> {
    if total <= 0.0 {
        return Err(SampleError::Empty(what));
    }
    Ok(part / total * 100.0)
}
