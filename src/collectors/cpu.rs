use std::time::Duration;

use async_trait::async_trait;
#[cfg(not(target_os = "linux"))]
use sysinfo::System;

use super::{Collector, SampleError, Signal};

#[cfg(target_os = "linux")]
use super::linux;

/// CPU utilization averaged over all cores during `window`.
pub struct CpuCollector {
    window: Duration,
    #[cfg(not(target_os = "linux"))]
    system: System,
}

impl CpuCollector {
    pub fn new(window: Duration) -> Self {
        CpuCollector {
            window,
            #[cfg(not(target_os = "linux"))]
            system: System::new(),
        }
    }
}

#[async_trait]
impl Collector for CpuCollector {
    fn signal(&self) -> Signal {
        Signal::Cpu
    }

    async fn collect(&mut self) -> Result<f64, SampleError> {
        #[cfg(target_os = "linux")]
        {
            let before = linux::cpu::read_times()?;
            tokio::time::sleep(self.window).await;
            let after = linux::cpu::read_times()?;
            linux::cpu::busy_percent(before, after)
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.system.refresh_cpu_usage();
            tokio::time::sleep(self.window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
            self.system.refresh_cpu_usage();
            if self.system.cpus().is_empty() {
                return Err(SampleError::Empty("cpu"));
            }
            Ok(self.system.global_cpu_usage() as f64)
        }
    }
}
