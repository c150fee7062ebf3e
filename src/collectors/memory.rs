use async_trait::async_trait;
#[cfg(not(target_os = "linux"))]
use sysinfo::System;

use super::{Collector, SampleError, Signal};

#[cfg(target_os = "linux")]
use super::linux;
#[cfg(not(target_os = "linux"))]
use super::percent;

pub struct MemoryCollector {
    #[cfg(not(target_os = "linux"))]
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "linux"))]
            system: System::new(),
        }
    }
}

#[async_trait]
impl Collector for MemoryCollector {
    fn signal(&self) -> Signal {
        Signal::Memory
    }

    async fn collect(&mut self) -> Result<f64, SampleError> {
        #[cfg(target_os = "linux")]
        {
            linux::memory::read_used_percent()
        }

        #[cfg(not(target_os = "linux"))]
        {
            self.system.refresh_memory();
            percent(
                self.system.used_memory() as f64,
                self.system.total_memory() as f64,
                "memory",
            )
        }
    }
}
