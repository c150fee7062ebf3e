use async_trait::async_trait;
#[cfg(not(target_os = "linux"))]
use sysinfo::System;

use super::{Collector, SampleError, Signal};

#[cfg(target_os = "linux")]
use super::linux;

/// 1-minute load average.
pub struct LoadCollector;

impl LoadCollector {
    pub fn new() -> Self {
        LoadCollector
    }
}

#[async_trait]
impl Collector for LoadCollector {
    fn signal(&self) -> Signal {
        Signal::Load1
    }

    async fn collect(&mut self) -> Result<f64, SampleError> {
        #[cfg(target_os = "linux")]
        {
            linux::load::read_load_1m()
        }

        #[cfg(not(target_os = "linux"))]
        {
            // sysinfo reports zeros on platforms without a load average.
            if cfg!(windows) || !sysinfo::IS_SUPPORTED_SYSTEM {
                return Err(SampleError::Empty("load1"));
            }
            Ok(System::load_average().one)
        }
    }
}
