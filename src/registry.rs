//! Last-value registers and their Prometheus registry.
//!
//! Every register is a `prometheus::Gauge`, an atomically updated `f64`.
//! The sampler is the only writer; HTTP handlers read through
//! [`Registers::render`]. Gauges start at `NaN` so a signal that has never
//! been sampled is distinguishable from a genuine zero reading.

use prometheus::{Encoder, Gauge, Registry, TextEncoder};
use tracing::{debug, error};

use crate::collectors::Signal;

pub const CPU_USAGE: &str = "host_cpu_usage_percent";
pub const MEMORY_USAGE: &str = "host_memory_usage_percent";
pub const DISK_USAGE: &str = "host_disk_usage_percent";
pub const LOAD_1M: &str = "host_load_average_1m";
pub const UPTIME: &str = "exporter_uptime_seconds";
pub const DEMO_RANDOM: &str = "demo_random_value";

pub const METRIC_NAMES: [&str; 6] = [
    CPU_USAGE,
    MEMORY_USAGE,
    DISK_USAGE,
    LOAD_1M,
    UPTIME,
    DEMO_RANDOM,
];

pub struct Registers {
    registry: Registry,
    cpu: Gauge,
    memory: Gauge,
    disk: Gauge,
    load1: Gauge,
    uptime: Gauge,
    demo: Gauge,
}

impl Registers {
    /// Builds and registers every gauge. Fails on a duplicate metric name.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cpu = register_gauge(
            &registry,
            CPU_USAGE,
            "CPU utilization over a 1 second window, in percent.",
        )?;
        let memory = register_gauge(
            &registry,
            MEMORY_USAGE,
            "Used memory as a share of total memory, in percent.",
        )?;
        let disk = register_gauge(
            &registry,
            DISK_USAGE,
            "Used space on the root filesystem, in percent.",
        )?;
        let load1 = register_gauge(&registry, LOAD_1M, "1-minute load average.")?;
        let uptime = register_gauge(&registry, UPTIME, "Seconds since the exporter started.")?;
        let demo = register_gauge(
            &registry,
            DEMO_RANDOM,
            "A random value updated every sampling cycle.",
        )?;
        debug!(metrics = ?METRIC_NAMES, "registered metrics");

        Ok(Self {
            registry,
            cpu,
            memory,
            disk,
            load1,
            uptime,
            demo,
        })
    }

    pub fn gauge(&self, signal: Signal) -> &Gauge {
        match signal {
            Signal::Cpu => &self.cpu,
            Signal::Memory => &self.memory,
            Signal::Disk => &self.disk,
            Signal::Load1 => &self.load1,
        }
    }

    pub fn uptime(&self) -> &Gauge {
        &self.uptime
    }

    pub fn demo(&self) -> &Gauge {
        &self.demo
    }

    /// Renders every register in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buffer) {
            error!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn register_gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<Gauge> {
    let gauge = Gauge::new(name, help)?;
    gauge.set(f64::NAN);
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Value of `name` in rendered exposition text.
#[cfg(test)]
pub(crate) fn scraped_value(body: &str, name: &str) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (metric, value) = line.split_once(' ')?;
            if metric == name {
                value.trim().parse().ok()
            } else {
                None
            }
        })
}
