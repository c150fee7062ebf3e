//! The sampling loop: refreshes every register once per cycle, then sleeps.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::collectors::Collector;
use crate::registry::Registers;

/// Pause between the end of one cycle and the start of the next.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

pub struct Sampler {
    registers: Arc<Registers>,
    collectors: Vec<Box<dyn Collector>>,
    started: Instant,
    interval: Duration,
    rng: SmallRng,
}

impl Sampler {
    pub fn new(registers: Arc<Registers>, collectors: Vec<Box<dyn Collector>>) -> Self {
        Self {
            registers,
            collectors,
            started: Instant::now(),
            interval: SAMPLE_INTERVAL,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Runs one sample cycle. A collector failure is logged and leaves its
    /// register at the previous value.
    pub async fn sample_once(&mut self) {
        for collector in &mut self.collectors {
            let signal = collector.signal();
            match collector.collect().await {
                Ok(value) => self.registers.gauge(signal).set(value),
                Err(e) => warn!(
                    signal = signal.name(),
                    error = %e,
                    "sampling failed, keeping previous value"
                ),
            }
        }

        self.registers.uptime().set(self.started.elapsed().as_secs_f64());
        self.registers.demo().set(self.rng.gen::<f64>() * 100.0);

        debug!("sample cycle complete");
    }

    /// Samples until `shutdown` changes or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "sampler started");

        loop {
            tokio::select! {
                _ = self.sample_once() => {}
                _ = shutdown.changed() => break,
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("sampler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tracing_subscriber::fmt::MakeWriter;

    use crate::collectors::{SampleError, Signal};
    use crate::registry::{self, Registers};

    /// Replays scripted results; repeats the last one once the script runs out.
    struct ScriptedCollector {
        signal: Signal,
        script: VecDeque<Result<f64, SampleError>>,
        last: Option<f64>,
    }

    impl ScriptedCollector {
        fn boxed(signal: Signal, script: Vec<Result<f64, SampleError>>) -> Box<dyn Collector> {
            Box::new(Self {
                signal,
                script: script.into(),
                last: None,
            })
        }
    }

    #[async_trait]
    impl Collector for ScriptedCollector {
        fn signal(&self) -> Signal {
            self.signal
        }

        async fn collect(&mut self) -> Result<f64, SampleError> {
            match self.script.pop_front() {
                Some(Ok(value)) => {
                    self.last = Some(value);
                    Ok(value)
                }
                Some(Err(e)) => Err(e),
                None => self.last.ok_or(SampleError::Empty("script")),
            }
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn failure() -> SampleError {
        SampleError::Io {
            path: "/proc/meminfo",
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        }
    }

    fn sampler(collectors: Vec<Box<dyn Collector>>) -> (Sampler, Arc<Registers>) {
        let registers = Arc::new(Registers::new().unwrap());
        (Sampler::new(registers.clone(), collectors), registers)
    }

    #[tokio::test]
    async fn test_successful_sample_is_stored_verbatim() {
        let (mut sampler, registers) = sampler(vec![
            ScriptedCollector::boxed(Signal::Cpu, vec![Ok(12.345678)]),
            ScriptedCollector::boxed(Signal::Memory, vec![Ok(55.5)]),
            ScriptedCollector::boxed(Signal::Disk, vec![Ok(0.0)]),
            ScriptedCollector::boxed(Signal::Load1, vec![Ok(3.07)]),
        ]);

        sampler.sample_once().await;

        assert_eq!(registers.gauge(Signal::Cpu).get(), 12.345678);
        assert_eq!(registers.gauge(Signal::Memory).get(), 55.5);
        assert_eq!(registers.gauge(Signal::Disk).get(), 0.0);
        assert_eq!(registers.gauge(Signal::Load1).get(), 3.07);
    }

    #[tokio::test]
    async fn test_failed_sample_keeps_previous_value() {
        let (mut sampler, registers) = sampler(vec![
            ScriptedCollector::boxed(Signal::Cpu, vec![Ok(10.0), Ok(20.0)]),
            ScriptedCollector::boxed(Signal::Memory, vec![Ok(40.0), Err(failure())]),
        ]);

        sampler.sample_once().await;
        assert_eq!(registers.gauge(Signal::Memory).get(), 40.0);

        sampler.sample_once().await;
        assert_eq!(registers.gauge(Signal::Memory).get(), 40.0);
        assert_eq!(registers.gauge(Signal::Cpu).get(), 20.0);
    }

    #[tokio::test]
    async fn test_failure_before_first_sample_stays_unsampled() {
        let (mut sampler, registers) = sampler(vec![ScriptedCollector::boxed(
            Signal::Disk,
            vec![Err(SampleError::Empty("disk"))],
        )]);

        sampler.sample_once().await;

        assert!(registers.gauge(Signal::Disk).get().is_nan());
    }

    #[tokio::test]
    async fn test_failure_is_logged_with_signal_and_error() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (mut sampler, registers) = sampler(vec![ScriptedCollector::boxed(
            Signal::Memory,
            vec![Ok(33.0), Err(failure())],
        )]);
        sampler.sample_once().await;
        let before = registry::scraped_value(&registers.render(), registry::MEMORY_USAGE);
        sampler.sample_once().await;
        let after = registry::scraped_value(&registers.render(), registry::MEMORY_USAGE);

        assert_eq!(before, Some(33.0));
        assert_eq!(after, before);

        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("signal=\"memory\""), "{output}");
        assert!(output.contains("failed to read /proc/meminfo: gone"), "{output}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_uptime_is_set_every_cycle_despite_failures() {
        let (mut sampler, registers) = sampler(vec![
            ScriptedCollector::boxed(Signal::Cpu, vec![Err(SampleError::Empty("cpu"))]),
            ScriptedCollector::boxed(Signal::Memory, vec![Err(failure())]),
        ]);

        sampler.sample_once().await;
        let first = registers.uptime().get();
        assert!(first >= 0.0 && first < 0.5, "uptime at start: {first}");

        tokio::time::advance(SAMPLE_INTERVAL).await;
        sampler.sample_once().await;
        let second = registers.uptime().get();
        assert!(
            second >= first + SAMPLE_INTERVAL.as_secs_f64() - 0.01,
            "uptime after interval: {second}"
        );

        sampler.sample_once().await;
        assert!(registers.uptime().get() >= second);
    }

    #[tokio::test]
    async fn test_demo_value_is_in_range() {
        let (mut sampler, registers) = sampler(Vec::new());
        for _ in 0..50 {
            sampler.sample_once().await;
            let value = registers.demo().get();
            assert!((0.0..100.0).contains(&value), "demo value {value}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_samples_each_interval_and_stops_on_shutdown() {
        let (sampler, registers) = sampler(vec![ScriptedCollector::boxed(
            Signal::Load1,
            vec![Ok(1.0), Ok(2.0), Ok(3.0)],
        )]);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sampler.run(shutdown_rx));

        // First cycle runs immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(registers.gauge(Signal::Load1).get(), 1.0);

        tokio::time::sleep(SAMPLE_INTERVAL).await;
        assert_eq!(registers.gauge(Signal::Load1).get(), 2.0);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(SAMPLE_INTERVAL * 2).await;
        assert_eq!(registers.gauge(Signal::Load1).get(), 2.0);
    }

    #[tokio::test]
    async fn test_run_stops_when_sender_is_dropped() {
        let (sampler, _registers) = sampler(Vec::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sampler.run(shutdown_rx));
        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sampler did not stop")
            .unwrap();
    }
}
