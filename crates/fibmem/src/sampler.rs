//! Peak resident memory sampling around a synchronous operation.
//!
//! A scoped worker thread polls a [`MemoryProbe`] on a fixed interval while the
//! caller's thread runs the operation. The worker waits on a stop channel with
//! the interval as timeout, so it exits as soon as the operation returns rather
//! than after a full extra interval.
//!
//! Sampling is periodic: an operation shorter than one interval may finish
//! before the first sample and report a peak of zero.

use crate::memory::{MemoryError, MemoryProbe, ProcessMemory};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;
pub const SAMPLE_INTERVAL_ENV: &str = "FIBMEM_SAMPLE_INTERVAL_MS";

const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
        }
    }
}

impl SamplerConfig {
    /// Interval from `FIBMEM_SAMPLE_INTERVAL_MS`, falling back to the default
    /// when unset, unparsable or zero.
    pub fn from_env() -> Self {
        let interval_ms = parse_interval_ms(std::env::var(SAMPLE_INTERVAL_ENV).ok().as_deref())
            .unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS);

        Self {
            interval: Duration::from_millis(interval_ms),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

fn parse_interval_ms(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse().ok().filter(|ms| *ms > 0)
}

/// Outcome of one sampled run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement<R> {
    /// Whatever the operation returned.
    pub value: R,
    /// Wall-clock time of the operation alone, without thread setup and join.
    pub elapsed: Duration,
    /// Largest resident size observed, 0 if no sample succeeded.
    pub peak_bytes: u64,
    /// Successful probe readings.
    pub samples: u64,
    /// Probe readings that failed and were counted as zero.
    pub failed_samples: u64,
}

impl<T, E> Measurement<Result<T, E>> {
    /// Lift a fallible operation's error out of the measurement.
    pub fn transpose(self) -> Result<Measurement<T>, E> {
        Ok(Measurement {
            value: self.value?,
            elapsed: self.elapsed,
            peak_bytes: self.peak_bytes,
            samples: self.samples,
            failed_samples: self.failed_samples,
        })
    }
}

#[derive(Debug, Default)]
struct PeakTracker {
    peak: AtomicU64,
    samples: AtomicU64,
    failed: AtomicU64,
}

impl PeakTracker {
    fn record(&self, reading: Result<u64, MemoryError>) {
        match reading {
            Ok(bytes) => {
                self.peak.fetch_max(bytes, Ordering::Relaxed);
                self.samples.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // a failed reading counts as zero, which never raises the peak
                warn!(error = %e, "failed to read resident memory");
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Runs an operation while tracking the peak resident memory reported by `P`.
#[derive(Debug, Clone)]
pub struct PeakSampler<P = ProcessMemory> {
    probe: P,
    config: SamplerConfig,
}

impl PeakSampler<ProcessMemory> {
    /// Sampler over the current process, configured from the environment.
    pub fn for_process() -> Self {
        Self::new(ProcessMemory, SamplerConfig::from_env())
    }
}

impl<P: MemoryProbe> PeakSampler<P> {
    /// Intervals below 1ms are raised to 1ms.
    pub fn new(probe: P, mut config: SamplerConfig) -> Self {
        config.interval = config.interval.max(MIN_SAMPLE_INTERVAL);
        Self { probe, config }
    }

    pub fn config(&self) -> SamplerConfig {
        self.config
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Run `operation` once on the calling thread and return its value with the
    /// observed peak.
    ///
    /// Blocks until the sampler thread has stopped. A panic in `operation` stops
    /// the sampler and is propagated to the caller. If the sampler thread can't
    /// be spawned, `operation` still runs and the peak is reported as 0.
    pub fn measure<R, F>(&self, operation: F) -> Measurement<R>
    where
        F: FnOnce() -> R,
    {
        let tracker = PeakTracker::default();
        let interval = self.config.interval;

        let measurement = thread::scope(|scope| {
            let (stop_tx, stop_rx) = bounded::<()>(1);
            let probe = &self.probe;
            let tracker = &tracker;

            let spawned = thread::Builder::new()
                .name("fm-sampler".into())
                .spawn_scoped(scope, move || sample_loop(probe, stop_rx, interval, tracker));

            let worker = match spawned {
                Ok(worker) => worker,
                Err(e) => {
                    warn!(error = %e, "failed to spawn memory sampler, running unsampled");
                    return measure_unsampled(operation);
                }
            };

            debug!(interval_ms = interval.as_millis() as u64, "memory sampler started");

            let start = Instant::now();
            let value = operation();
            let elapsed = start.elapsed();

            let _ = stop_tx.send(());
            if let Err(payload) = worker.join() {
                std::panic::resume_unwind(payload);
            }

            Measurement {
                value,
                elapsed,
                peak_bytes: tracker.peak.load(Ordering::Relaxed),
                samples: tracker.samples.load(Ordering::Relaxed),
                failed_samples: tracker.failed.load(Ordering::Relaxed),
            }
        });

        debug!(
            peak_bytes = measurement.peak_bytes,
            samples = measurement.samples,
            failed_samples = measurement.failed_samples,
            "memory sampler stopped"
        );

        measurement
    }
}

fn measure_unsampled<R, F>(operation: F) -> Measurement<R>
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let value = operation();

    Measurement {
        value,
        elapsed: start.elapsed(),
        peak_bytes: 0,
        samples: 0,
        failed_samples: 0,
    }
}

fn sample_loop<P: MemoryProbe>(
    probe: &P,
    stop_rx: Receiver<()>,
    interval: Duration,
    tracker: &PeakTracker,
) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => tracker.record(probe.resident_bytes()),
            // a dropped sender means the operation unwound
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Peak resident bytes of the current process while `operation` runs.
pub fn measure_peak_memory<F>(operation: F) -> u64
where
    F: FnOnce(),
{
    PeakSampler::for_process().measure(operation).peak_bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Mutex;

    /// Replays a fixed script of readings, repeating the last one. `None` is a
    /// failed reading.
    struct ScriptedProbe {
        script: Vec<Option<u64>>,
        served: Mutex<Vec<Option<u64>>>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Option<u64>>) -> Self {
            Self {
                script,
                served: Mutex::new(Vec::new()),
            }
        }

        fn served(&self) -> Vec<Option<u64>> {
            self.served.lock().unwrap().clone()
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn resident_bytes(&self) -> Result<u64, MemoryError> {
            let mut served = self.served.lock().unwrap();
            let idx = served.len().min(self.script.len() - 1);
            let reading = self.script[idx];
            served.push(reading);
            reading.ok_or(MemoryError::Unsupported)
        }
    }

    fn fast_config() -> SamplerConfig {
        SamplerConfig::default().with_interval(Duration::from_millis(5))
    }

    #[test]
    fn peak_is_max_of_all_samples() {
        let probe = ScriptedProbe::new(vec![Some(10), Some(500), Some(30), Some(20)]);
        let sampler = PeakSampler::new(&probe, fast_config());

        let m = sampler.measure(|| thread::sleep(Duration::from_millis(100)));

        let served: Vec<u64> = probe.served().into_iter().flatten().collect();
        assert!(served.len() >= 2, "expected several samples, got {served:?}");
        assert_eq!(m.samples, served.len() as u64);
        for reading in &served {
            assert!(m.peak_bytes >= *reading);
        }
        assert_eq!(m.peak_bytes, *served.iter().max().unwrap());
    }

    #[test]
    fn failed_readings_are_counted_not_fatal() {
        let probe = ScriptedProbe::new(vec![None, Some(42), None]);
        let sampler = PeakSampler::new(&probe, fast_config());

        let m = sampler.measure(|| {
            thread::sleep(Duration::from_millis(100));
            "done"
        });

        assert_eq!(m.value, "done");
        assert!(m.failed_samples >= 1);
        assert_eq!(m.samples, 1);
        assert_eq!(m.peak_bytes, 42);
    }

    #[test]
    fn all_failures_report_zero_peak() {
        let probe = ScriptedProbe::new(vec![None]);
        let sampler = PeakSampler::new(&probe, fast_config());

        let m = sampler.measure(|| thread::sleep(Duration::from_millis(30)));

        assert_eq!(m.peak_bytes, 0);
        assert_eq!(m.samples, 0);
        assert!(m.failed_samples >= 1);
    }

    #[test]
    fn stops_promptly_after_operation() {
        let probe = ScriptedProbe::new(vec![Some(1)]);
        let sampler = PeakSampler::new(
            &probe,
            SamplerConfig::default().with_interval(Duration::from_secs(5)),
        );

        let start = Instant::now();
        let m = sampler.measure(|| 7);

        assert_eq!(m.value, 7);
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "sampler waited {:?}",
            start.elapsed()
        );
        assert_eq!(m.samples, 0);
        assert_eq!(m.peak_bytes, 0);
    }

    #[test]
    fn elapsed_covers_operation() {
        let probe = ScriptedProbe::new(vec![Some(1)]);
        let sampler = PeakSampler::new(&probe, fast_config());

        let m = sampler.measure(|| thread::sleep(Duration::from_millis(20)));

        assert!(m.elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn panicking_operation_stops_sampler() {
        let probe = ScriptedProbe::new(vec![Some(1)]);
        let sampler = PeakSampler::new(&probe, fast_config());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sampler.measure(|| -> u8 {
                thread::sleep(Duration::from_millis(15));
                panic!("operation failed")
            })
        }));

        assert!(result.is_err());
        let served = probe.served().len();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(probe.served().len(), served, "sampler kept running");
    }

    #[test]
    fn transpose_keeps_stats() {
        let ok: Measurement<Result<u8, &str>> = Measurement {
            value: Ok(3),
            elapsed: Duration::from_millis(2),
            peak_bytes: 10,
            samples: 4,
            failed_samples: 1,
        };
        let m = ok.transpose().unwrap();
        assert_eq!((m.value, m.peak_bytes, m.samples, m.failed_samples), (3, 10, 4, 1));

        let err: Measurement<Result<u8, &str>> = Measurement {
            value: Err("boom"),
            elapsed: Duration::ZERO,
            peak_bytes: 0,
            samples: 0,
            failed_samples: 0,
        };
        assert_eq!(err.transpose().unwrap_err(), "boom");
    }

    #[test]
    fn unsampled_fallback_still_runs_operation() {
        let mut runs = 0;
        let m = measure_unsampled(|| {
            runs += 1;
            thread::sleep(Duration::from_millis(10));
            "ran"
        });

        assert_eq!(runs, 1);
        assert_eq!(m.value, "ran");
        assert!(m.elapsed >= Duration::from_millis(10));
        assert_eq!((m.peak_bytes, m.samples, m.failed_samples), (0, 0, 0));
    }

    #[test]
    fn zero_interval_is_raised() {
        let sampler = PeakSampler::new(
            ProcessMemory,
            SamplerConfig::default().with_interval(Duration::ZERO),
        );
        assert_eq!(sampler.config().interval, MIN_SAMPLE_INTERVAL);
    }

    #[test]
    fn interval_parsing() {
        assert_eq!(parse_interval_ms(Some("250")), Some(250));
        assert_eq!(parse_interval_ms(Some(" 10 ")), Some(10));
        assert_eq!(parse_interval_ms(Some("0")), None);
        assert_eq!(parse_interval_ms(Some("-5")), None);
        assert_eq!(parse_interval_ms(Some("fast")), None);
        assert_eq!(parse_interval_ms(None), None);
    }

    #[test]
    fn default_interval() {
        assert_eq!(
            SamplerConfig::default().interval,
            Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS)
        );
    }
}
