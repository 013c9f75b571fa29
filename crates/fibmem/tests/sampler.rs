#[cfg(test)]
pub mod tests {
    use fibmem::{
        measure_peak_memory, FibonacciMemo, PeakSampler, ProcessMemory, SamplerConfig,
    };
    use std::hint::black_box;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    #[test]
    fn test_noop_returns_quickly() {
        let start = Instant::now();
        // a noop may finish before the first sample, so any peak is valid
        let _peak = measure_peak_memory(|| {});
        assert!(
            start.elapsed() < Duration::from_secs(1),
            "noop measurement took {:?}",
            start.elapsed()
        );
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    fn test_peak_includes_held_allocation() {
        const SIZE: usize = 64 * 1024 * 1024;

        let sampler = PeakSampler::new(
            ProcessMemory,
            SamplerConfig::default().with_interval(Duration::from_millis(10)),
        );

        let m = sampler
            .measure(|| {
                let buffer = black_box(vec![7u8; SIZE]);
                sleep(Duration::from_millis(100));
                buffer.len()
            });

        assert_eq!(m.value, SIZE);
        assert!(m.samples > 0, "expected at least one sample");
        assert_eq!(m.failed_samples, 0);
        assert!(
            m.peak_bytes >= SIZE as u64,
            "peak {} should cover the {} byte buffer",
            m.peak_bytes,
            SIZE
        );
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    fn test_real_process_is_sampled() {
        let sampler = PeakSampler::new(
            ProcessMemory,
            SamplerConfig::default().with_interval(Duration::from_millis(5)),
        );

        let m = sampler.measure(|| sleep(Duration::from_millis(50)));

        assert!(m.samples > 0, "expected at least one sample");
        assert_eq!(m.failed_samples, 0);
        assert!(m.peak_bytes > 0, "a running process has a nonzero rss");
    }

    #[test]
    fn test_memoized_fibonacci_30_under_sampler() {
        let mut memo = FibonacciMemo::new();
        let sampler = PeakSampler::new(ProcessMemory, SamplerConfig::default());

        let m = sampler
            .measure(|| memo.fibonacci(30))
            .transpose()
            .expect("fibonacci(30) fits in u128");

        assert_eq!(m.value, 832_040);
        assert!(m.elapsed < Duration::from_secs(1), "took {:?}", m.elapsed);
        assert_eq!(memo.len(), 31);
    }
}
