//! Run both strategies on the same index and print them side by side.
//!
//! cargo run -p fibmem --example compare --release -- 32

use fibmem::{format_megabytes, naive, FibonacciMemo, PeakSampler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n: u64 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(30);

    let sampler = PeakSampler::for_process();

    let mut memo = FibonacciMemo::new();
    let memoized = sampler.measure(|| memo.fibonacci(n)).transpose()?;
    let plain = sampler.measure(|| naive::fibonacci(n)).transpose()?;
    assert_eq!(memoized.value, plain.value);

    println!("fibonacci({}) = {}", n, memoized.value);
    for (label, m) in [("memoized", &memoized), ("naive", &plain)] {
        println!(
            "{:<9} {:>10.4} s  {:>12}  ({} samples)",
            label,
            m.elapsed.as_secs_f64(),
            format_megabytes(m.peak_bytes),
            m.samples
        );
    }
    println!("memo computed {} of {} calls", memo.computations(), memo.calls());

    Ok(())
}
