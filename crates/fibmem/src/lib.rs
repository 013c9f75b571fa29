//! Compare naive and memoized Fibonacci while measuring wall-clock time and
//! peak resident memory.
//!
//! The interesting part is [`PeakSampler`]: it runs a caller-supplied operation
//! synchronously while a background worker polls the process resident set size
//! and keeps the maximum it has seen.
//!
//! ```rust
//! use fibmem::{FibonacciMemo, PeakSampler};
//!
//! let mut memo = FibonacciMemo::new();
//! let sampler = PeakSampler::for_process();
//! let measurement = sampler.measure(|| memo.fibonacci(30));
//!
//! assert_eq!(measurement.value.unwrap(), 832040);
//! println!("peak: {} bytes", measurement.peak_bytes);
//! ```

pub mod memo;
pub mod memory;
pub mod naive;
pub mod output;
pub mod sampler;

pub use memo::{FibonacciError, FibonacciMemo, MAX_INDEX};
pub use memory::{MemoryError, MemoryProbe, ProcessMemory};
pub use output::{format_megabytes, Format, Report, Strategy};
pub use sampler::{measure_peak_memory, Measurement, PeakSampler, SamplerConfig};
