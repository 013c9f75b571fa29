//! Memoized Fibonacci with a caller-owned cache.

use std::collections::HashMap;
use thiserror::Error;

/// Largest index whose Fibonacci number fits in a `u128`.
pub const MAX_INDEX: u64 = 186;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FibonacciError {
    #[error("fibonacci({n}) does not fit in 128 bits (max index is {MAX_INDEX})")]
    Overflow { n: u64 },
}

/// Fibonacci cache keyed by index.
///
/// Entries are never evicted. Every stored value is the true Fibonacci number
/// for its index, base cases included, so after `fibonacci(n)` the cache holds
/// all indices `0..=n`.
#[derive(Debug, Default)]
pub struct FibonacciMemo {
    cache: HashMap<u64, u128>,
    calls: u64,
    computations: u64,
}

impl FibonacciMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the nth Fibonacci number, reusing and filling the cache.
    ///
    /// Each index is computed at most once over the lifetime of the memo, so a
    /// cold call is O(n) and a repeated call is a single lookup.
    pub fn fibonacci(&mut self, n: u64) -> Result<u128, FibonacciError> {
        if n > MAX_INDEX {
            return Err(FibonacciError::Overflow { n });
        }
        self.lookup_or_compute(n)
    }

    fn lookup_or_compute(&mut self, n: u64) -> Result<u128, FibonacciError> {
        self.calls += 1;

        if let Some(&value) = self.cache.get(&n) {
            return Ok(value);
        }

        let value = if n <= 1 {
            u128::from(n)
        } else {
            let a = self.lookup_or_compute(n - 1)?;
            let b = self.lookup_or_compute(n - 2)?;
            self.computations += 1;
            a.checked_add(b).ok_or(FibonacciError::Overflow { n })?
        };

        self.cache.insert(n, value);
        Ok(value)
    }

    /// Cached value for `n`, if it was computed already.
    pub fn cached(&self, n: u64) -> Option<u128> {
        self.cache.get(&n).copied()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Total invocations, including cache hits and base cases.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Invocations that missed the cache and performed an addition.
    pub fn computations(&self) -> u64 {
        self.computations
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.calls = 0;
        self.computations = 0;
    }
}
