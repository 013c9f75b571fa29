//! Unmemoized Fibonacci, kept as the exponential baseline.

use crate::memo::{FibonacciError, MAX_INDEX};

/// Plain double recursion. Runs in O(phi^n) time; `n = 30` already takes
/// over a million calls.
pub fn fibonacci(n: u64) -> Result<u128, FibonacciError> {
    if n > MAX_INDEX {
        return Err(FibonacciError::Overflow { n });
    }
    Ok(recurse(n))
}

fn recurse(n: u64) -> u128 {
    if n <= 1 {
        return u128::from(n);
    }
    // cannot overflow below MAX_INDEX
    recurse(n - 1) + recurse(n - 2)
}
