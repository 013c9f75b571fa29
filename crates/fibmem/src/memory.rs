//! Resident memory queries for the current process.

use thiserror::Error;

#[cfg(target_os = "linux")]
#[path = "memory/linux.rs"]
mod platform;

#[cfg(target_os = "macos")]
#[path = "memory/macos.rs"]
mod platform;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected contents in {path}: {reason}")]
    Parse { path: &'static str, reason: String },
    #[error("task_info() failed with kern_return_t {code}")]
    Kernel { code: i32 },
    #[error("resident memory queries are not supported on this platform")]
    Unsupported,
}

/// Source of resident set size readings.
///
/// The sampler borrows its probe from a worker thread, hence `Sync`.
pub trait MemoryProbe: Sync {
    fn resident_bytes(&self) -> Result<u64, MemoryError>;
}

/// Reads the resident set size of the running process from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl MemoryProbe for ProcessMemory {
    fn resident_bytes(&self) -> Result<u64, MemoryError> {
        cfg_if::cfg_if! {
            if #[cfg(any(target_os = "linux", target_os = "macos"))] {
                platform::resident_bytes()
            } else {
                Err(MemoryError::Unsupported)
            }
        }
    }
}

impl<P: MemoryProbe + ?Sized> MemoryProbe for &P {
    fn resident_bytes(&self) -> Result<u64, MemoryError> {
        (**self).resident_bytes()
    }
}
