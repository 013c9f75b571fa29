//! Linux /proc resident memory collection

use super::MemoryError;
use std::fs;
use std::sync::OnceLock;

const STATM_PATH: &str = "/proc/self/statm";

static PAGE_SIZE: OnceLock<u64> = OnceLock::new();

fn page_size() -> u64 {
    *PAGE_SIZE.get_or_init(|| {
        let v = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if v <= 0 {
            4096
        } else {
            v as u64
        }
    })
}

pub(crate) fn resident_bytes() -> Result<u64, MemoryError> {
    let content = fs::read_to_string(STATM_PATH).map_err(|source| MemoryError::Io {
        path: STATM_PATH,
        source,
    })?;
    parse_statm(&content, page_size())
}

// Format: "size resident shared text lib data dt", all in pages
fn parse_statm(content: &str, page_size: u64) -> Result<u64, MemoryError> {
    let resident = content
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MemoryError::Parse {
            path: STATM_PATH,
            reason: "missing resident field".to_string(),
        })?;

    let pages: u64 = resident.parse().map_err(|e| MemoryError::Parse {
        path: STATM_PATH,
        reason: format!("invalid resident page count {resident:?}: {e}"),
    })?;

    Ok(pages.saturating_mul(page_size))
}
