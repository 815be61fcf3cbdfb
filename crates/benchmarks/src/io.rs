//! I/O operations for benchmark results.
//!
//! Results are exported as a pretty-printed JSON array so they can be
//! collected after a run.

use crate::result::BenchmarkResult;
use std::fs;
use std::io;
use std::path::Path;

/// Write benchmark results to a JSON file, creating parent directories.
pub fn write_results_json(results: &[BenchmarkResult], path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)
}
