//! Temp-file cache for benchmark results.
//!
//! A run at default scale takes tens of seconds; production deployments
//! reuse the previous run's serialized result for a short window
//! instead of hammering the store on every page load.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::BenchmarkResult;
use crate::error::Result;

/// Cache file name inside the system temp directory.
const CACHE_FILE_NAME: &str = "litebench_dbtest.json";

/// Reuses a prior run's serialized result for up to a TTL.
///
/// A zero TTL disables reuse entirely (the development default). Cache
/// read or write problems never fail a request; they degrade to running
/// the benchmark again.
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    /// Cache in the system temp directory with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            path: env::temp_dir().join(CACHE_FILE_NAME),
            ttl,
        }
    }

    /// Cache at an explicit path.
    pub fn at(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Returns the cached result when the file is fresher than the TTL
    /// and parses cleanly.
    pub fn load(&self) -> Option<BenchmarkResult> {
        if self.ttl.is_zero() {
            return None;
        }
        let meta = fs::metadata(&self.path).ok()?;
        let age = meta.modified().ok()?.elapsed().ok()?;
        if age >= self.ttl {
            return None;
        }
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(result) => {
                debug!(path = %self.path.display(), "serving cached benchmark result");
                Some(result)
            }
            Err(err) => {
                warn!(%err, path = %self.path.display(), "ignoring unreadable benchmark cache");
                None
            }
        }
    }

    /// Persists `result`. Failures are logged and swallowed; the result
    /// has already been produced and must still reach the caller.
    pub fn store(&self, result: &BenchmarkResult) {
        match serde_json::to_vec(result) {
            Ok(bytes) => {
                if let Err(err) = fs::write(&self.path, bytes) {
                    warn!(%err, path = %self.path.display(), "failed to write benchmark cache");
                }
            }
            Err(err) => warn!(%err, "failed to serialize benchmark result for cache"),
        }
    }

    /// Returns the cached result, or runs `f` and caches its output.
    pub fn get_or_run(&self, f: impl FnOnce() -> Result<BenchmarkResult>) -> Result<BenchmarkResult> {
        if let Some(cached) = self.load() {
            return Ok(cached);
        }
        let result = f()?;
        self.store(&result);
        Ok(result)
    }
}
