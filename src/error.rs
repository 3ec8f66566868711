//! Error taxonomy for the store configurator and benchmark engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors surfaced by litebench.
///
/// Insert attempts the store rejects without raising a fault (e.g. a
/// constraint violation) are deliberately *not* part of this taxonomy:
/// they are counted by the engine and feed the failure rate, while the
/// variants below abort whatever produced them.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Opening or configuring the store failed. Fatal at startup.
    #[error(
        "failed to open store at {path} (production: {production}, \
         parent dir writable: {parent_writable}): {source}"
    )]
    StoreOpen {
        /// Path the open was attempted against.
        path: PathBuf,
        /// Whether the caller flagged this as a production deployment.
        production: bool,
        /// Whether the parent directory accepted a probe file.
        parent_writable: bool,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// A raised fault during the write phase. The run is aborted with
    /// no partial result.
    #[error("write phase fault: {0}")]
    Write(String),
    /// A raised fault during the read phase. The run is aborted with
    /// no partial result.
    #[error("read phase fault: {0}")]
    Read(String),
    /// The store's lock-wait timeout expired under concurrent access.
    /// The caller may retry; the engine never does.
    #[error("store lock wait timed out: {0}")]
    StoreLocked(String),
    /// Filesystem error outside SQLite (e.g. sizing the database file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// True when SQLite gave up waiting on another connection's lock.
pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

/// True when SQLite rejected a statement over a constraint. These are
/// the tolerated, counted insert failures.
pub(crate) fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Classifies a write-phase fault.
pub(crate) fn write_fault(err: rusqlite::Error) -> BenchError {
    if is_busy(&err) {
        BenchError::StoreLocked(err.to_string())
    } else {
        BenchError::Write(err.to_string())
    }
}

/// Classifies a read-phase fault.
pub(crate) fn read_fault(err: rusqlite::Error) -> BenchError {
    if is_busy(&err) {
        BenchError::StoreLocked(err.to_string())
    } else {
        BenchError::Read(err.to_string())
    }
}
