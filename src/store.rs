//! Store configurator: opens the embedded SQLite database and applies
//! the engine tuning the benchmark assumes before any run starts.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{is_constraint, read_fault, write_fault, BenchError, Result};

/// Default page cache budget, in KiB (~100MB).
pub const DEFAULT_CACHE_SIZE_KIB: i64 = 100_000;
/// Default memory-mapped I/O ceiling, in bytes (~1GB).
pub const DEFAULT_MMAP_SIZE_BYTES: u64 = 1_000_000_000;
/// Default lock-wait timeout, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration for opening the benchmark store.
///
/// Callers build this explicitly; the library never reads the process
/// environment to decide any of it.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Whether this is a production deployment. Feeds open-failure
    /// diagnostics; callers also use it to pick the result cache TTL.
    pub production: bool,
    /// Page cache budget in KiB.
    pub cache_size_kib: i64,
    /// Memory-mapped I/O ceiling in bytes.
    pub mmap_size_bytes: u64,
    /// How long a writer blocks on another connection's lock before
    /// failing, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl StoreOptions {
    /// Development options for a store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            production: false,
            cache_size_kib: DEFAULT_CACHE_SIZE_KIB,
            mmap_size_bytes: DEFAULT_MMAP_SIZE_BYTES,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Sets the production flag.
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }
}

/// A row in the `comments` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Auto-incrementing primary key.
    pub id: i64,
    /// Generated author value.
    pub author: String,
    /// Generated content value.
    pub content: String,
}

/// Generated values for one insert attempt.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    /// Author value to insert.
    pub author: String,
    /// Content value to insert.
    pub content: String,
}

/// Per-batch insert accounting.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Primary keys of the rows that landed, in insertion order.
    pub ids: Vec<i64>,
    /// Inserts the store reported as failed without raising a fault.
    pub rejected: u64,
}

/// Storage seam the benchmark engine runs against.
///
/// The SQLite [`Store`] is the production implementation; tests plug in
/// their own to inject rejections and faults.
pub trait BenchStore {
    /// Applies one batch of insert attempts inside a single atomic
    /// transaction. A rejected insert is counted in the outcome and
    /// must not abort the batch; a raised fault aborts everything.
    fn insert_batch(&mut self, rows: &[CommentDraft]) -> Result<BatchOutcome>;

    /// Point lookup by primary key.
    fn lookup(&mut self, id: i64) -> Result<Option<Comment>>;

    /// Cumulative row count of the `comments` table, across all runs
    /// ever executed against this store file.
    fn comment_count(&mut self) -> Result<u64>;

    /// On-disk size of the main database file.
    fn size_bytes(&mut self) -> Result<u64>;
}

/// Handle to a configured SQLite store.
///
/// Exclusively owned by whichever run is executing; concurrent access
/// from other processes is governed by the busy timeout alone.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Opens or creates the store at `opts.path`, applies the engine
    /// tuning pragmas, and ensures the `comments` table exists.
    ///
    /// Idempotent and safe to call on every startup. Failures carry the
    /// path, the production flag, and whether the parent directory is
    /// writable, so a misdeployed container can be diagnosed from the
    /// error alone.
    pub fn open(opts: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(&opts.path).map_err(|err| open_error(opts, err))?;

        // WAL keeps readers unblocked while a writer's transaction is
        // open; NORMAL syncs on checkpoint rather than every commit.
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA cache_size = -{cache};\
             PRAGMA synchronous = NORMAL;\
             PRAGMA temp_store = MEMORY;\
             PRAGMA mmap_size = {mmap};\
             PRAGMA foreign_keys = ON;\
             PRAGMA busy_timeout = {busy};\
             PRAGMA auto_vacuum = INCREMENTAL;",
            cache = opts.cache_size_kib,
            mmap = opts.mmap_size_bytes,
            busy = opts.busy_timeout_ms,
        ))
        .map_err(|err| open_error(opts, err))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author TEXT NOT NULL,
                content TEXT NOT NULL
            )",
            [],
        )
        .map_err(|err| open_error(opts, err))?;

        debug!(
            path = %opts.path.display(),
            production = opts.production,
            "store configured"
        );

        Ok(Self {
            conn,
            path: opts.path.clone(),
        })
    }
}

impl BenchStore for Store {
    fn insert_batch(&mut self, rows: &[CommentDraft]) -> Result<BatchOutcome> {
        let tx = self.conn.unchecked_transaction().map_err(write_fault)?;
        let mut outcome = BatchOutcome::default();
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO comments (author, content) VALUES (?1, ?2)")
                .map_err(write_fault)?;
            for row in rows {
                match stmt.execute(params![row.author, row.content]) {
                    Ok(_) => outcome.ids.push(tx.last_insert_rowid()),
                    Err(err) if is_constraint(&err) => outcome.rejected += 1,
                    Err(err) => return Err(write_fault(err)),
                }
            }
        }
        tx.commit().map_err(write_fault)?;
        Ok(outcome)
    }

    fn lookup(&mut self, id: i64) -> Result<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, author, content FROM comments WHERE id = ?1")
            .map_err(read_fault)?;
        stmt.query_row(params![id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                author: row.get(1)?,
                content: row.get(2)?,
            })
        })
        .optional()
        .map_err(read_fault)
    }

    fn comment_count(&mut self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(read_fault)
    }

    fn size_bytes(&mut self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}

fn open_error(opts: &StoreOptions, source: rusqlite::Error) -> BenchError {
    BenchError::StoreOpen {
        path: opts.path.clone(),
        production: opts.production,
        parent_writable: parent_writable(&opts.path),
        source,
    }
}

/// Checks whether the database's parent directory accepts new files by
/// creating and removing a probe file. Permission bits alone lie too
/// often inside containers.
fn parent_writable(path: &Path) -> bool {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let probe = parent.join(".litebench-write-probe");
    match File::create(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
