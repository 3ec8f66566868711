#![allow(missing_docs)]

use litebench::error::BenchError;
use litebench::store::{BenchStore, CommentDraft, Store, StoreOptions};
use rusqlite::Connection;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn draft(author: &str, content: &str) -> CommentDraft {
    CommentDraft {
        author: author.into(),
        content: content.into(),
    }
}

#[test]
fn open_creates_schema_and_persistent_modes() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("bench.sqlite");
    {
        let _store = Store::open(&StoreOptions::new(&path))?;
    }

    // WAL and incremental auto-vacuum are properties of the file, so a
    // plain connection sees them after the configurator ran.
    let conn = Connection::open(&path)?;
    let journal: String = conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
    assert_eq!(journal.to_ascii_lowercase(), "wal");
    let auto_vacuum: i64 = conn.pragma_query_value(None, "auto_vacuum", |row| row.get(0))?;
    assert_eq!(auto_vacuum, 2);

    let columns: Vec<String> = conn
        .prepare("SELECT name FROM pragma_table_info('comments') ORDER BY cid")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    assert_eq!(columns, ["id", "author", "content"]);
    Ok(())
}

#[test]
fn reopening_keeps_existing_rows_and_schema() -> TestResult {
    let dir = tempdir()?;
    let opts = StoreOptions::new(dir.path().join("bench.sqlite"));

    let mut store = Store::open(&opts)?;
    let outcome = store.insert_batch(&[draft("first", "row")])?;
    assert_eq!(outcome.ids.len(), 1);
    drop(store);

    // Second open must neither error on the existing table nor lose data.
    let mut store = Store::open(&opts)?;
    assert_eq!(store.comment_count()?, 1);
    let row = store.lookup(outcome.ids[0])?.expect("row survives reopen");
    assert_eq!(row.author, "first");
    Ok(())
}

#[test]
fn lookup_of_absent_id_returns_none() -> TestResult {
    let dir = tempdir()?;
    let mut store = Store::open(&StoreOptions::new(dir.path().join("bench.sqlite")))?;
    assert!(store.lookup(424_242)?.is_none());
    Ok(())
}

#[test]
fn size_bytes_grows_with_inserted_data() -> TestResult {
    let dir = tempdir()?;
    let mut store = Store::open(&StoreOptions::new(dir.path().join("bench.sqlite")))?;
    let before = store.size_bytes()?;
    let rows: Vec<_> = (0..2_000)
        .map(|i| draft(&format!("author{i}"), &format!("content{i}")))
        .collect();
    store.insert_batch(&rows)?;
    drop(store);

    // Checkpoint into the main file so the size is visible there.
    let dir_path = dir.path().join("bench.sqlite");
    let conn = Connection::open(&dir_path)?;
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
    drop(conn);

    let mut store = Store::open(&StoreOptions::new(&dir_path))?;
    assert!(store.size_bytes()? > before);
    Ok(())
}

#[test]
fn open_failure_reports_path_mode_and_writability() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent").join("bench.sqlite");
    let err = Store::open(&StoreOptions::new(&missing).production(true)).unwrap_err();
    match err {
        BenchError::StoreOpen {
            path,
            production,
            parent_writable,
            ..
        } => {
            assert_eq!(path, missing);
            assert!(production);
            assert!(!parent_writable);
        }
        other => panic!("expected StoreOpen, got {other:?}"),
    }
}
