#![allow(missing_docs)]

use litebench::engine::{BenchmarkEngine, RunParams};
use litebench::error::BenchError;
use litebench::store::{BatchOutcome, BenchStore, Comment, CommentDraft, Store, StoreOptions};
use proptest::prelude::*;
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn params(total: u64, batch: u64, sample: u64) -> RunParams {
    RunParams {
        total_inserts: total,
        batch_size: batch,
        max_read_sample: sample,
        seed: Some(7),
    }
}

/// In-memory stand-in for the SQLite store with failure injection.
#[derive(Default)]
struct MockStore {
    rows: Vec<Comment>,
    next_id: i64,
    attempts: u64,
    batch_sizes: Vec<usize>,
    /// Reject (count, don't raise) every Nth attempt.
    reject_every: Option<u64>,
    /// Raise a write fault after this many attempts.
    fault_after: Option<u64>,
    /// Raise a read fault on any lookup.
    fail_lookups: bool,
    /// Accept inserts but forget the rows, so lookups come back empty.
    forget_rows: bool,
}

impl BenchStore for MockStore {
    fn insert_batch(&mut self, rows: &[CommentDraft]) -> litebench::Result<BatchOutcome> {
        self.batch_sizes.push(rows.len());
        let mut outcome = BatchOutcome::default();
        for row in rows {
            self.attempts += 1;
            if let Some(limit) = self.fault_after {
                if self.attempts > limit {
                    return Err(BenchError::Write("injected write fault".into()));
                }
            }
            if let Some(every) = self.reject_every {
                if self.attempts % every == 0 {
                    outcome.rejected += 1;
                    continue;
                }
            }
            self.next_id += 1;
            let id = self.next_id;
            if !self.forget_rows {
                self.rows.push(Comment {
                    id,
                    author: row.author.clone(),
                    content: row.content.clone(),
                });
            }
            outcome.ids.push(id);
        }
        Ok(outcome)
    }

    fn lookup(&mut self, id: i64) -> litebench::Result<Option<Comment>> {
        if self.fail_lookups {
            return Err(BenchError::Read("injected read fault".into()));
        }
        Ok(self.rows.iter().find(|row| row.id == id).cloned())
    }

    fn comment_count(&mut self) -> litebench::Result<u64> {
        Ok(self.rows.len() as u64)
    }

    fn size_bytes(&mut self) -> litebench::Result<u64> {
        Ok(self.rows.len() as u64 * 64)
    }
}

#[test]
fn scenario_a_fresh_store() -> TestResult {
    let dir = tempdir()?;
    let mut store = Store::open(&StoreOptions::new(dir.path().join("bench.sqlite")))?;
    let result = BenchmarkEngine::new(params(1_000, 10, 100)).run(&mut store)?;

    assert_eq!(result.writes, 1_000);
    assert_eq!(result.failure_rate_percent, 0.0);
    assert_eq!(result.total_records, 1_000);
    assert_eq!(result.reads, 100);
    assert!(result.db_size_bytes > 0);
    Ok(())
}

#[test]
fn scenario_b_table_grows_cumulatively() -> TestResult {
    let dir = tempdir()?;
    let opts = StoreOptions::new(dir.path().join("bench.sqlite"));

    // Pre-populate 500 rows as if a previous run had happened.
    let mut store = Store::open(&opts)?;
    let seeded: Vec<_> = (0..500)
        .map(|i| CommentDraft {
            author: format!("seed{i}"),
            content: "preexisting".into(),
        })
        .collect();
    store.insert_batch(&seeded)?;

    let result = BenchmarkEngine::new(params(500, 100, 100)).run(&mut store)?;
    assert_eq!(result.writes, 500);
    assert_eq!(result.total_records, 1_000);
    Ok(())
}

#[test]
fn scenario_c_rejections_are_counted_not_fatal() -> TestResult {
    let mut store = MockStore {
        reject_every: Some(10),
        ..MockStore::default()
    };
    let result = BenchmarkEngine::new(params(100, 10, 100)).run(&mut store)?;

    assert_eq!(store.attempts, 100);
    assert_eq!(result.writes, 90);
    assert_eq!(result.total_records, 90);
    // 10 failures over 90 successes, by design.
    assert_eq!(result.failure_rate_percent, 11.11);
    assert_eq!(result.reads, 90);
    Ok(())
}

#[test]
fn scenario_d_zero_attempts_is_a_defined_degenerate_run() -> TestResult {
    let dir = tempdir()?;
    let mut store = Store::open(&StoreOptions::new(dir.path().join("bench.sqlite")))?;
    let result = BenchmarkEngine::new(params(0, 100, 10_000)).run(&mut store)?;

    assert_eq!(result.writes, 0);
    assert_eq!(result.reads, 0);
    assert_eq!(result.reads_per_second, 0);
    assert_eq!(result.failure_rate_percent, 0.0);
    assert_eq!(result.total_records, 0);
    Ok(())
}

#[test]
fn read_sample_is_capped_by_max_and_by_writes() -> TestResult {
    let mut store = MockStore::default();
    let result = BenchmarkEngine::new(params(200, 50, 50)).run(&mut store)?;
    assert_eq!(result.reads, 50);

    let mut store = MockStore::default();
    let result = BenchmarkEngine::new(params(30, 50, 100)).run(&mut store)?;
    assert_eq!(result.reads, 30);
    Ok(())
}

#[test]
fn attempts_are_chunked_into_batches_with_a_short_tail() -> TestResult {
    let mut store = MockStore::default();
    BenchmarkEngine::new(params(25, 10, 0)).run(&mut store)?;
    assert_eq!(store.batch_sizes, [10, 10, 5]);
    Ok(())
}

#[test]
fn zero_batch_size_is_clamped_to_one() -> TestResult {
    let mut store = MockStore::default();
    let result = BenchmarkEngine::new(params(5, 0, 0)).run(&mut store)?;
    assert_eq!(result.writes, 5);
    assert_eq!(store.batch_sizes, [1, 1, 1, 1, 1]);
    Ok(())
}

#[test]
fn write_fault_aborts_the_run() {
    let mut store = MockStore {
        fault_after: Some(5),
        ..MockStore::default()
    };
    let err = BenchmarkEngine::new(params(100, 10, 100))
        .run(&mut store)
        .unwrap_err();
    assert!(matches!(err, BenchError::Write(_)), "got {err:?}");
}

#[test]
fn read_fault_aborts_the_run() {
    let mut store = MockStore {
        fail_lookups: true,
        ..MockStore::default()
    };
    let err = BenchmarkEngine::new(params(50, 10, 10))
        .run(&mut store)
        .unwrap_err();
    assert!(matches!(err, BenchError::Read(_)), "got {err:?}");
}

#[test]
fn missing_row_is_an_invariant_violation() {
    let mut store = MockStore {
        forget_rows: true,
        ..MockStore::default()
    };
    let err = BenchmarkEngine::new(params(50, 10, 10))
        .run(&mut store)
        .unwrap_err();
    assert!(matches!(err, BenchError::Read(_)), "got {err:?}");
}

#[test]
fn identical_seeds_generate_identical_data() -> TestResult {
    // Same seed, same store state: byte-identical rows.
    let mut first = MockStore::default();
    BenchmarkEngine::new(params(100, 10, 0)).run(&mut first)?;
    let mut second = MockStore::default();
    BenchmarkEngine::new(params(100, 10, 0)).run(&mut second)?;

    let rows = |store: &MockStore| {
        store
            .rows
            .iter()
            .map(|r| (r.author.clone(), r.content.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(rows(&first), rows(&second));
    Ok(())
}

proptest! {
    #[test]
    fn writes_plus_failures_always_equals_attempts(
        total in 0u64..300,
        batch in 1u64..40,
        reject_every in 1u64..20,
    ) {
        let mut store = MockStore {
            reject_every: Some(reject_every),
            ..MockStore::default()
        };
        let result = BenchmarkEngine::new(params(total, batch, 50))
            .run(&mut store)
            .unwrap();

        let rejected = total / reject_every;
        prop_assert_eq!(store.attempts, total);
        prop_assert_eq!(result.writes, total - rejected);
        prop_assert!(result.failure_rate_percent >= 0.0);
        prop_assert!(result.failure_rate_percent <= 100.0);
        if result.writes > 0 {
            prop_assert_eq!(result.reads, result.writes.min(50));
        } else {
            prop_assert_eq!(result.reads, 0);
        }
    }
}
