//! Benchmark engine: a batched-transaction write loop paired with a
//! randomized-sample read loop, producing throughput statistics.

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BenchError, Result};
use crate::store::{BenchStore, CommentDraft};

/// Default number of insert attempts per run.
pub const DEFAULT_TOTAL_INSERTS: u64 = 350_000;
/// Default number of inserts committed per transaction.
pub const DEFAULT_BATCH_SIZE: u64 = 100;
/// Default ceiling on the read-phase sample size.
pub const DEFAULT_MAX_READ_SAMPLE: u64 = 10_000;

/// Length of the generated author/content values.
const VALUE_LEN: usize = 7;

/// Tunable knobs for one benchmark run.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Insert attempts for the write phase.
    pub total_inserts: u64,
    /// Inserts committed per transaction. A throughput tuning knob, not
    /// a correctness one; zero is treated as one.
    pub batch_size: u64,
    /// Upper bound on the read-phase sample size.
    pub max_read_sample: u64,
    /// RNG seed for repeatable runs; seeded from entropy when unset.
    pub seed: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            total_inserts: DEFAULT_TOTAL_INSERTS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_read_sample: DEFAULT_MAX_READ_SAMPLE,
            seed: None,
        }
    }
}

/// Throughput statistics for one completed run.
///
/// Serializes with the camelCase names the JSON API exposes. The store
/// file is never reset between runs, so `total_records` and
/// `db_size_bytes` grow cumulatively across a store's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    /// On-disk size of the database file after the run.
    pub db_size_bytes: u64,
    /// Cumulative row count of the `comments` table.
    pub total_records: u64,
    /// Successful inserts this run.
    pub writes: u64,
    /// `writes / writeElapsedSeconds`, rounded to the nearest integer;
    /// `0` on a degenerate zero-elapsed clock.
    pub writes_per_second: u64,
    /// Wall-clock duration of the write phase, transaction overhead
    /// included.
    pub write_elapsed_seconds: f64,
    /// Point lookups issued during the read phase.
    pub reads: u64,
    /// Sampled read rate extrapolated to every row written this run.
    pub reads_per_second: u64,
    /// `failures / writes * 100`, rounded to two decimals. Divides by
    /// successes, not attempts, by design; `0.0` when nothing was
    /// written.
    pub failure_rate_percent: f64,
}

/// Runs the write and read phases against a configured store.
///
/// Fully synchronous: `run` blocks for the whole benchmark, seconds to
/// tens of seconds at the default scale. One run owns the store handle
/// for its duration; overlapping runs against the same file are
/// arbitrated only by the store's busy timeout.
#[derive(Debug, Clone)]
pub struct BenchmarkEngine {
    params: RunParams,
}

impl BenchmarkEngine {
    /// Engine with explicit run parameters.
    pub fn new(params: RunParams) -> Self {
        Self { params }
    }

    /// Engine with the default 350k/100/10k parameters.
    pub fn with_defaults() -> Self {
        Self::new(RunParams::default())
    }

    /// Executes one full run: write phase, read phase, aggregation.
    ///
    /// A fault in either phase aborts the run with no partial result.
    /// Rejected inserts are counted and the run continues; that count
    /// is what the failure rate measures.
    pub fn run<S: BenchStore>(&self, store: &mut S) -> Result<BenchmarkResult> {
        let batch_size = self.params.batch_size.max(1);
        let mut rng = match self.params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        // Write phase: fixed attempt budget, one transaction per batch.
        let mut inserted: Vec<i64> =
            Vec::with_capacity(self.params.total_inserts.min(1 << 22) as usize);
        let mut failures = 0u64;
        let mut batch: Vec<CommentDraft> = Vec::with_capacity(batch_size as usize);
        let write_start = Instant::now();
        let mut remaining = self.params.total_inserts;
        while remaining > 0 {
            let take = remaining.min(batch_size);
            batch.clear();
            for _ in 0..take {
                batch.push(CommentDraft {
                    author: random_value(&mut rng),
                    content: random_value(&mut rng),
                });
            }
            let outcome = store.insert_batch(&batch)?;
            inserted.extend_from_slice(&outcome.ids);
            failures += outcome.rejected;
            remaining -= take;
        }
        let write_elapsed = write_start.elapsed().as_secs_f64();

        let writes = inserted.len() as u64;
        debug_assert_eq!(writes + failures, self.params.total_inserts);
        let writes_per_second = rate(writes, write_elapsed);
        info!(writes, failures, writes_per_second, "write phase complete");

        // Read phase: uniform sample, without replacement, drawn only
        // from the ids this run inserted. Skipped when nothing landed.
        let (reads, reads_per_second) = if writes == 0 {
            (0, 0)
        } else {
            let sample_size = self.params.max_read_sample.min(writes) as usize;
            let sample = rand::seq::index::sample(&mut rng, inserted.len(), sample_size);
            let read_start = Instant::now();
            let mut reads = 0u64;
            for idx in sample.iter() {
                let id = inserted[idx];
                if store.lookup(id)?.is_none() {
                    // The row was inserted moments ago in this run.
                    return Err(BenchError::Read(format!("row {id} vanished after insert")));
                }
                reads += 1;
            }
            let read_elapsed = read_start.elapsed().as_secs_f64();
            let scaled = if sample_size == 0 || read_elapsed <= 0.0 {
                0
            } else {
                // Project the sampled rate onto everything written this
                // run, not onto the cumulative table.
                ((reads as f64 / read_elapsed) * (writes as f64 / sample_size as f64)).round()
                    as u64
            };
            info!(reads, reads_per_second = scaled, sample_size, "read phase complete");
            (reads, scaled)
        };

        let total_records = store.comment_count()?;
        let db_size_bytes = store.size_bytes()?;
        let failure_rate_percent = if writes == 0 {
            0.0
        } else {
            round2(failures as f64 / writes as f64 * 100.0)
        };

        Ok(BenchmarkResult {
            db_size_bytes,
            total_records,
            writes,
            writes_per_second,
            write_elapsed_seconds: write_elapsed,
            reads,
            reads_per_second,
            failure_rate_percent,
        })
    }
}

fn rate(count: u64, elapsed_secs: f64) -> u64 {
    if elapsed_secs <= 0.0 {
        0
    } else {
        (count as f64 / elapsed_secs).round() as u64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A uniform random lowercase string of [`VALUE_LEN`] characters. No
/// uniqueness is attempted; repeated values across rows are expected.
fn random_value(rng: &mut impl Rng) -> String {
    (0..VALUE_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}
