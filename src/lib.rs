//! litebench measures sustained insert and point-read throughput
//! against an embedded SQLite store and reports the results over a
//! small JSON API with a single-page dashboard.
//!
//! The crate splits along the benchmark's seams:
//!
//! - [`store`] opens and tunes the SQLite file (the store configurator)
//!   and defines the [`store::BenchStore`] seam the engine runs
//!   against.
//! - [`engine`] is the benchmark itself: a batched-transaction write
//!   phase followed by a randomized-sample read phase, aggregated into
//!   a [`BenchmarkResult`].
//! - [`capacity`], [`cache`], and [`server`] are the collaborators
//!   around the core: host probing, result reuse, and the HTTP surface.

pub mod cache;
pub mod capacity;
pub mod engine;
pub mod error;
pub mod server;
pub mod store;

pub use engine::{BenchmarkEngine, BenchmarkResult, RunParams};
pub use error::{BenchError, Result};
pub use store::{BenchStore, Store, StoreOptions};
