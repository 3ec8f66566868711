//! Host capability probe reported alongside benchmark results, so a
//! throughput number can be read against the box that produced it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{RefreshKind, System};

/// Snapshot of the host the benchmark runs on.
///
/// Fields the platform does not expose are left unset rather than
/// guessed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCapacity {
    /// When the snapshot was taken.
    pub collected_at: DateTime<Utc>,
    /// Logical CPU count.
    pub vcpus: usize,
    /// Physical core count, when the host exposes it.
    pub physical_cores: Option<usize>,
    /// CPU model string.
    pub cpu_model: Option<String>,
    /// OS, architecture, and kernel version.
    pub platform: String,
    /// Total RAM in bytes.
    pub total_memory_bytes: u64,
    /// One-minute load average.
    pub load_average_one: Option<f64>,
    /// Load-derived CPU usage: one-minute load over logical CPUs.
    pub cpu_usage_percent: Option<f64>,
    /// Resident set size of this process in bytes.
    pub process_memory_bytes: Option<u64>,
    /// Process RSS as a share of total RAM.
    pub memory_usage_percent: Option<f64>,
}

impl HostCapacity {
    /// Collects a fresh snapshot. Blocking; refreshes system tables.
    pub fn probe() -> Self {
        let mut sys = System::new_with_specifics(RefreshKind::everything());
        sys.refresh_all();

        let vcpus = sys.cpus().len().max(1);
        let physical_cores = sys.physical_core_count();
        let cpu_model = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty());
        let platform = format!(
            "{}, {}, {}",
            System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            std::env::consts::ARCH,
            System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
        );
        let total_memory_bytes = sys.total_memory();

        // Windows reports all-zero load averages; a zero one-minute
        // load is still meaningful elsewhere, so keep it.
        let load_average_one = Some(System::load_average().one);
        let cpu_usage_percent = load_average_one.map(|load| round1(load / vcpus as f64 * 100.0));

        let process_memory_bytes = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid))
            .map(|process| process.memory());
        let memory_usage_percent = process_memory_bytes
            .filter(|_| total_memory_bytes > 0)
            .map(|rss| round1(rss as f64 / total_memory_bytes as f64 * 100.0));

        Self {
            collected_at: Utc::now(),
            vcpus,
            physical_cores,
            cpu_model,
            platform,
            total_memory_bytes,
            load_average_one,
            cpu_usage_percent,
            process_memory_bytes,
            memory_usage_percent,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
