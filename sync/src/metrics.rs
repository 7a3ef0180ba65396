use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-resource counters for the sync layer, Prometheus-compatible on export.
pub struct SyncMetrics {
    fetches: DashMap<&'static str, AtomicU64>,
    fetch_failures: DashMap<&'static str, AtomicU64>,
    superseded: DashMap<&'static str, AtomicU64>,
    invalidations: DashMap<&'static str, AtomicU64>,
    mutations: DashMap<&'static str, AtomicU64>,
}

fn bump(map: &DashMap<&'static str, AtomicU64>, resource: &'static str) {
    map.entry(resource)
        .or_insert_with(|| AtomicU64::new(0))
        .fetch_add(1, Ordering::Relaxed);
}

fn read(map: &DashMap<&'static str, AtomicU64>, resource: &str) -> u64 {
    map.get(resource)
        .map(|v| v.load(Ordering::Relaxed))
        .unwrap_or(0)
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            fetches: DashMap::new(),
            fetch_failures: DashMap::new(),
            superseded: DashMap::new(),
            invalidations: DashMap::new(),
            mutations: DashMap::new(),
        }
    }

    pub fn record_fetch(&self, resource: &'static str) {
        bump(&self.fetches, resource);
    }

    pub fn record_failure(&self, resource: &'static str) {
        bump(&self.fetch_failures, resource);
    }

    pub fn record_superseded(&self, resource: &'static str) {
        bump(&self.superseded, resource);
    }

    pub fn record_invalidation(&self, resource: &'static str) {
        bump(&self.invalidations, resource);
    }

    pub fn record_mutation(&self, name: &'static str) {
        bump(&self.mutations, name);
    }

    pub fn fetches(&self, resource: &str) -> u64 {
        read(&self.fetches, resource)
    }

    pub fn failures(&self, resource: &str) -> u64 {
        read(&self.fetch_failures, resource)
    }

    pub fn superseded(&self, resource: &str) -> u64 {
        read(&self.superseded, resource)
    }

    pub fn invalidations(&self, resource: &str) -> u64 {
        read(&self.invalidations, resource)
    }

    /// Generate Prometheus-compatible metrics output
    pub fn export(&self) -> String {
        let mut output = String::new();
        write_family(
            &mut output,
            "jobdeck_fetches_total",
            "Fetches issued against the scheduler API",
            "resource",
            &self.fetches,
        );
        write_family(
            &mut output,
            "jobdeck_fetch_failures_total",
            "Fetches that ended in a transport or HTTP error",
            "resource",
            &self.fetch_failures,
        );
        write_family(
            &mut output,
            "jobdeck_superseded_results_total",
            "Fetch results dropped because a newer result was already applied",
            "resource",
            &self.superseded,
        );
        write_family(
            &mut output,
            "jobdeck_invalidations_total",
            "Cache entries marked stale by mutations",
            "resource",
            &self.invalidations,
        );
        write_family(
            &mut output,
            "jobdeck_mutations_total",
            "Successful writes",
            "mutation",
            &self.mutations,
        );
        output
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn write_family(
    output: &mut String,
    name: &str,
    help: &str,
    label: &str,
    map: &DashMap<&'static str, AtomicU64>,
) {
    output.push_str(&format!("# HELP {} {}\n", name, help));
    output.push_str(&format!("# TYPE {} counter\n", name));
    let mut rows: Vec<(&'static str, u64)> = map
        .iter()
        .map(|e| (*e.key(), e.value().load(Ordering::Relaxed)))
        .collect();
    rows.sort_unstable();
    for (key, value) in rows {
        output.push_str(&format!("{}{{{}=\"{}\"}} {}\n", name, label, key, value));
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_resource() {
        let m = SyncMetrics::new();
        m.record_fetch("jobs");
        m.record_fetch("jobs");
        m.record_fetch("jobStats");
        m.record_failure("jobs");
        assert_eq!(m.fetches("jobs"), 2);
        assert_eq!(m.fetches("jobStats"), 1);
        assert_eq!(m.failures("jobs"), 1);
        assert_eq!(m.fetches("deadJobs"), 0);
    }

    #[test]
    fn export_is_prometheus_text() {
        let m = SyncMetrics::new();
        m.record_fetch("jobs");
        m.record_mutation("create_job");
        let text = m.export();
        assert!(text.contains("# TYPE jobdeck_fetches_total counter"));
        assert!(text.contains("jobdeck_fetches_total{resource=\"jobs\"} 1"));
        assert!(text.contains("jobdeck_mutations_total{mutation=\"create_job\"} 1"));
    }
}
