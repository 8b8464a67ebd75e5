//! Running usage statistics for an enrichment client.
//!
//! Every mutation happens under a single lock, so a read and the write that
//! depends on it (the incremental mean) can never interleave with another lead.

use crate::models::EnrichmentStats;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct StatsRecorder {
    inner: Mutex<EnrichmentStats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.inner.lock().total_requests += 1;
    }

    /// Counts a successful lead and folds its duration into the running average:
    /// `avg' = (avg * (n - 1) + sample) / n`.
    pub fn record_success(&self, elapsed: Duration) {
        let mut stats = self.inner.lock();
        stats.successful_requests += 1;
        let n = stats.successful_requests as f64;
        let sample = elapsed.as_secs_f64() * 1000.0;
        stats.average_response_time_ms = (stats.average_response_time_ms * (n - 1.0) + sample) / n;
    }

    pub fn record_failure(&self) {
        self.inner.lock().failed_requests += 1;
    }

    pub fn record_rate_limit_hit(&self) {
        self.inner.lock().rate_limit_hits += 1;
    }

    pub fn record_provider_use(&self, provider: &str, cost_cents: f64) {
        let mut stats = self.inner.lock();
        *stats.provider_usage.entry(provider.to_string()).or_insert(0) += 1;
        stats.total_cost_cents += cost_cents;
    }

    /// Detached copy of the current counters.
    pub fn snapshot(&self) -> EnrichmentStats {
        self.inner.lock().clone()
    }

    pub fn reset(&self) {
        *self.inner.lock() = EnrichmentStats::default();
    }
}
