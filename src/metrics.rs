//! Prometheus metrics for quotes, builds and submissions

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::time::Instant;

/// Metrics registry owned by one client
///
/// Each instance has its own registry, so separately configured clients do
/// not share counters.
#[derive(Clone)]
pub struct AmmMetrics {
    registry: Registry,

    // Counters
    pub quotes_total: IntCounter,
    pub quotes_rejected: IntCounter,
    pub instructions_built: IntCounter,
    pub submissions_success: IntCounter,
    pub submissions_failed: IntCounter,

    // Histograms
    pub submit_latency: Histogram,
}

impl AmmMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let quotes_total = IntCounter::with_opts(Opts::new(
            "amm_quotes_total",
            "Total number of swap quotes computed",
        ))?;

        let quotes_rejected = IntCounter::with_opts(Opts::new(
            "amm_quotes_rejected",
            "Quotes rejected for reserve, tolerance or slippage",
        ))?;

        let instructions_built = IntCounter::with_opts(Opts::new(
            "amm_instructions_built",
            "Instructions handed to the orchestrator",
        ))?;

        let submissions_success = IntCounter::with_opts(Opts::new(
            "amm_submissions_success",
            "Transactions accepted by the ledger",
        ))?;

        let submissions_failed = IntCounter::with_opts(Opts::new(
            "amm_submissions_failed",
            "Transactions that failed at any orchestration stage",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new("amm_submit_latency_seconds", "End-to-end submission latency")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(quotes_total.clone()))?;
        registry.register(Box::new(quotes_rejected.clone()))?;
        registry.register(Box::new(instructions_built.clone()))?;
        registry.register(Box::new(submissions_success.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;

        Ok(Self {
            registry,
            quotes_total,
            quotes_rejected,
            instructions_built,
            submissions_success,
            submissions_failed,
            submit_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        use prometheus::Encoder;

        let mut buf = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl std::fmt::Debug for AmmMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmmMetrics")
            .field("quotes_total", &self.quotes_total.get())
            .field("submissions_success", &self.submissions_success.get())
            .field("submissions_failed", &self.submissions_failed.get())
            .finish()
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registries_are_independent() {
        let first = AmmMetrics::new().unwrap();
        let second = AmmMetrics::new().unwrap();

        first.quotes_total.inc();
        assert_eq!(first.quotes_total.get(), 1);
        assert_eq!(second.quotes_total.get(), 0);
    }

    #[test]
    fn test_render_names() {
        let metrics = AmmMetrics::new().unwrap();
        metrics.submissions_failed.inc();
        metrics.submit_latency.observe(0.2);

        let text = metrics.render();
        assert!(text.contains("amm_submissions_failed 1"));
        assert!(text.contains("amm_submit_latency_seconds_bucket"));
        assert!(text.contains("amm_quotes_total 0"));
    }
}
