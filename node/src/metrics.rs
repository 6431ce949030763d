//! Prometheus metrics for the knowledge engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct EngineMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Votes appended to a category topic.
    pub votes_admitted: IntCounter,
    /// Votes refused before any append, by reason.
    pub votes_rejected: IntCounterVec,
    /// Items appended to a category topic.
    pub submissions: IntCounter,
    /// Finalized events appended, by outcome.
    pub finalizations: IntCounterVec,
    /// Reputation deltas appended to public topics.
    pub deltas_emitted: IntCounter,
    /// Non-fatal warnings raised after a durable outcome, by code.
    pub sync_warnings: IntCounterVec,
    /// Failed reads of the primary ledger.
    pub ledger_read_failures: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time to read and fold one category topic, in milliseconds.
    pub fold_latency_ms: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_admitted = register_int_counter_with_registry!(
            Opts::new("agora_votes_admitted_total", "Votes appended to the ledger"),
            registry
        )
        .expect("failed to register votes_admitted counter");

        let votes_rejected = register_int_counter_vec_with_registry!(
            Opts::new("agora_votes_rejected_total", "Votes refused before append"),
            &["reason"],
            registry
        )
        .expect("failed to register votes_rejected counter");

        let submissions = register_int_counter_with_registry!(
            Opts::new("agora_submissions_total", "Knowledge items submitted"),
            registry
        )
        .expect("failed to register submissions counter");

        let finalizations = register_int_counter_vec_with_registry!(
            Opts::new("agora_finalizations_total", "Finalized events appended"),
            &["outcome"],
            registry
        )
        .expect("failed to register finalizations counter");

        let deltas_emitted = register_int_counter_with_registry!(
            Opts::new("agora_reputation_deltas_total", "Reputation deltas appended"),
            registry
        )
        .expect("failed to register deltas_emitted counter");

        let sync_warnings = register_int_counter_vec_with_registry!(
            Opts::new("agora_sync_warnings_total", "Non-fatal post-commit warnings"),
            &["code"],
            registry
        )
        .expect("failed to register sync_warnings counter");

        let ledger_read_failures = register_int_counter_with_registry!(
            Opts::new("agora_ledger_read_failures_total", "Failed primary ledger reads"),
            registry
        )
        .expect("failed to register ledger_read_failures counter");

        // 0.5 ms → ~8 s.
        let fold_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new("agora_fold_latency_ms", "Topic read and fold time in milliseconds")
                .buckets(prometheus::exponential_buckets(0.5, 2.0, 15).unwrap_or_default()),
            registry
        )
        .expect("failed to register fold_latency_ms histogram");

        Self {
            registry,
            votes_admitted,
            votes_rejected,
            submissions,
            finalizations,
            deltas_emitted,
            sync_warnings,
            ledger_read_failures,
            fold_latency_ms,
        }
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_counters_show_up_in_exposition() {
        let metrics = EngineMetrics::new();
        metrics.votes_rejected.with_label_values(&["self_vote"]).inc();
        metrics.finalizations.with_label_values(&["approved"]).inc();
        let text = metrics.encode();
        assert!(text.contains("agora_votes_rejected_total{reason=\"self_vote\"} 1"));
        assert!(text.contains("agora_finalizations_total{outcome=\"approved\"} 1"));
    }
}
