// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Prometheus counters for the engine.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `coursegate_tokens_issued_total` | `outcome` (`issued`, `preview`, `forbidden`) |
//! | `coursegate_grants_written_total` | `result` (`written`, `failed`) |
//! | `coursegate_scheduler_transitions_total` | `transition` |
//!
//! Each instance owns its registry, so tests can build as many as they like.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    tokens: IntCounterVec,
    grants: IntCounterVec,
    transitions: IntCounterVec,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let tokens = IntCounterVec::new(
            Opts::new(
                "coursegate_tokens_issued_total",
                "Media token requests by outcome",
            ),
            &["outcome"],
        )?;
        let grants = IntCounterVec::new(
            Opts::new(
                "coursegate_grants_written_total",
                "Grant writes attempted by reconciliation",
            ),
            &["result"],
        )?;
        let transitions = IntCounterVec::new(
            Opts::new(
                "coursegate_scheduler_transitions_total",
                "Privilege expiry transitions fired",
            ),
            &["transition"],
        )?;

        registry.register(Box::new(tokens.clone()))?;
        registry.register(Box::new(grants.clone()))?;
        registry.register(Box::new(transitions.clone()))?;

        Ok(Self {
            registry,
            tokens,
            grants,
            transitions,
        })
    }

    pub fn token_outcome(&self, outcome: &str) {
        self.tokens.with_label_values(&[outcome]).inc();
    }

    pub fn grants_written(&self, count: usize) {
        self.grants
            .with_label_values(&["written"])
            .inc_by(count as u64);
    }

    pub fn grant_failures(&self, count: usize) {
        self.grants
            .with_label_values(&["failed"])
            .inc_by(count as u64);
    }

    pub fn transition(&self, transition: &str) {
        self.transitions.with_label_values(&[transition]).inc();
    }

    pub fn token_count(&self, outcome: &str) -> u64 {
        self.tokens.with_label_values(&[outcome]).get()
    }

    pub fn transition_count(&self, transition: &str) -> u64 {
        self.transitions.with_label_values(&[transition]).get()
    }

    /// Prometheus text exposition of every counter.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.token_outcome("issued");
        metrics.token_outcome("issued");
        metrics.grants_written(3);
        metrics.transition("entered_grace");

        assert_eq!(metrics.token_count("issued"), 2);
        assert_eq!(metrics.transition_count("entered_grace"), 1);

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("coursegate_tokens_issued_total{outcome=\"issued\"} 2"));
        assert!(text.contains("coursegate_grants_written_total{result=\"written\"} 3"));
    }

    #[test]
    fn registries_are_independent() {
        let a = EngineMetrics::new().unwrap();
        let b = EngineMetrics::new().unwrap();
        a.token_outcome("forbidden");
        assert_eq!(b.token_count("forbidden"), 0);
    }
}
