use std::sync::Arc;

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

// ---------------------------------------------------------------------------
// Label types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: Outcome,
}

/// How a webhook request ended at the HTTP boundary.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Outcome {
    Success,
    Forbidden,
    Failed,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StrategyLabels {
    pub strategy: Strategy,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Strategy {
    Merge,
    Shallow,
}

impl From<crate::config::MirrorStrategy> for Strategy {
    fn from(strategy: crate::config::MirrorStrategy) -> Self {
        match strategy {
            crate::config::MirrorStrategy::Merge => Self::Merge,
            crate::config::MirrorStrategy::Shallow => Self::Shallow,
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics struct
// ---------------------------------------------------------------------------

/// Central container for every Prometheus metric exposed by the service.
pub struct Metrics {
    pub webhook_requests: Family<OutcomeLabels, Counter>,
    pub mirror_duration_seconds: Family<StrategyLabels, Histogram>,
    pub repo_lock_timeouts: Counter,
    pub mirrors_in_flight: Gauge,
}

impl Metrics {
    /// Create a new [`Metrics`] instance and register every metric with the
    /// supplied `registry`.
    pub fn new(registry: &mut Registry) -> Self {
        let webhook_requests = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "mirrorhook_webhook_requests",
            "Webhook requests by outcome",
            webhook_requests.clone(),
        );

        let mirror_duration_seconds = Family::<StrategyLabels, Histogram>::new_with_constructor(
            || Histogram::new(exponential_buckets(0.1, 2.0, 12)),
        );
        registry.register(
            "mirrorhook_mirror_duration_seconds",
            "Mirror pipeline latency in seconds by replication strategy",
            mirror_duration_seconds.clone(),
        );

        let repo_lock_timeouts = Counter::default();
        registry.register(
            "mirrorhook_repo_lock_timeouts",
            "Requests that gave up waiting for the per-repository lock",
            repo_lock_timeouts.clone(),
        );

        let mirrors_in_flight: Gauge = Gauge::default();
        registry.register(
            "mirrorhook_mirrors_in_flight",
            "Mirror pipelines currently running",
            mirrors_in_flight.clone(),
        );

        Self {
            webhook_requests,
            mirror_duration_seconds,
            repo_lock_timeouts,
            mirrors_in_flight,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Thread-safe wrapper for the metrics registry, used in [`AppState`].
///
/// [`AppState`]: crate::AppState
#[derive(Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub metrics: Arc<Metrics>,
}

impl MetricsRegistry {
    /// Build a fresh registry and pre-register all service metrics.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let metrics = Metrics::new(&mut registry);
        Self {
            registry: Arc::new(registry),
            metrics: Arc::new(metrics),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
