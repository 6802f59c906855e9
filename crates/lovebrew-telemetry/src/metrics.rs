//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters relevant to building and converting homebrew assets.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    builds_total: IntCounterVec,
    conversions_total: IntCounterVec,
    tool_invocations_total: IntCounterVec,
    build_failures_total: IntCounter,
    builds_in_flight: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of target builds currently running.
    pub builds_in_flight: i64,
    /// Target builds that failed, across every target.
    pub build_failures_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let builds_total = counter_vec(
            "builds_total",
            "Target builds completed by outcome",
            &["target", "outcome"],
        )?;
        let conversions_total = counter_vec(
            "conversions_total",
            "Asset conversions completed by kind and outcome",
            &["kind", "outcome"],
        )?;
        let tool_invocations_total = counter_vec(
            "tool_invocations_total",
            "External SDK tool invocations by status",
            &["tool", "status"],
        )?;
        let build_failures_total = IntCounter::with_opts(Opts::new(
            "build_failures_total",
            "Target builds that failed across all targets",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "build_failures_total",
            source,
        })?;
        let builds_in_flight = IntGauge::with_opts(Opts::new(
            "builds_in_flight",
            "Target builds currently running",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "builds_in_flight",
            source,
        })?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "builds_total", &builds_total)?;
        register(&registry, "conversions_total", &conversions_total)?;
        register(&registry, "tool_invocations_total", &tool_invocations_total)?;
        register(&registry, "build_failures_total", &build_failures_total)?;
        register(&registry, "builds_in_flight", &builds_in_flight)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                builds_total,
                conversions_total,
                tool_invocations_total,
                build_failures_total,
                builds_in_flight,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record a finished target build.
    pub fn inc_build(&self, target: &str, succeeded: bool) {
        self.inner
            .builds_total
            .with_label_values(&[target, outcome(succeeded)])
            .inc();
        if !succeeded {
            self.inner.build_failures_total.inc();
        }
    }

    /// Number of finished builds recorded for a target and outcome.
    #[must_use]
    pub fn build_count(&self, target: &str, succeeded: bool) -> u64 {
        self.inner
            .builds_total
            .with_label_values(&[target, outcome(succeeded)])
            .get()
    }

    /// Record a finished asset conversion.
    pub fn inc_conversion(&self, kind: &str, succeeded: bool) {
        self.inner
            .conversions_total
            .with_label_values(&[kind, outcome(succeeded)])
            .inc();
    }

    /// Record an external tool invocation.
    pub fn inc_tool_invocation(&self, tool: &str, status: &str) {
        self.inner
            .tool_invocations_total
            .with_label_values(&[tool, status])
            .inc();
    }

    /// Mark a target build as started.
    pub fn build_started(&self) {
        self.inner.builds_in_flight.inc();
    }

    /// Mark a target build as finished.
    pub fn build_finished(&self) {
        self.inner.builds_in_flight.dec();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            builds_in_flight: self.inner.builds_in_flight.get(),
            build_failures_total: self.inner.build_failures_total.get(),
        }
    }
}

const fn outcome(succeeded: bool) -> &'static str {
    if succeeded { "success" } else { "failure" }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
