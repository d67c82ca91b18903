// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};
use std::{sync::Arc, time::Instant};

pub use prometheus::Registry;

use super::RouteDoc;

// Default metric prefix
pub const FRONTEND_METRIC_PREFIX: &str = "smartpath_frontend";

// Environment variable that overrides the default metric prefix if provided
pub const METRICS_PREFIX_ENV: &str = "SP_METRICS_PREFIX";

/// Environment variable to set the metrics endpoint path (default: `/metrics`)
pub const METRICS_PATH_ENV: &str = "SP_HTTP_SVC_METRICS_PATH";

/// Value for the `status` label in the request counter for successful requests
pub const REQUEST_STATUS_SUCCESS: &str = "success";

/// Value for the `status` label in the request counter if the request failed
pub const REQUEST_STATUS_ERROR: &str = "error";

fn sanitize_prometheus_prefix(raw: &str) -> String {
    // Prometheus metric name pattern: [a-zA-Z_:][a-zA-Z0-9_:]*
    let mut s: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if s.is_empty() {
        return FRONTEND_METRIC_PREFIX.to_string();
    }

    let first = s.as_bytes()[0];
    let valid_first = first.is_ascii_alphabetic() || first == b'_' || first == b':';
    if !valid_first {
        s.insert(0, '_');
    }
    s
}

pub struct Metrics {
    request_counter: IntCounterVec,
    inflight_gauge: IntGaugeVec,
    request_duration: HistogramVec,
}

/// RAII object for inflight gauge and request counters
/// If this object is dropped without calling `mark_ok`, then the request will increment
/// the request counter with the `status` label with [`REQUEST_STATUS_ERROR`]; otherwise, it will
/// increment the counter with `status` label [`REQUEST_STATUS_SUCCESS`]
pub struct InflightGuard {
    metrics: Arc<Metrics>,
    endpoint: Endpoint,
    status: Status,
    timer: Instant,
}

/// Requests will be logged by the type of endpoint hit
pub enum Endpoint {
    /// Per-sensor speed prediction
    Predict,

    /// Route estimation
    Route,
}

/// Status
pub enum Status {
    Success,
    Error,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create Metrics with the standard prefix defined by [`FRONTEND_METRIC_PREFIX`] or specify custom prefix via the following environment variable:
    /// - `SP_METRICS_PREFIX`: Override the default metrics prefix
    ///
    /// The following metrics will be created with the configured prefix:
    /// - `{prefix}_requests_total` - IntCounterVec for the total number of requests processed
    /// - `{prefix}_inflight_requests` - IntGaugeVec for the number of inflight requests
    /// - `{prefix}_request_duration_seconds` - HistogramVec for the duration of requests
    pub fn new() -> Self {
        let raw_prefix = std::env::var(METRICS_PREFIX_ENV)
            .unwrap_or_else(|_| FRONTEND_METRIC_PREFIX.to_string());
        let prefix = sanitize_prometheus_prefix(&raw_prefix);
        if prefix != raw_prefix {
            tracing::warn!(
                raw=%raw_prefix,
                sanitized=%prefix,
                env=%METRICS_PREFIX_ENV,
                "Sanitized HTTP metrics prefix"
            );
        }
        let frontend_metric_name = |suffix: &str| format!("{}_{}", &prefix, suffix);

        let request_counter = IntCounterVec::new(
            Opts::new(
                frontend_metric_name("requests_total"),
                "Total number of prediction requests processed",
            ),
            &["endpoint", "status"],
        )
        .unwrap();

        let inflight_gauge = IntGaugeVec::new(
            Opts::new(
                frontend_metric_name("inflight_requests"),
                "Number of inflight requests",
            ),
            &["endpoint"],
        )
        .unwrap();

        // scoring a linear model is cheap; the interesting range is milliseconds
        let buckets = vec![
            0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
        ];

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                frontend_metric_name("request_duration_seconds"),
                "Duration of prediction requests",
            )
            .buckets(buckets),
            &["endpoint"],
        )
        .unwrap();

        Metrics {
            request_counter,
            inflight_gauge,
            request_duration,
        }
    }

    /// Get the number of requests for the given dimensions:
    /// - endpoint (predict/route)
    /// - status (success/error)
    pub fn get_request_counter(&self, endpoint: &Endpoint, status: &Status) -> u64 {
        self.request_counter
            .with_label_values(&[endpoint.as_str(), status.as_str()])
            .get()
    }

    fn inc_request_counter(&self, endpoint: &Endpoint, status: &Status) {
        self.request_counter
            .with_label_values(&[endpoint.as_str(), status.as_str()])
            .inc()
    }

    /// Get the number of inflight requests for the given endpoint
    pub fn get_inflight_count(&self, endpoint: &Endpoint) -> i64 {
        self.inflight_gauge
            .with_label_values(&[endpoint.as_str()])
            .get()
    }

    fn inc_inflight_gauge(&self, endpoint: &Endpoint) {
        self.inflight_gauge
            .with_label_values(&[endpoint.as_str()])
            .inc()
    }

    fn dec_inflight_gauge(&self, endpoint: &Endpoint) {
        self.inflight_gauge
            .with_label_values(&[endpoint.as_str()])
            .dec()
    }

    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.request_counter.clone()))?;
        registry.register(Box::new(self.inflight_gauge.clone()))?;
        registry.register(Box::new(self.request_duration.clone()))?;
        Ok(())
    }

    /// Create a new [`InflightGuard`] for the kind of endpoint that was hit
    ///
    /// The [`InflightGuard`] is an RAII object that will handle incrementing
    /// the inflight gauge and request counters.
    pub fn create_inflight_guard(self: Arc<Self>, endpoint: Endpoint) -> InflightGuard {
        InflightGuard::new(self.clone(), endpoint)
    }
}

impl InflightGuard {
    fn new(metrics: Arc<Metrics>, endpoint: Endpoint) -> Self {
        // Start the timer
        let timer = Instant::now();

        // Increment the inflight gauge when the guard is created
        metrics.inc_inflight_gauge(&endpoint);

        // Return the RAII Guard
        InflightGuard {
            metrics,
            endpoint,
            status: Status::Error,
            timer,
        }
    }

    pub(crate) fn mark_ok(&mut self) {
        self.status = Status::Success;
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        // Decrement the gauge when the guard is dropped
        self.metrics.dec_inflight_gauge(&self.endpoint);

        self.metrics
            .inc_request_counter(&self.endpoint, &self.status);

        // Record the duration of the request
        self.metrics
            .request_duration
            .with_label_values(&[self.endpoint.as_str()])
            .observe(self.timer.elapsed().as_secs_f64());
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Predict => "predict",
            Endpoint::Route => "route",
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => REQUEST_STATUS_SUCCESS,
            Status::Error => REQUEST_STATUS_ERROR,
        }
    }
}

/// Create a new router with the given path
pub fn router(registry: Registry, path: Option<String>) -> (Vec<RouteDoc>, Router) {
    let registry = Arc::new(registry);
    let path = path.unwrap_or_else(|| "/metrics".to_string());
    let doc = RouteDoc::new(axum::http::Method::GET, &path);
    let route = Router::new()
        .route(&path, get(handler_metrics))
        .with_state(registry);
    (vec![doc], route)
}

/// Metrics Handler
async fn handler_metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response();
    }

    let metrics = match String::from_utf8(buffer) {
        Ok(metrics) => metrics,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response();
        }
    };

    (StatusCode::OK, metrics).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_prometheus_prefix() {
        assert_eq!(sanitize_prometheus_prefix("smartpath"), "smartpath");
        assert_eq!(sanitize_prometheus_prefix("smart-path"), "smart_path");
        assert_eq!(sanitize_prometheus_prefix("9path"), "_9path");
        assert_eq!(sanitize_prometheus_prefix(""), FRONTEND_METRIC_PREFIX);
    }

    #[test]
    fn test_guard_drop_counts_error_without_mark_ok() {
        let metrics = Arc::new(Metrics::new());

        {
            let _guard = metrics.clone().create_inflight_guard(Endpoint::Predict);
            assert_eq!(metrics.get_inflight_count(&Endpoint::Predict), 1);
        }
        assert_eq!(metrics.get_inflight_count(&Endpoint::Predict), 0);
        assert_eq!(
            metrics.get_request_counter(&Endpoint::Predict, &Status::Error),
            1
        );

        {
            let mut guard = metrics.clone().create_inflight_guard(Endpoint::Predict);
            guard.mark_ok();
        }
        assert_eq!(
            metrics.get_request_counter(&Endpoint::Predict, &Status::Success),
            1
        );
    }
}
