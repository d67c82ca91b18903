// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! HTTP services for SmartPath traffic models.
//!
//! Two services share the plumbing in this module: the sensor model registry
//! service ([`sensor`]) and the route estimation service ([`route`]). Each is
//! assembled from per-endpoint router constructors returning
//! `(Vec<RouteDoc>, Router)`, merged behind a builder, and run with graceful
//! shutdown on a [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! Both services expose Prometheus metrics on `/metrics`; see [`metrics`].

pub mod error;
pub mod metrics;
pub mod route;
pub mod sensor;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

pub use axum;
pub use metrics::Metrics;

/// Documentation for a route
#[derive(Debug, Clone)]
pub struct RouteDoc {
    method: axum::http::Method,
    path: String,
}

impl std::fmt::Display for RouteDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl RouteDoc {
    pub fn new<T: Into<String>>(method: axum::http::Method, path: T) -> RouteDoc {
        RouteDoc {
            method,
            path: path.into(),
        }
    }
}

/// Bind `host:port` and serve `router` until the token fires.
///
/// Cancels the token on a serve error so sibling tasks shut down too.
pub(crate) async fn serve_http(
    host: &str,
    port: u16,
    router: axum::Router,
    cancel_token: CancellationToken,
) -> anyhow::Result<()> {
    let address = format!("{host}:{port}");
    tracing::info!(address, "Starting HTTP service on: {address}");

    let listener = tokio::net::TcpListener::bind(address.as_str())
        .await
        .with_context(|| format!("could not bind to address: {address}"))?;

    let observer = cancel_token.child_token();
    axum::serve(listener, router)
        .with_graceful_shutdown(observer.cancelled_owned())
        .await
        .inspect_err(|_| cancel_token.cancel())?;

    Ok(())
}

/// Round `value` to `digits` decimal places.
pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn test_round_to_places() {
        assert_eq!(round_to(52.34559, 4), 52.3456);
        assert_eq!(round_to(4.738564, 2), 4.74);
        assert_eq!(round_to(9.48, 1), 9.5);
        assert_eq!(round_to(30.0, 1), 30.0);
        // halves round away from zero
        assert_eq!(round_to(-1.25, 1), -1.3);
    }
}
