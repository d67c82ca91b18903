// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Sensor model registry service.
//!
//! Serves one pre-trained model per road sensor. `GET /` reports the
//! registry, `POST /predict` scores the model registered for a sensor id on
//! the previous speed reading.

use std::env::var;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::ErrorResponse;
use super::metrics::{self, Endpoint};
use super::{round_to, Metrics, RouteDoc};
use crate::registry::SensorModelRegistry;

/// Liveness line reported by `GET /`.
pub const INFO_MESSAGE: &str = "Traffic Speed Prediction API is running!";

/// Marker appended to the sensor listing; always present, even when the
/// registry was not truncated.
const MORE_SENSORS_MARKER: &str = "...";

/// Sensor ids shown by `GET /` before the truncation marker.
const MAX_LISTED_SENSORS: usize = 5;

/// Decimal places kept on predicted speeds.
const PREDICTION_DECIMALS: u32 = 4;

/// Environment variable to set the service info endpoint path (default: `/`)
static HTTP_SVC_INFO_PATH_ENV: &str = "SP_HTTP_SVC_INFO_PATH";

/// Environment variable to set the prediction endpoint path (default: `/predict`)
static HTTP_SVC_PREDICT_PATH_ENV: &str = "SP_HTTP_SVC_PREDICT_PATH";

/// Sensor service shared state
pub struct State {
    metrics: Arc<Metrics>,
    registry: Arc<SensorModelRegistry>,
}

impl State {
    pub fn new(registry: Arc<SensorModelRegistry>) -> Self {
        Self {
            registry,
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Get the Prometheus [`Metrics`] object which tracks request counts and inflight requests
    pub fn metrics_clone(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn registry(&self) -> &SensorModelRegistry {
        Arc::as_ref(&self.registry)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub sensor_id: i64,
    pub previous_speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub sensor_id: i64,
    pub previous_speed: f64,
    pub predicted_speed: f64,
}

#[derive(Serialize)]
struct ServiceInfo {
    message: &'static str,
    total_models: usize,
    available_sensors: Vec<serde_json::Value>,
}

/// First [`MAX_LISTED_SENSORS`] sensor ids in scan order, then the marker.
fn available_sensors(registry: &SensorModelRegistry) -> Vec<serde_json::Value> {
    let mut listed: Vec<serde_json::Value> = registry
        .sensor_ids()
        .iter()
        .take(MAX_LISTED_SENSORS)
        .map(|id| serde_json::Value::from(*id))
        .collect();
    listed.push(serde_json::Value::from(MORE_SENSORS_MARKER));
    listed
}

/// Service Info Handler
async fn service_info(
    axum::extract::State(state): axum::extract::State<Arc<State>>,
) -> impl IntoResponse {
    let registry = state.registry();
    let info = ServiceInfo {
        message: INFO_MESSAGE,
        total_models: registry.len(),
        available_sensors: available_sensors(registry),
    };
    (StatusCode::OK, Json(info))
}

/// Sensor Prediction Handler
///
/// Scores the sensor's model on the single-element feature vector
/// `[previous_speed]` and returns the prediction rounded to
/// [`PREDICTION_DECIMALS`] places. An unregistered sensor id is a 404 whose
/// error string is part of the wire contract.
#[tracing::instrument(skip_all)]
async fn predict(
    axum::extract::State(state): axum::extract::State<Arc<State>>,
    Json(request): Json<PredictionRequest>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::trace!(
        request_id,
        sensor_id = request.sensor_id,
        "new prediction request"
    );

    let model = state
        .registry()
        .get(request.sensor_id)
        .map_err(|err| ErrorResponse::not_found(&err.to_string()))?;

    let mut inflight_guard = state
        .metrics_clone()
        .create_inflight_guard(Endpoint::Predict);

    let raw = model
        .predict(&[request.previous_speed])
        .map_err(|err| ErrorResponse::from_anyhow(err.into(), "Failed to evaluate sensor model"))?;

    let response = PredictionResponse {
        sensor_id: request.sensor_id,
        previous_speed: request.previous_speed,
        predicted_speed: round_to(raw, PREDICTION_DECIMALS),
    };

    inflight_guard.mark_ok();
    Ok(Json(response).into_response())
}

/// Create an Axum [`Router`] for the service info endpoint
/// If not path is provided, the default path is `/`
pub fn service_info_router(state: Arc<State>, path: Option<String>) -> (Vec<RouteDoc>, Router) {
    let path = path.unwrap_or("/".to_string());
    let doc = RouteDoc::new(axum::http::Method::GET, &path);
    let router = Router::new()
        .route(&path, get(service_info))
        .with_state(state);
    (vec![doc], router)
}

/// Create an Axum [`Router`] for the prediction endpoint
/// If not path is provided, the default path is `/predict`
pub fn predict_router(state: Arc<State>, path: Option<String>) -> (Vec<RouteDoc>, Router) {
    let path = path.unwrap_or("/predict".to_string());
    let doc = RouteDoc::new(axum::http::Method::POST, &path);
    let router = Router::new().route(&path, post(predict)).with_state(state);
    (vec![doc], router)
}

/// HTTP service for the sensor model registry
///
/// The service is built from a [`SensorHttpServiceConfig`]; see
/// [`SensorHttpService::builder`].
#[derive(Clone)]
pub struct SensorHttpService {
    // The state we share with every request handler
    state: Arc<State>,

    router: Router,
    port: u16,
    host: String,
    route_docs: Vec<RouteDoc>,
}

#[derive(Clone, Builder)]
#[builder(pattern = "owned", build_fn(private, name = "build_internal"))]
pub struct SensorHttpServiceConfig {
    #[builder(default = "8000")]
    port: u16,

    #[builder(setter(into), default = "String::from(\"0.0.0.0\")")]
    host: String,

    /// Directory scanned for `model_<sensor_id>.json` artifacts.
    #[builder(setter(into), default = "PathBuf::from(\"sensor_models\")")]
    model_dir: PathBuf,

    /// Pre-built registry; when set, `model_dir` is not read.
    #[builder(default = "None")]
    registry: Option<Arc<SensorModelRegistry>>,
}

impl SensorHttpService {
    pub fn builder() -> SensorHttpServiceConfigBuilder {
        SensorHttpServiceConfigBuilder::default()
    }

    pub fn state_clone(&self) -> Arc<State> {
        self.state.clone()
    }

    pub fn state(&self) -> &State {
        Arc::as_ref(&self.state)
    }

    pub async fn spawn(&self, cancel_token: CancellationToken) -> JoinHandle<Result<()>> {
        let this = self.clone();
        tokio::spawn(async move { this.run(cancel_token).await })
    }

    pub async fn run(&self, cancel_token: CancellationToken) -> Result<()> {
        super::serve_http(&self.host, self.port, self.router.clone(), cancel_token).await
    }

    /// Documentation of exposed HTTP endpoints
    pub fn route_docs(&self) -> &[RouteDoc] {
        &self.route_docs
    }
}

impl SensorHttpServiceConfigBuilder {
    pub fn build(self) -> Result<SensorHttpService, anyhow::Error> {
        let config: SensorHttpServiceConfig = self.build_internal()?;

        let registry = match config.registry {
            Some(registry) => registry,
            None => Arc::new(SensorModelRegistry::from_dir(&config.model_dir)?),
        };
        let state = Arc::new(State::new(registry));

        // enable prometheus metrics
        let metrics_registry = metrics::Registry::new();
        state.metrics_clone().register(&metrics_registry)?;

        let mut router = Router::new();
        let mut all_docs = Vec::new();

        let routes = vec![
            metrics::router(metrics_registry, var(metrics::METRICS_PATH_ENV).ok()),
            service_info_router(state.clone(), var(HTTP_SVC_INFO_PATH_ENV).ok()),
            predict_router(state.clone(), var(HTTP_SVC_PREDICT_PATH_ENV).ok()),
        ];

        for (route_docs, route) in routes.into_iter() {
            router = router.merge(route);
            all_docs.extend(route_docs);
        }

        Ok(SensorHttpService {
            state,
            router,
            port: config.port,
            host: config.host,
            route_docs: all_docs,
        })
    }

    pub fn with_registry(mut self, registry: Arc<SensorModelRegistry>) -> Self {
        self.registry = Some(Some(registry));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearModel, SharedPredictor};

    fn registry_with_ids(ids: &[i64]) -> SensorModelRegistry {
        SensorModelRegistry::from_entries(
            ids.iter()
                .map(|&id| (id, Arc::new(LinearModel::new(vec![1.0], 0.0)) as SharedPredictor)),
        )
    }

    #[test]
    fn test_available_sensors_empty_registry() {
        let registry = registry_with_ids(&[]);
        assert_eq!(
            available_sensors(&registry),
            vec![serde_json::Value::from("...")]
        );
    }

    #[test]
    fn test_available_sensors_small_registry() {
        let registry = registry_with_ids(&[3, 1, 2]);
        let listed = available_sensors(&registry);
        assert_eq!(listed.len(), 4);
        assert_eq!(listed[0], 3);
        assert_eq!(listed[1], 1);
        assert_eq!(listed[2], 2);
        assert_eq!(listed[3], "...");
    }

    #[test]
    fn test_available_sensors_truncates_to_five() {
        let registry = registry_with_ids(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let listed = available_sensors(&registry);
        assert_eq!(listed.len(), 6);
        assert_eq!(listed[4], 5);
        assert_eq!(*listed.last().unwrap(), "...");
    }
}
