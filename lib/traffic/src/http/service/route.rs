// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Route estimation service.
//!
//! Serves a single pre-trained model. `POST /route` measures the
//! great-circle distance between two coordinates, scores the model for a
//! corridor speed, and derives the travel time. Browser clients call this
//! service directly, so every response carries CORS headers.

use std::env::var;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
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
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use super::error::ErrorResponse;
use super::metrics::{self, Endpoint};
use super::{round_to, Metrics, RouteDoc};
use crate::geo::{self, GeoPoint};
use crate::model::{LinearModel, Predictor, SharedPredictor};

/// Status line reported by `GET /`.
pub const STATUS_MESSAGE: &str = "SmartPath backend running";

/// Default artifact file name, resolved next to the running executable.
pub const DEFAULT_MODEL_FILENAME: &str = "model.json";

/// Feature vector handed to the route model. A fixed placeholder, not
/// derived from the request; it must stay as wide as the vectors the model
/// was trained with.
// TODO: derive features from the requested route once a per-route model is trained
const ROUTE_FEATURES: [f64; 3] = [1.0, 0.0, 0.0];

/// Bounds applied to the scaled model output, km/h.
const MIN_SPEED_KMPH: f64 = 15.0;
const MAX_SPEED_KMPH: f64 = 60.0;

/// The model output is in tens of km/h; scale before clamping.
const SPEED_SCALE: f64 = 10.0;

/// Environment variable to set the service status endpoint path (default: `/`)
static HTTP_SVC_STATUS_PATH_ENV: &str = "SP_HTTP_SVC_STATUS_PATH";

/// Environment variable to set the route estimation endpoint path (default: `/route`)
static HTTP_SVC_ROUTE_PATH_ENV: &str = "SP_HTTP_SVC_ROUTE_PATH";

/// Route service shared state
pub struct State {
    metrics: Arc<Metrics>,
    predictor: SharedPredictor,
}

impl State {
    pub fn new(predictor: SharedPredictor) -> Self {
        Self {
            predictor,
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Get the Prometheus [`Metrics`] object which tracks request counts and inflight requests
    pub fn metrics_clone(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub source: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    /// `[[src.lat, src.lng], [dst.lat, dst.lng]]`, echoed for map rendering.
    pub route: [[f64; 2]; 2],
    pub distance_km: f64,
    pub predicted_speed_kmph: f64,
    pub travel_time_min: f64,
}

#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
}

/// Scale the raw model output to km/h, clamp, and round to one place.
fn clamp_speed(raw: f64) -> f64 {
    round_to((raw * SPEED_SCALE).clamp(MIN_SPEED_KMPH, MAX_SPEED_KMPH), 1)
}

/// Service Status Handler
async fn service_status(
    axum::extract::State(_state): axum::extract::State<Arc<State>>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ServiceStatus {
            status: STATUS_MESSAGE,
        }),
    )
}

/// Route Estimation Handler
///
/// The travel time is derived from the already-rounded distance and speed,
/// so the three response fields always agree with each other.
#[tracing::instrument(skip_all)]
async fn estimate_route(
    axum::extract::State(state): axum::extract::State<Arc<State>>,
    Json(request): Json<RouteRequest>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::trace!(request_id, "new route estimation request");

    let mut inflight_guard = state.metrics_clone().create_inflight_guard(Endpoint::Route);

    let distance_km = round_to(geo::distance_km(&request.source, &request.destination), 2);

    let raw = state
        .predictor()
        .predict(&ROUTE_FEATURES)
        .map_err(|err| ErrorResponse::from_anyhow(err.into(), "Failed to evaluate route model"))?;
    let predicted_speed_kmph = clamp_speed(raw);

    let travel_time_min = round_to(distance_km / predicted_speed_kmph * 60.0, 1);

    let response = RouteResponse {
        route: [
            [request.source.lat, request.source.lng],
            [request.destination.lat, request.destination.lng],
        ],
        distance_km,
        predicted_speed_kmph,
        travel_time_min,
    };

    inflight_guard.mark_ok();
    Ok(Json(response).into_response())
}

/// Create an Axum [`Router`] for the service status endpoint
/// If not path is provided, the default path is `/`
pub fn service_status_router(state: Arc<State>, path: Option<String>) -> (Vec<RouteDoc>, Router) {
    let path = path.unwrap_or("/".to_string());
    let doc = RouteDoc::new(axum::http::Method::GET, &path);
    let router = Router::new()
        .route(&path, get(service_status))
        .with_state(state);
    (vec![doc], router)
}

/// Create an Axum [`Router`] for the route estimation endpoint
/// If not path is provided, the default path is `/route`
pub fn estimate_route_router(state: Arc<State>, path: Option<String>) -> (Vec<RouteDoc>, Router) {
    let path = path.unwrap_or("/route".to_string());
    let doc = RouteDoc::new(axum::http::Method::POST, &path);
    let router = Router::new()
        .route(&path, post(estimate_route))
        .with_state(state);
    (vec![doc], router)
}

/// Permissive CORS with credentials. A credentialed wildcard is forbidden by
/// the fetch spec, so the origin, methods, and headers mirror the request.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// HTTP service for route estimation
///
/// The service is built from a [`RouteHttpServiceConfig`]; see
/// [`RouteHttpService::builder`].
#[derive(Clone)]
pub struct RouteHttpService {
    // The state we share with every request handler
    state: Arc<State>,

    router: Router,
    port: u16,
    host: String,
    route_docs: Vec<RouteDoc>,
}

#[derive(Clone, Builder)]
#[builder(pattern = "owned", build_fn(private, name = "build_internal"))]
pub struct RouteHttpServiceConfig {
    #[builder(default = "8000")]
    port: u16,

    #[builder(setter(into), default = "String::from(\"0.0.0.0\")")]
    host: String,

    /// Artifact path; `None` means [`DEFAULT_MODEL_FILENAME`] next to the
    /// running executable.
    #[builder(default = "None")]
    model_path: Option<PathBuf>,

    /// Pre-built predictor; when set, `model_path` is not read.
    #[builder(default = "None")]
    predictor: Option<SharedPredictor>,
}

impl RouteHttpService {
    pub fn builder() -> RouteHttpServiceConfigBuilder {
        RouteHttpServiceConfigBuilder::default()
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

impl RouteHttpServiceConfigBuilder {
    pub fn build(self) -> Result<RouteHttpService, anyhow::Error> {
        let config: RouteHttpServiceConfig = self.build_internal()?;

        let predictor = match config.predictor {
            Some(predictor) => predictor,
            None => Arc::new(load_model(config.model_path)?),
        };
        let state = Arc::new(State::new(predictor));

        // enable prometheus metrics
        let metrics_registry = metrics::Registry::new();
        state.metrics_clone().register(&metrics_registry)?;

        let mut router = Router::new();
        let mut all_docs = Vec::new();

        let routes = vec![
            metrics::router(metrics_registry, var(metrics::METRICS_PATH_ENV).ok()),
            service_status_router(state.clone(), var(HTTP_SVC_STATUS_PATH_ENV).ok()),
            estimate_route_router(state.clone(), var(HTTP_SVC_ROUTE_PATH_ENV).ok()),
        ];

        for (route_docs, route) in routes.into_iter() {
            router = router.merge(route);
            all_docs.extend(route_docs);
        }

        let router = router.layer(cors_layer());

        Ok(RouteHttpService {
            state,
            router,
            port: config.port,
            host: config.host,
            route_docs: all_docs,
        })
    }

    pub fn with_predictor(mut self, predictor: SharedPredictor) -> Self {
        self.predictor = Some(Some(predictor));
        self
    }
}

/// Load the route model from `model_path`, falling back to
/// [`DEFAULT_MODEL_FILENAME`] next to the running executable.
fn load_model(model_path: Option<PathBuf>) -> Result<LinearModel> {
    let path = match model_path {
        Some(path) => path,
        None => default_model_path()?,
    };
    let model = LinearModel::load_from_json_file(&path)
        .with_context(|| format!("failed to load route model from {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        num_features = model.num_features(),
        "route model loaded"
    );
    Ok(model)
}

/// [`DEFAULT_MODEL_FILENAME`] beside the current executable.
pub fn default_model_path() -> Result<PathBuf> {
    let mut path = std::env::current_exe().context("cannot locate current executable")?;
    path.set_file_name(DEFAULT_MODEL_FILENAME);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_speed_scales_and_bounds() {
        assert_eq!(clamp_speed(3.0), 30.0);
        assert_eq!(clamp_speed(100.0), 60.0);
        assert_eq!(clamp_speed(0.2), 15.0);
        assert_eq!(clamp_speed(-4.0), 15.0);
        assert_eq!(clamp_speed(5.99), 59.9);
        assert_eq!(clamp_speed(1.5), 15.0);
        assert_eq!(clamp_speed(6.0), 60.0);
    }

    #[test]
    fn test_default_model_path_is_beside_executable() {
        let path = default_model_path().unwrap();
        assert_eq!(path.file_name().unwrap(), DEFAULT_MODEL_FILENAME);
        assert!(path.parent().is_some());
    }

    #[test]
    fn test_route_features_width_matches_trained_models() {
        let model = LinearModel::new(vec![3.0, 0.0, 0.0], 0.0);
        assert_eq!(model.num_features(), ROUTE_FEATURES.len());
        assert!((model.predict(&ROUTE_FEATURES).unwrap() - 3.0).abs() < 1e-12);
    }
}
