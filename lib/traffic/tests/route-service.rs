// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use reqwest::StatusCode;

use smartpath_traffic::http::service::route::RouteHttpService;
use smartpath_traffic::model::{LinearModel, SharedPredictor};
use smartpath_traffic::CancellationToken;

#[path = "common/ports.rs"]
mod ports;
use ports::get_random_port;

async fn wait_for_ready(url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(response) = client.get(url).send().await {
            if response.status() == StatusCode::OK {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("service at {url} never became ready");
}

async fn start_service(predictor: SharedPredictor) -> (String, CancellationToken) {
    let port = get_random_port().await;
    let service = RouteHttpService::builder()
        .port(port)
        .host("127.0.0.1")
        .with_predictor(predictor)
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move { service.run(token).await });

    let url = format!("http://127.0.0.1:{port}");
    wait_for_ready(&url).await;
    (url, cancel)
}

/// Post the downtown Los Angeles pair used across these tests.
async fn post_route(url: &str) -> serde_json::Value {
    let response = reqwest::Client::new()
        .post(format!("{url}/route"))
        .json(&serde_json::json!({
            "source": {"lat": 34.05, "lng": -118.25},
            "destination": {"lat": 34.06, "lng": -118.20}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_status_body() {
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![3.0, 0.0, 0.0], 0.0))).await;

    let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "SmartPath backend running"}));

    cancel.cancel();
}

#[tokio::test]
async fn test_route_estimate_downtown_la() {
    // the model maps [1, 0, 0] to 3.0, which scales to 30 km/h
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![3.0, 0.0, 0.0], 0.0))).await;

    let body = post_route(&url).await;
    assert_eq!(body["distance_km"], 4.74);
    assert_eq!(body["predicted_speed_kmph"], 30.0);
    assert_eq!(body["travel_time_min"], 9.5);
    assert_eq!(
        body["route"],
        serde_json::json!([[34.05, -118.25], [34.06, -118.20]])
    );

    cancel.cancel();
}

#[tokio::test]
async fn test_speed_clamped_high() {
    // raw 50.0 scales to 500 km/h; the cap wins
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![50.0, 0.0, 0.0], 0.0))).await;

    let body = post_route(&url).await;
    assert_eq!(body["predicted_speed_kmph"], 60.0);

    cancel.cancel();
}

#[tokio::test]
async fn test_speed_clamped_low() {
    // raw 0.0 scales to 0 km/h; the floor keeps the travel time finite
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![0.0, 0.0, 0.0], 0.0))).await;

    let body = post_route(&url).await;
    assert_eq!(body["predicted_speed_kmph"], 15.0);

    cancel.cancel();
}

#[tokio::test]
async fn test_travel_time_consistent_with_rounded_fields() {
    // raw 3.33 lands between clamp bounds at 33.3 km/h
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![3.33, 0.0, 0.0], 0.0))).await;

    let body = post_route(&url).await;
    let distance = body["distance_km"].as_f64().unwrap();
    let speed = body["predicted_speed_kmph"].as_f64().unwrap();
    let travel = body["travel_time_min"].as_f64().unwrap();
    assert_eq!(travel, (distance / speed * 60.0 * 10.0).round() / 10.0);

    cancel.cancel();
}

#[tokio::test]
async fn test_wrong_width_model_is_500() {
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![1.0], 0.0))).await;

    let response = reqwest::Client::new()
        .post(format!("{url}/route"))
        .json(&serde_json::json!({
            "source": {"lat": 34.05, "lng": -118.25},
            "destination": {"lat": 34.06, "lng": -118.20}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json().await.unwrap();
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("Failed to evaluate route model"), "got: {msg}");

    cancel.cancel();
}

#[tokio::test]
async fn test_cors_preflight_mirrors_origin_with_credentials() {
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![3.0, 0.0, 0.0], 0.0))).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{url}/route"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
    assert_eq!(headers.get("access-control-allow-methods").unwrap(), "POST");
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "content-type"
    );

    cancel.cancel();
}

#[tokio::test]
async fn test_simple_request_carries_cors_headers() {
    let (url, cancel) = start_service(Arc::new(LinearModel::new(vec![3.0, 0.0, 0.0], 0.0))).await;

    let response = reqwest::Client::new()
        .get(&url)
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:3000"
    );

    cancel.cancel();
}

#[tokio::test]
async fn test_startup_fails_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-model.json");

    let result = RouteHttpService::builder().model_path(Some(missing)).build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_loads_artifact_from_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    LinearModel::new(vec![3.0, 0.0, 0.0], 0.0)
        .save_to_json_file(&path)
        .unwrap();

    let port = get_random_port().await;
    let service = RouteHttpService::builder()
        .port(port)
        .host("127.0.0.1")
        .model_path(Some(path))
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move { service.run(token).await });

    let url = format!("http://127.0.0.1:{port}");
    wait_for_ready(&url).await;

    let body = post_route(&url).await;
    assert_eq!(body["predicted_speed_kmph"], 30.0);

    cancel.cancel();
}
