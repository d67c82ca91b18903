// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Error bodies and status-code mapping shared by both services.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model glue that wants to surface a specific HTTP status code maps its
/// errors to this type; anything else becomes a 500.
#[derive(Debug, Error)]
#[error("HTTP Error {code}: {message}")]
pub struct HttpError {
    pub code: u16,
    pub message: String,
}

/// JSON error body: `{"error": "..."}`
#[derive(Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl ErrorResponse {
    /// Not Found Error
    ///
    /// The message is part of the wire contract; callers match on it.
    pub fn not_found(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: msg.to_string(),
            }),
        )
    }

    /// Internal Service Error
    ///
    /// Return this error when the service encounters an internal error.
    /// Internal service errors are the result of misconfiguration or bugs
    /// in the service.
    pub fn internal_server_error(msg: &str) -> (StatusCode, Json<ErrorResponse>) {
        tracing::error!("Internal server error: {msg}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: msg.to_string(),
            }),
        )
    }

    /// Convert an [`anyhow::Error`] into an error response.
    ///
    /// If the error wraps an [`HttpError`], honor its status code; otherwise
    /// this is an [`ErrorResponse::internal_server_error`] with the details
    /// of the error appended to `alt_msg`.
    pub fn from_anyhow(err: anyhow::Error, alt_msg: &str) -> (StatusCode, Json<ErrorResponse>) {
        match err.downcast::<HttpError>() {
            Ok(http_error) => ErrorResponse::from_http_error(http_error),
            Err(err) => ErrorResponse::internal_server_error(&format!("{alt_msg}: {err}")),
        }
    }

    /// Implementers should only be able to throw 400-499 errors.
    pub fn from_http_error(err: HttpError) -> (StatusCode, Json<ErrorResponse>) {
        if err.code < 400 || err.code >= 500 {
            return ErrorResponse::internal_server_error(&err.message);
        }

        match StatusCode::from_u16(err.code) {
            Ok(code) => (code, Json(ErrorResponse { error: err.message })),
            Err(_) => ErrorResponse::internal_server_error(&err.message),
        }
    }
}

impl From<HttpError> for ErrorResponse {
    fn from(err: HttpError) -> Self {
        ErrorResponse { error: err.message }
    }
}
