// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! Translates domain errors to an HTTP status and a structured JSON error
//! body (§7 "User-visible behavior": never leak internal `Debug`
//! representations to the caller).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use karya_core::ExecutorError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        match &err {
            ExecutorError::StoreError(message) if message.contains("already exists") => {
                tracing::warn!(error = %err, "store conflict");
                ApiError::conflict(message.clone())
            }
            ExecutorError::StoreError(_) => {
                tracing::error!(error = %err, "store operation failed");
                ApiError::new("store_error", err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "unhandled ingress error");
                ApiError::new("internal_error", err.to_string())
            }
        }
    }
}
