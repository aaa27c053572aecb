// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! `GET /healthz` (§6) — not named by the distilled contract but standard
//! for a long-running service in this workspace.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::ingress::AppState;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    store_reachable: bool,
}

#[tracing::instrument(skip(state))]
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let store_reachable = state.db_pool.is_healthy().await;
    let status = if store_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthBody {
            status: if store_reachable { "ok" } else { "degraded" },
            store_reachable,
        }),
    )
}
