// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! The HTTP ingress surface (§6): a collaborator around the core, not part
//! of it. Builds the axum router and the shared state handlers read from.

pub mod actions;
pub mod error;
pub mod health;
pub mod jobs;

use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use karya_core::store::{ActionStoreRef, JobStoreRef};
use karya_store::DbPool;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub job_store: JobStoreRef,
    pub action_store: ActionStoreRef,
    pub db_pool: DbPool,
    pub http_client: reqwest::Client,
    pub invoker_timeout: Duration,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/jobs", post(jobs::create_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id", delete(jobs::delete_job))
        .route("/jobs/:id/steps", get(jobs::get_job_steps))
        .route("/jobs/:id/pause", post(jobs::pause_job))
        .route("/actions", post(actions::create_action))
        .route("/actions", get(actions::list_actions))
        .route("/actions/:name", get(actions::get_action))
        .route("/actions/:name", put(actions::update_action))
        .route("/actions/:name", delete(actions::delete_action))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
