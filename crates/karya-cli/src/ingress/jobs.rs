// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! `/jobs` ingress routes (§6).

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use karya_core::model::{Context, Job, JobRequest, JobStatus, JobStatusView, Step};
use karya_core::store::JobStore;
use karya_core::FlowExecutor;
use serde::Serialize;
use uuid::Uuid;

use crate::ingress::error::ApiError;
use crate::ingress::AppState;

#[derive(Debug, Serialize)]
pub struct PauseAck {
    pub message: String,
}

/// `POST /jobs` — inserts a fresh `SCHEDULED` row, then hands it to a
/// `FlowExecutor` on a background task so the request returns immediately
/// with the submitted status rather than waiting for the run to finish.
#[tracing::instrument(skip(state, req))]
pub async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<JobRequest>,
) -> Result<Json<JobStatusView>, ApiError> {
    let job_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let job = Job {
        id: job_id.clone(),
        workflow_name: req.workflow_name,
        status: JobStatus::Scheduled,
        steps: req.steps,
        context: Context::new(&job_id, req.parameters),
        current_step_id: None,
        step_retry_counts: Default::default(),
        resume_at: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    };

    state.job_store.insert(job.clone()).await?;
    tracing::info!(job_id = %job_id, "job submitted");

    let executor = FlowExecutor::new(
        job.clone(),
        state.job_store.clone(),
        state.action_store.clone(),
        state.http_client.clone(),
        state.invoker_timeout,
    );
    tokio::spawn(async move {
        let job_id = executor.job_id().to_string();
        if let Err(err) = executor.run().await {
            tracing::error!(job_id = %job_id, error = %err, "job run errored");
        }
    });

    Ok(Json(JobStatusView::from(&job)))
}

/// `GET /jobs/{id}` — `404` if absent.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusView>, ApiError> {
    let job = state
        .job_store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job '{id}' not found")))?;
    Ok(Json(JobStatusView::from(&job)))
}

/// `GET /jobs/{id}/steps` — `404` if absent.
pub async fn get_job_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Step>>, ApiError> {
    let job = state
        .job_store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job '{id}' not found")))?;
    Ok(Json(job.steps))
}

/// `GET /jobs` — list of `{job_id, status, context}`.
pub async fn list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobStatusView>>, ApiError> {
    let jobs = state.job_store.list().await?;
    Ok(Json(jobs.iter().map(JobStatusView::from).collect()))
}

/// `DELETE /jobs/{id}` — `404` if absent.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<()>, ApiError> {
    let deleted = state.job_store.delete(&id).await?;
    if !deleted {
        return Err(ApiError::not_found(format!("job '{id}' not found")));
    }
    tracing::info!(job_id = %id, "job deleted");
    Ok(Json(()))
}

/// `POST /jobs/{id}/pause` — accepted but unimplemented (§6): `200` with an
/// informational body, no state mutation. `404` if the job does not exist.
pub async fn pause_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PauseAck>, ApiError> {
    state
        .job_store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job '{id}' not found")))?;
    Ok(Json(PauseAck {
        message: "pause is accepted but not yet implemented; job continues running".to_string(),
    }))
}
