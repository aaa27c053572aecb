// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A PostgreSQL-backed [`karya_core::JobStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use karya_core::error::ExecutorError;
use karya_core::model::{Context, Job, JobStatus, Step};
use karya_core::store::JobStore;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::DbPool;

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

fn store_err(err: sqlx::Error) -> ExecutorError {
    ExecutorError::StoreError(err.to_string())
}

fn row_to_job(row: sqlx::postgres::PgRow) -> Result<Job, ExecutorError> {
    let status_str: String = row.try_get("status").map_err(store_err)?;
    let status = JobStatus::from_str(&status_str).map_err(ExecutorError::StoreError)?;
    let context_json: serde_json::Value = row.try_get("context").map_err(store_err)?;
    let context: Context = serde_json::from_value(context_json)?;
    let steps_json: serde_json::Value = row.try_get("steps").map_err(store_err)?;
    let steps: Vec<Step> = serde_json::from_value(steps_json)?;
    let retries_json: serde_json::Value = row.try_get("step_retry_counts").map_err(store_err)?;
    let step_retry_counts = serde_json::from_value(retries_json)?;

    Ok(Job {
        id: row.try_get("id").map_err(store_err)?,
        workflow_name: row.try_get("workflow_name").map_err(store_err)?,
        status,
        steps,
        context,
        current_step_id: row.try_get("current_step_id").map_err(store_err)?,
        step_retry_counts,
        resume_at: row.try_get("resume_at").map_err(store_err)?,
        error_message: row.try_get("error_message").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: Job) -> karya_core::error::Result<()> {
        let context_json = serde_json::to_value(&job.context)?;
        let steps_json = serde_json::to_value(&job.steps)?;
        let retries_json = serde_json::to_value(&job.step_retry_counts)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, workflow_name, status, context, steps, current_step_id,
                step_retry_counts, resume_at, error_message, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&job.id)
        .bind(&job.workflow_name)
        .bind(job.status.as_str())
        .bind(context_json)
        .bind(steps_json)
        .bind(&job.current_step_id)
        .bind(retries_json)
        .bind(job.resume_at)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        tracing::info!(job_id = %job.id, "job row inserted");
        Ok(())
    }

    async fn get(&self, id: &str) -> karya_core::error::Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(row_to_job).transpose()
    }

    async fn list(&self) -> karya_core::error::Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(row_to_job).collect()
    }

    async fn delete(&self, id: &str) -> karya_core::error::Result<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn save(&self, job: &Job) -> karya_core::error::Result<()> {
        let context_json = serde_json::to_value(&job.context)?;
        let steps_json = serde_json::to_value(&job.steps)?;
        let retries_json = serde_json::to_value(&job.step_retry_counts)?;

        // Writes `context` whole, never field-merged (§5 shared-resource
        // policy). A zero-row update means the job was deleted out from
        // under us; that is permitted (§5 "Cancellation and timeouts") and
        // treated as a no-op rather than an error.
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = $2,
                context = $3,
                steps = $4,
                current_step_id = $5,
                step_retry_counts = $6,
                resume_at = $7,
                error_message = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(&job.id)
        .bind(job.status.as_str())
        .bind(context_json)
        .bind(steps_json)
        .bind(&job.current_step_id)
        .bind(retries_json)
        .bind(job.resume_at)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            tracing::warn!(job_id = %job.id, "save() found no matching row, dropping stale write");
        }
        Ok(())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> karya_core::error::Result<Vec<Job>> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status = 'WAITING' AND resume_at <= $1 ORDER BY id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(row_to_job).collect()
    }

    async fn claim_for_resume(&self, id: &str) -> karya_core::error::Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'RUNNING', updated_at = $2 WHERE id = $1 AND status = 'WAITING'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}
