// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema bootstrap (§6 "Persisted state layout"). `CREATE TABLE IF NOT
//! EXISTS` migrations run once at process start, in the style this
//! workspace's other storage backends use for their own bootstrap (see e.g.
//! `llm-orchestrator-audit`'s `DatabaseAuditStorage::migrate`).

use karya_core::error::ExecutorError;
use sqlx::PgPool;

/// Creates the `jobs` and `actions` tables (and their indexes) if they do
/// not already exist. Safe to call on every process start.
pub async fn bootstrap_schema(pool: &PgPool) -> Result<(), ExecutorError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            workflow_name TEXT NOT NULL,
            status TEXT NOT NULL,
            context JSONB NOT NULL,
            steps JSONB NOT NULL,
            current_step_id TEXT,
            step_retry_counts JSONB NOT NULL DEFAULT '{}'::jsonb,
            resume_at TIMESTAMPTZ,
            error_message TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(store_err)?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_due ON jobs (status, resume_at)",
    )
    .execute(pool)
    .await
    .map_err(store_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS actions (
            name TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            config JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(store_err)?;

    Ok(())
}

fn store_err(err: sqlx::Error) -> ExecutorError {
    ExecutorError::StoreError(err.to_string())
}
