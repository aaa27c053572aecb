// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection pool wrapper around [`sqlx::PgPool`] (§9 "Pooled connection per
//! commit" — the executor checks out a connection per commit rather than
//! holding a session for its lifetime; this pool is what it checks out from).

use std::time::Duration;

use karya_core::error::ExecutorError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connection pool sizing and timeouts, sourced from `DatabaseConfig`
/// (§10) at process start.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

/// A connection-pooled handle to the jobs/actions database.
#[derive(Debug, Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    pub async fn connect(config: &PoolConfig) -> Result<Self, ExecutorError> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "initializing database connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| ExecutorError::StoreError(format!("pool connect failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Wraps an already-constructed pool, for tests and for callers that
    /// manage pool lifecycle themselves.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Liveness probe used by the ingress `/healthz` endpoint (§6).
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
