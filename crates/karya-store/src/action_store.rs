// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A PostgreSQL-backed [`karya_core::ActionStore`].

use async_trait::async_trait;
use karya_core::error::ExecutorError;
use karya_core::model::Action;
use karya_core::store::ActionStore;
use sqlx::{PgPool, Row};

use crate::DbPool;

pub struct PgActionStore {
    pool: PgPool,
}

impl PgActionStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

fn store_err(err: sqlx::Error) -> ExecutorError {
    ExecutorError::StoreError(err.to_string())
}

/// Postgres' unique-violation SQLSTATE. Used to turn a duplicate `create`
/// into a distinguishable error the ingress layer maps to 409 (§6).
const UNIQUE_VIOLATION: &str = "23505";

fn row_to_action(row: sqlx::postgres::PgRow) -> Result<Action, ExecutorError> {
    let config: serde_json::Value = row.try_get("config").map_err(store_err)?;
    Ok(Action {
        name: row.try_get("name").map_err(store_err)?,
        action_type: row.try_get("type").map_err(store_err)?,
        config,
    })
}

#[async_trait]
impl ActionStore for PgActionStore {
    async fn create(&self, action: Action) -> karya_core::error::Result<()> {
        let result = sqlx::query("INSERT INTO actions (name, type, config) VALUES ($1, $2, $3)")
            .bind(&action.name)
            .bind(&action.action_type)
            .bind(&action.config)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(ExecutorError::StoreError(format!(
                    "action '{}' already exists",
                    action.name
                )))
            }
            Err(e) => Err(store_err(e)),
        }
    }

    async fn get(&self, name: &str) -> karya_core::error::Result<Option<Action>> {
        let row = sqlx::query("SELECT * FROM actions WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(row_to_action).transpose()
    }

    async fn list(&self) -> karya_core::error::Result<Vec<Action>> {
        let rows = sqlx::query("SELECT * FROM actions ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(row_to_action).collect()
    }

    async fn update(
        &self,
        name: &str,
        action_type: String,
        config: serde_json::Value,
    ) -> karya_core::error::Result<bool> {
        let result = sqlx::query("UPDATE actions SET type = $2, config = $3 WHERE name = $1")
            .bind(name)
            .bind(action_type)
            .bind(config)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, name: &str) -> karya_core::error::Result<bool> {
        let result = sqlx::query("DELETE FROM actions WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}
