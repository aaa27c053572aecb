// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two trait boundaries the core consumes: [`JobStore`] and [`ActionStore`].
//!
//! The core never talks to a database directly. A concrete implementation
//! (backed by Postgres, or — for tests — an in-memory map) lives outside this
//! crate and is injected as `Arc<dyn JobStore>` / `Arc<dyn ActionStore>`.

use crate::error::{ExecutorError, Result};
use crate::model::{Action, Job};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Read/write access to job rows, keyed by id.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Job>>;

    async fn list(&self) -> Result<Vec<Job>>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Persists the full row. Implementations must write `context` whole
    /// (never field-merged) per §5's read-modify-write policy.
    async fn save(&self, job: &Job) -> Result<()>;

    /// Jobs with `status = WAITING AND resume_at <= now`, in a stable
    /// selection order (§4.7 step 2).
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Job>>;

    /// Claims a job for resumption by compare-and-set on `status`: succeeds
    /// only if the row is still `WAITING` at the time of the write. Returns
    /// `false` if another runner already claimed it (§4.7, §5 "single-writer
    /// per job").
    async fn claim_for_resume(&self, id: &str) -> Result<bool>;
}

/// Read/write access to named action definitions.
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn create(&self, action: Action) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Option<Action>>;

    async fn list(&self) -> Result<Vec<Action>>;

    async fn update(&self, name: &str, action_type: String, config: serde_json::Value) -> Result<bool>;

    async fn delete(&self, name: &str) -> Result<bool>;
}

pub type JobStoreRef = Arc<dyn JobStore>;
pub type ActionStoreRef = Arc<dyn ActionStore>;

/// Loads a named action, failing closed with [`ExecutorError::ActionNotFound`]
/// when absent. The only component that reads the `ActionStore` during
/// execution (§4.2).
pub async fn load_action(store: &dyn ActionStore, name: &str) -> Result<Action> {
    store
        .get(name)
        .await?
        .ok_or_else(|| ExecutorError::ActionNotFound(name.to_string()))
}

#[cfg(any(test, feature = "test-support"))]
pub mod memory {
    //! An in-memory `JobStore`/`ActionStore` pair used by the executor's own
    //! unit tests, so they don't need a database (§12 test tooling).

    use super::*;
    use dashmap::DashMap;

    #[derive(Default)]
    pub struct InMemoryJobStore {
        jobs: DashMap<String, Job>,
    }

    #[async_trait]
    impl JobStore for InMemoryJobStore {
        async fn insert(&self, job: Job) -> Result<()> {
            self.jobs.insert(job.id.clone(), job);
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<Job>> {
            Ok(self.jobs.get(id).map(|r| r.clone()))
        }

        async fn list(&self) -> Result<Vec<Job>> {
            Ok(self.jobs.iter().map(|r| r.value().clone()).collect())
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            Ok(self.jobs.remove(id).is_some())
        }

        async fn save(&self, job: &Job) -> Result<()> {
            self.jobs.insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
            let mut due: Vec<Job> = self
                .jobs
                .iter()
                .filter(|r| {
                    r.value().status == crate::model::JobStatus::Waiting
                        && r.value().resume_at.map(|t| t <= now).unwrap_or(false)
                })
                .map(|r| r.value().clone())
                .collect();
            due.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(due)
        }

        async fn claim_for_resume(&self, id: &str) -> Result<bool> {
            match self.jobs.get_mut(id) {
                Some(mut entry) if entry.status == crate::model::JobStatus::Waiting => {
                    entry.status = crate::model::JobStatus::Running;
                    entry.updated_at = Utc::now();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    #[derive(Default)]
    pub struct InMemoryActionStore {
        actions: DashMap<String, Action>,
    }

    #[async_trait]
    impl ActionStore for InMemoryActionStore {
        async fn create(&self, action: Action) -> Result<()> {
            self.actions.insert(action.name.clone(), action);
            Ok(())
        }

        async fn get(&self, name: &str) -> Result<Option<Action>> {
            Ok(self.actions.get(name).map(|r| r.clone()))
        }

        async fn list(&self) -> Result<Vec<Action>> {
            Ok(self.actions.iter().map(|r| r.value().clone()).collect())
        }

        async fn update(
            &self,
            name: &str,
            action_type: String,
            config: serde_json::Value,
        ) -> Result<bool> {
            match self.actions.get_mut(name) {
                Some(mut entry) => {
                    entry.action_type = action_type;
                    entry.config = config;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, name: &str) -> Result<bool> {
            Ok(self.actions.remove(name).is_some())
        }
    }
}
