// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Flow Executor (§4.6): the per-job driver that sequences steps,
//! dispatches by step type, persists the context after each step, and
//! reports terminal status.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;

use crate::choice;
use crate::error::{ExecutorError, Result};
use crate::http_invoker;
use crate::model::{HttpActionConfig, Job, JobStatus, Step};
use crate::store::{self, ActionStoreRef, JobStoreRef};
use crate::template;
use crate::wait;

/// Terminal (or pausing) outcome of a single [`FlowExecutor::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Waiting,
    Failed,
}

/// What a single step dispatch produced, before the executor decides how to
/// advance (§4.6 `execute_steps`).
enum StepOutcome {
    Advance,
    Jump(String),
    Paused,
}

/// Per-job driver. One instance is constructed per execution attempt — a
/// fresh submission or a single resumption — and consumed by [`Self::run`].
pub struct FlowExecutor {
    job: Job,
    job_store: JobStoreRef,
    action_store: ActionStoreRef,
    http_client: reqwest::Client,
    invoker_timeout: Duration,
}

impl FlowExecutor {
    /// Builds an executor around an already-persisted [`Job`] row. Used both
    /// for a fresh submission (the row is in `SCHEDULED`, freshly inserted by
    /// the ingress surface) and for a resumption (the row carries its full
    /// prior `context`, including `output` and `meta.current_step` — the
    /// executor re-enters at the recorded step rather than discarding that
    /// state, see DESIGN.md).
    pub fn new(
        job: Job,
        job_store: JobStoreRef,
        action_store: ActionStoreRef,
        http_client: reqwest::Client,
        invoker_timeout: Duration,
    ) -> Self {
        Self {
            job,
            job_store,
            action_store,
            http_client,
            invoker_timeout,
        }
    }

    /// The job id this executor drives, for logging by callers before `run`
    /// consumes `self`.
    pub fn job_id(&self) -> &str {
        &self.job.id
    }

    /// Transitions the job to `RUNNING`, walks the step list to completion,
    /// pause, or failure, and returns the terminal outcome. Every transition
    /// along the way is committed to the [`crate::store::JobStore`] before
    /// this function returns.
    pub async fn run(mut self) -> Result<RunOutcome> {
        tracing::info!(job_id = %self.job.id, "job execution starting");
        self.update_job_status(JobStatus::Running, None).await?;

        match self.execute_steps().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!(job_id = %self.job.id, error = %err, "job failed");
                self.update_job_status(JobStatus::Failed, Some(err.to_string()))
                    .await?;
                Ok(RunOutcome::Failed)
            }
        }
    }

    async fn execute_steps(&mut self) -> Result<RunOutcome> {
        let index_map: HashMap<&str, usize> = self
            .job
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id(), i))
            .collect();

        let mut idx = self
            .job
            .context
            .meta
            .current_step
            .as_deref()
            .and_then(|id| index_map.get(id).copied())
            .unwrap_or(0);

        tracing::info!(
            job_id = %self.job.id,
            resuming = self.job.context.meta.current_step.is_some(),
            start_index = idx,
            "beginning step walk"
        );

        loop {
            if idx >= self.job.steps.len() {
                self.update_job_status(JobStatus::Completed, None).await?;
                tracing::info!(job_id = %self.job.id, "job completed");
                return Ok(RunOutcome::Completed);
            }

            let step = self.job.steps[idx].clone();
            match self.run_step(&step).await? {
                StepOutcome::Paused => {
                    tracing::info!(job_id = %self.job.id, step_id = step.id(), "job paused");
                    return Ok(RunOutcome::Waiting);
                }
                StepOutcome::Jump(next_id) => match index_map.get(next_id.as_str()) {
                    Some(&pos) => idx = pos,
                    None => {
                        let err = ExecutorError::InvalidNextStep(next_id);
                        self.update_job_status(JobStatus::Failed, Some(err.to_string()))
                            .await?;
                        tracing::error!(job_id = %self.job.id, error = %err, "job failed");
                        return Ok(RunOutcome::Failed);
                    }
                },
                StepOutcome::Advance => idx += 1,
            }
        }
    }

    async fn run_step(&mut self, step: &Step) -> Result<StepOutcome> {
        let now = Utc::now();
        self.job.context.meta.current_step = Some(step.id().to_string());
        self.job.context.meta.current_time = Some(now);
        self.job.current_step_id = Some(step.id().to_string());

        tracing::info!(
            job_id = %self.job.id,
            step_id = step.id(),
            step_type = step.type_name(),
            "dispatching step"
        );

        match step {
            Step::Task { action, .. } => {
                let resolved = store::load_action(self.action_store.as_ref(), action).await?;
                match resolved.action_type.as_str() {
                    "http" => {
                        let config: HttpActionConfig =
                            serde_json::from_value(resolved.config.clone())?;
                        http_invoker::invoke(
                            &self.http_client,
                            &config,
                            &mut self.job.context,
                            self.invoker_timeout,
                        )
                        .await?;
                    }
                    other => {
                        return Err(ExecutorError::UnsupportedActionType(other.to_string()))
                    }
                }
                self.persist_context().await?;
                Ok(StepOutcome::Advance)
            }
            Step::Wait {
                id,
                duration,
                max_retries,
            } => {
                wait::enter(id, duration, *max_retries, &mut self.job)?;
                self.persist_context().await?;
                Ok(StepOutcome::Paused)
            }
            Step::Choice { id, conditions } => {
                let next = choice::evaluate(id, conditions, &self.job.context)?;
                self.persist_context().await?;
                Ok(StepOutcome::Jump(next))
            }
        }
    }

    /// The durability checkpoint (§4.6 `persist_context`): writes the
    /// current `context`, `current_step_id`, and `step_retry_counts` back to
    /// the job row and commits.
    async fn persist_context(&mut self) -> Result<()> {
        self.job.current_step_id = self.job.context.meta.current_step.clone();
        self.job.step_retry_counts = self.job.context.meta.step_retries.clone();
        self.job.updated_at = Utc::now();
        self.job_store.save(&self.job).await?;
        tracing::info!(
            job_id = %self.job.id,
            step_id = ?self.job.current_step_id,
            "context persisted"
        );
        Ok(())
    }

    /// Writes status, context, current step, `updated_at`, and an optional
    /// `error_message`, then commits. Called at START, PAUSE, explicit FAIL,
    /// and COMPLETED (§4.6 `update_job_status`).
    async fn update_job_status(&mut self, status: JobStatus, error: Option<String>) -> Result<()> {
        let from = self.job.status;
        self.job.status = status;
        self.job.current_step_id = self.job.context.meta.current_step.clone();
        self.job.step_retry_counts = self.job.context.meta.step_retries.clone();
        self.job.updated_at = Utc::now();
        if let Some(message) = error {
            self.job.error_message = Some(message);
        }
        self.job_store.save(&self.job).await?;
        tracing::info!(job_id = %self.job.id, from = %from, to = %status, "job status transition");
        Ok(())
    }
}
