// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Job Resumer (§4.7): periodically scans the [`crate::store::JobStore`]
//! for jobs in state `WAITING` whose `resume_at` has passed, rehydrates them,
//! and re-enters the Flow Executor at the recorded current step.

use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::executor::FlowExecutor;
use crate::model::{Job, JobStatus, Step};
use crate::store::{ActionStoreRef, JobStoreRef};

/// Summary of one `resume_due_jobs` tick, logged at `info` by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub scanned: usize,
    pub resumed: usize,
    pub failed: usize,
}

/// Runs one resumer pass: selects due jobs, claims each by compare-and-set,
/// and spawns a [`FlowExecutor`] task per claimed job. Bounded to at most
/// `max_jobs_per_tick` jobs so a single tick cannot run unboundedly long.
pub async fn resume_due_jobs(
    job_store: JobStoreRef,
    action_store: ActionStoreRef,
    http_client: reqwest::Client,
    invoker_timeout: Duration,
    max_jobs_per_tick: usize,
) -> Result<TickSummary> {
    let now = Utc::now();
    let due = job_store.find_due(now).await?;

    let mut summary = TickSummary::default();

    for job in due.into_iter().take(max_jobs_per_tick) {
        summary.scanned += 1;

        if exceeded_max_retries(&job) {
            let current = job.context.meta.current_step.clone().unwrap_or_default();
            tracing::warn!(
                job_id = %job.id,
                step_id = %current,
                "resumer defensive max-retries gate triggered"
            );
            if job_store.claim_for_resume(&job.id).await? {
                fail_exhausted(&job_store, job, &current).await?;
                summary.failed += 1;
            }
            continue;
        }

        if !job_store.claim_for_resume(&job.id).await? {
            // Another resumer tick already claimed this job; skip it.
            continue;
        }

        tracing::info!(job_id = %job.id, "resuming job");
        let executor = FlowExecutor::new(
            job,
            job_store.clone(),
            action_store.clone(),
            http_client.clone(),
            invoker_timeout,
        );
        summary.resumed += 1;
        tokio::spawn(async move {
            let job_id = executor.job_id().to_string();
            if let Err(err) = executor.run().await {
                tracing::error!(job_id = %job_id, error = %err, "resumed job run errored");
            }
        });
    }

    tracing::info!(
        scanned = summary.scanned,
        resumed = summary.resumed,
        failed = summary.failed,
        "resumer tick complete"
    );
    Ok(summary)
}

/// Defensive second gate (§4.7 step 3a): if the current step is a `wait`
/// whose retry count has already reached its ceiling, fail the job without
/// re-entering the executor at all. The Wait Controller is the primary
/// enforcement point; this catches a row that was left `WAITING` past its
/// ceiling by some other path (e.g. a crash between bump and persist).
fn exceeded_max_retries(job: &Job) -> bool {
    let Some(current_id) = job.context.meta.current_step.as_deref() else {
        return false;
    };
    let Some(Step::Wait { max_retries, .. }) =
        job.steps.iter().find(|s| s.id() == current_id)
    else {
        return false;
    };
    let count = job
        .context
        .meta
        .step_retries
        .get(current_id)
        .copied()
        .unwrap_or(0);
    count >= *max_retries
}

async fn fail_exhausted(job_store: &JobStoreRef, mut job: Job, step_id: &str) -> Result<()> {
    job.status = JobStatus::Failed;
    job.error_message = Some(format!("Max retries exceeded for step '{step_id}'"));
    job.updated_at = Utc::now();
    job_store.save(&job).await
}

/// Background poll loop, started by the process entry point. Ticks on a
/// fixed interval and stops cleanly when `shutdown` reports `true`.
pub fn spawn_poll_loop(
    job_store: JobStoreRef,
    action_store: ActionStoreRef,
    http_client: reqwest::Client,
    poll_interval: Duration,
    invoker_timeout: Duration,
    max_jobs_per_tick: usize,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = resume_due_jobs(
                        job_store.clone(),
                        action_store.clone(),
                        http_client.clone(),
                        invoker_timeout,
                        max_jobs_per_tick,
                    )
                    .await
                    {
                        tracing::error!(error = %err, "resumer tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("resumer poll loop shutting down");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Context;
    use crate::store::memory::{InMemoryActionStore, InMemoryJobStore};
    use crate::store::JobStore;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::sync::Arc;

    fn waiting_job(id: &str, step_id: &str, retries: u32, max_retries: u32) -> Job {
        let now = Utc::now();
        let mut context = Context::new(id, json!({}));
        context.meta.current_step = Some(step_id.to_string());
        context.meta.step_retries.insert(step_id.to_string(), retries);
        Job {
            id: id.to_string(),
            workflow_name: "wf".into(),
            status: JobStatus::Waiting,
            steps: vec![Step::Wait {
                id: step_id.to_string(),
                duration: "0.01".into(),
                max_retries,
            }],
            context,
            current_step_id: Some(step_id.to_string()),
            step_retry_counts: [(step_id.to_string(), retries)].into_iter().collect(),
            resume_at: Some(now - ChronoDuration::seconds(1)),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn no_due_jobs_is_a_no_op() {
        let job_store: JobStoreRef = Arc::new(InMemoryJobStore::default());
        let action_store: ActionStoreRef = Arc::new(InMemoryActionStore::default());
        let summary = resume_due_jobs(
            job_store,
            action_store,
            reqwest::Client::new(),
            Duration::from_secs(5),
            10,
        )
        .await
        .unwrap();
        assert_eq!(summary, TickSummary::default());
    }

    #[tokio::test]
    async fn due_job_under_ceiling_is_claimed_and_resumed() {
        let job_store: JobStoreRef = Arc::new(InMemoryJobStore::default());
        let action_store: ActionStoreRef = Arc::new(InMemoryActionStore::default());
        let job = waiting_job("job-1", "w", 1, 3);
        job_store.insert(job).await.unwrap();

        let summary = resume_due_jobs(
            job_store.clone(),
            action_store,
            reqwest::Client::new(),
            Duration::from_secs(5),
            10,
        )
        .await
        .unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.resumed, 1);
        assert_eq!(summary.failed, 0);

        // claim_for_resume already flipped status away from WAITING.
        let claimed = job_store.get("job-1").await.unwrap().unwrap();
        assert_ne!(claimed.status, JobStatus::Waiting);
    }

    #[tokio::test]
    async fn due_job_at_ceiling_is_failed_defensively_without_resuming() {
        let job_store: JobStoreRef = Arc::new(InMemoryJobStore::default());
        let action_store: ActionStoreRef = Arc::new(InMemoryActionStore::default());
        let job = waiting_job("job-1", "w", 1, 1);
        job_store.insert(job).await.unwrap();

        let summary = resume_due_jobs(
            job_store.clone(),
            action_store,
            reqwest::Client::new(),
            Duration::from_secs(5),
            10,
        )
        .await
        .unwrap();
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.resumed, 0);
        assert_eq!(summary.failed, 1);

        let failed = job_store.get("job-1").await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(
            failed.error_message.as_deref(),
            Some("Max retries exceeded for step 'w'")
        );
    }
}
