// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Wait Controller (§4.5): the durable sleep/retry state machine.
//!
//! A wait step never blocks a task. It mutates the job in place — bumping
//! the step's retry counter, and, if the retry ceiling isn't exceeded,
//! computing `resume_at` and marking the job `WAITING` — and hands control
//! back to the Flow Executor, which persists the mutated row exactly once
//! (the same commit point used after every other step kind).

use crate::error::{ExecutorError, Result};
use crate::model::{Job, JobStatus};
use crate::template;
use chrono::{Duration as ChronoDuration, Utc};

/// Runs one entry into wait step `step_id`, mutating `job` in place.
///
/// Every entry — including the first — counts as a retry (§4.5 "subtle
/// semantic"). On success the job is left in `WAITING` with a future
/// `resume_at`; the caller is expected to persist it. On ceiling
/// exceedance, an [`ExecutorError::MaxRetriesExceeded`] is returned and the
/// job is *not* marked waiting — the caller's generic failure path persists
/// `FAILED` along with the already-bumped retry count.
pub fn enter(step_id: &str, duration_template: &str, max_retries: u32, job: &mut Job) -> Result<()> {
    let counter = job
        .context
        .meta
        .step_retries
        .entry(step_id.to_string())
        .or_insert(0);
    *counter += 1;
    let count = *counter;
    job.step_retry_counts
        .insert(step_id.to_string(), count);

    if count > max_retries {
        return Err(ExecutorError::MaxRetriesExceeded(step_id.to_string()));
    }

    let rendered = template::render_string(duration_template, &job.context)?;
    let trimmed = rendered.trim();
    if trimmed.is_empty() {
        return Err(ExecutorError::InvalidDuration(format!(
            "Invalid wait duration for step '{step_id}': empty"
        )));
    }
    let seconds: f64 = trimmed.parse().map_err(|_| {
        ExecutorError::InvalidDuration(format!(
            "Wait duration not a number for step '{step_id}': '{trimmed}'"
        ))
    })?;

    let now = Utc::now();
    let resume_at = now
        + ChronoDuration::milliseconds((seconds * 1000.0).round() as i64);

    job.status = JobStatus::Waiting;
    job.resume_at = Some(resume_at);
    job.current_step_id = Some(step_id.to_string());
    job.context.meta.current_step = Some(step_id.to_string());
    job.context.meta.current_time = Some(now);
    job.updated_at = now;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Context;
    use serde_json::json;

    fn job_stub() -> Job {
        Job {
            id: "job-1".into(),
            workflow_name: "wf".into(),
            status: JobStatus::Running,
            steps: vec![],
            context: Context::new("job-1", json!({})),
            current_step_id: None,
            step_retry_counts: Default::default(),
            resume_at: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn first_entry_counts_as_retry_one_and_pauses() {
        let mut job = job_stub();
        enter("w", "0.2", 3, &mut job).unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
        assert_eq!(job.context.meta.step_retries.get("w"), Some(&1));
        assert!(job.resume_at.unwrap() > Utc::now());
    }

    #[test]
    fn zero_max_retries_fails_on_first_entry() {
        let mut job = job_stub();
        let err = enter("w", "0.2", 0, &mut job).unwrap_err();
        assert!(matches!(err, ExecutorError::MaxRetriesExceeded(id) if id == "w"));
        assert_eq!(job.context.meta.step_retries.get("w"), Some(&1));
    }

    #[test]
    fn exceeding_ceiling_after_repeated_entries_fails() {
        let mut job = job_stub();
        enter("w", "0.01", 1, &mut job).unwrap();
        let err = enter("w", "0.01", 1, &mut job).unwrap_err();
        assert!(matches!(err, ExecutorError::MaxRetriesExceeded(_)));
        assert_eq!(job.context.meta.step_retries.get("w"), Some(&2));
    }

    #[test]
    fn empty_duration_is_invalid() {
        let mut job = job_stub();
        let err = enter("w", "   ", 5, &mut job).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidDuration(_)));
    }

    #[test]
    fn non_numeric_duration_is_invalid() {
        let mut job = job_stub();
        let err = enter("w", "soon", 5, &mut job).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidDuration(_)));
    }
}
