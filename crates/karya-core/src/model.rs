// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The job/step/action data model.
//!
//! `context` is deliberately kept as an open `serde_json::Value` tree rather
//! than a typed struct: workflow authors control its shape, and the engine
//! only ever needs attribute access and JSON round-tripping over it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Scheduled,
    Running,
    Waiting,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(Self::Scheduled),
            "RUNNING" => Ok(Self::Running),
            "WAITING" => Ok(Self::Waiting),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node in a job's step list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    Task {
        id: String,
        action: String,
    },
    Wait {
        id: String,
        duration: String,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },
    Choice {
        id: String,
        conditions: Vec<ChoiceCondition>,
    },
}

fn default_max_retries() -> u32 {
    5
}

impl Step {
    pub fn id(&self) -> &str {
        match self {
            Self::Task { id, .. } | Self::Wait { id, .. } | Self::Choice { id, .. } => id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Task { .. } => "task",
            Self::Wait { .. } => "wait",
            Self::Choice { .. } => "choice",
        }
    }
}

/// One guarded branch inside a `choice` step's `conditions` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceCondition {
    If {
        #[serde(rename = "if")]
        predicate: String,
        next: String,
    },
    Default {
        default: String,
    },
}

/// A named, reusable side-effect definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub config: Value,
}

/// Parsed `config` for an action whose `type` is `"http"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpActionConfig {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Absent means "send the whole context as the body" (see §4.3).
    #[serde(default)]
    pub body: Option<HashMap<String, String>>,
    pub save_as: Option<String>,
}

/// Engine-managed bookkeeping nested under `context.meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMeta {
    pub job_id: String,
    pub start_time: DateTime<Utc>,
    pub current_step: Option<String>,
    pub current_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step_retries: HashMap<String, u32>,
}

/// The job's live, persisted variable store.
///
/// Reserved top-level keys are `context` (user parameters), `meta` (engine
/// bookkeeping, see [`ContextMeta`]), and a lazily-created `output` map keyed
/// by each HTTP action's `save_as`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub context: Value,
    pub meta: ContextMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
}

impl Context {
    pub fn new(job_id: impl Into<String>, parameters: Value) -> Self {
        Self {
            context: parameters,
            meta: ContextMeta {
                job_id: job_id.into(),
                start_time: Utc::now(),
                current_step: None,
                current_time: None,
                step_retries: HashMap::new(),
            },
            output: None,
        }
    }

    /// Writes a captured HTTP response under `output[save_as]`, creating
    /// `output` on first use (§4.3 step 5).
    pub fn save_output(&mut self, save_as: &str, value: Value) {
        self.output
            .get_or_insert_with(Map::new)
            .insert(save_as.to_string(), value);
    }

    /// The full binding environment template expressions are evaluated
    /// against: `context.*`, `meta.*`, `output.*`.
    pub fn as_binding_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Persistent unit of execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub workflow_name: String,
    pub status: JobStatus,
    pub steps: Vec<Step>,
    pub context: Context,
    pub current_step_id: Option<String>,
    pub step_retry_counts: HashMap<String, u32>,
    pub resume_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /jobs` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub workflow_name: String,
    pub parameters: Value,
    pub steps: Vec<Step>,
}

/// `{job_id, status, context}` response shape used across the ingress surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: String,
    pub context: Option<Context>,
}

impl From<&Job> for JobStatusView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status.as_str().to_string(),
            context: Some(job.context.clone()),
        }
    }
}

/// `POST /actions` / `GET /actions/{name}` wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub config: Value,
}

/// `PUT /actions/{name}` wire shape — deliberately lacks `name` (§9 "Duplicated
/// PUT handler": this is the single contract, not the source's second,
/// shadowing handler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionUpdateSchema {
    #[serde(rename = "type")]
    pub action_type: String,
    pub config: Value,
}
