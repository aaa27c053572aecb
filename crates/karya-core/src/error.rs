// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain error types shared by every executor component.

use thiserror::Error;

/// Everything that can make a step, and therefore the job that owns it, fail.
///
/// New variants may be added without a major version bump; match on `_` rather
/// than exhaustively.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Action '{0}' not found")]
    ActionNotFound(String),

    #[error("Unsupported step type: {0}")]
    UnsupportedStepType(String),

    #[error("Unsupported action type: {0}")]
    UnsupportedActionType(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("{0}")]
    InvalidDuration(String),

    #[error("Max retries exceeded for step '{0}'")]
    MaxRetriesExceeded(String),

    #[error("No matching choice condition and no default for step '{0}'")]
    ChoiceUnresolved(String),

    #[error("Invalid next step ID: {0}")]
    InvalidNextStep(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

impl From<reqwest::Error> for ExecutorError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}

impl From<tera::Error> for ExecutorError {
    fn from(err: tera::Error) -> Self {
        Self::TemplateError(err.to_string())
    }
}

impl From<serde_json::Error> for ExecutorError {
    fn from(err: serde_json::Error) -> Self {
        Self::TemplateError(err.to_string())
    }
}
