// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! Structural checks for the `validate` subcommand (§12): the same checks
//! the Flow Executor would otherwise discover lazily while running, run
//! eagerly against a submission document before it ever reaches the store.

use std::collections::HashSet;

use karya_core::model::{ChoiceCondition, JobRequest, Step};

/// One structural defect found in a workflow document, with enough context
/// to locate it without re-parsing the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks a submission document the way the Flow Executor would discover
/// the same defects lazily: every `choice.next`/`default` resolves to a
/// known step id, every `task.action` is non-empty, every `wait.duration`
/// is non-empty.
pub fn validate_workflow(request: &JobRequest) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let known_ids: HashSet<&str> = request.steps.iter().map(|s| s.id()).collect();

    if request.steps.is_empty() {
        errors.push(ValidationError("workflow has no steps".to_string()));
    }

    for step in &request.steps {
        match step {
            Step::Task { id, action } => {
                if action.trim().is_empty() {
                    errors.push(ValidationError(format!(
                        "task step '{id}' has an empty action name"
                    )));
                }
            }
            Step::Wait { id, duration, .. } => {
                if duration.trim().is_empty() {
                    errors.push(ValidationError(format!(
                        "wait step '{id}' has an empty duration"
                    )));
                }
            }
            Step::Choice { id, conditions } => {
                if conditions.is_empty() {
                    errors.push(ValidationError(format!(
                        "choice step '{id}' has no conditions"
                    )));
                }
                for condition in conditions {
                    let next = match condition {
                        ChoiceCondition::If { next, .. } => next,
                        ChoiceCondition::Default { default } => default,
                    };
                    if !known_ids.contains(next.as_str()) {
                        errors.push(ValidationError(format!(
                            "choice step '{id}' references unknown step id '{next}'"
                        )));
                    }
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(steps: Vec<Step>) -> JobRequest {
        JobRequest {
            workflow_name: "wf".into(),
            parameters: json!({}),
            steps,
        }
    }

    #[test]
    fn valid_workflow_has_no_errors() {
        let req = request(vec![Step::Task {
            id: "s1".into(),
            action: "A1".into(),
        }]);
        assert!(validate_workflow(&req).is_empty());
    }

    #[test]
    fn empty_steps_is_an_error() {
        let req = request(vec![]);
        assert_eq!(validate_workflow(&req).len(), 1);
    }

    #[test]
    fn choice_referencing_unknown_step_is_an_error() {
        let req = request(vec![Step::Choice {
            id: "s2".into(),
            conditions: vec![ChoiceCondition::Default {
                default: "missing".into(),
            }],
        }]);
        let errors = validate_workflow(&req);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].0.contains("missing"));
    }

    #[test]
    fn empty_action_name_is_an_error() {
        let req = request(vec![Step::Task {
            id: "s1".into(),
            action: "  ".into(),
        }]);
        assert_eq!(validate_workflow(&req).len(), 1);
    }

    #[test]
    fn empty_wait_duration_is_an_error() {
        let req = request(vec![Step::Wait {
            id: "w".into(),
            duration: "".into(),
            max_retries: 3,
        }]);
        assert_eq!(validate_workflow(&req).len(), 1);
    }
}
