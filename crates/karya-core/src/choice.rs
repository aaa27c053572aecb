// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Choice Evaluator (§4.4).

use crate::error::{ExecutorError, Result};
use crate::model::{ChoiceCondition, Context};
use crate::template;

/// Walks `conditions` left to right. The first `{if, next}` entry whose
/// predicate renders truthy wins; a `TemplateError` on a single predicate is
/// logged and treated as "did not match" rather than failing the step. If no
/// `if` matched, the first `{default}` entry wins. Fails with
/// [`ExecutorError::ChoiceUnresolved`] if neither exists.
pub fn evaluate(step_id: &str, conditions: &[ChoiceCondition], ctx: &Context) -> Result<String> {
    for condition in conditions {
        if let ChoiceCondition::If { predicate, next } = condition {
            match template::eval_predicate(predicate, ctx) {
                Ok(true) => return Ok(next.clone()),
                Ok(false) => continue,
                Err(ExecutorError::TemplateError(msg)) => {
                    tracing::warn!(step_id, predicate, error = %msg, "predicate evaluation failed, treating as non-match");
                    continue;
                }
                Err(other) => return Err(other),
            }
        }
    }

    conditions
        .iter()
        .find_map(|c| match c {
            ChoiceCondition::Default { default } => Some(default.clone()),
            ChoiceCondition::If { .. } => None,
        })
        .ok_or_else(|| ExecutorError::ChoiceUnresolved(step_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(parameters: serde_json::Value) -> Context {
        Context::new("job-1", parameters)
    }

    #[test]
    fn first_matching_if_wins() {
        let ctx = ctx_with(json!({"value": 1}));
        let conditions = vec![
            ChoiceCondition::If {
                predicate: "context.value == 1".into(),
                next: "end".into(),
            },
            ChoiceCondition::Default {
                default: "s1".into(),
            },
        ];
        assert_eq!(evaluate("s2", &conditions, &ctx).unwrap(), "end");
    }

    #[test]
    fn falls_back_to_default_when_nothing_matches() {
        let ctx = ctx_with(json!({"value": 2}));
        let conditions = vec![
            ChoiceCondition::If {
                predicate: "context.value == 1".into(),
                next: "end".into(),
            },
            ChoiceCondition::Default {
                default: "s1".into(),
            },
        ];
        assert_eq!(evaluate("s2", &conditions, &ctx).unwrap(), "s1");
    }

    #[test]
    fn empty_conditions_is_unresolved() {
        let ctx = ctx_with(json!({}));
        let err = evaluate("s2", &[], &ctx).unwrap_err();
        assert!(matches!(err, ExecutorError::ChoiceUnresolved(id) if id == "s2"));
    }

    #[test]
    fn template_error_on_one_predicate_does_not_abort_the_scan() {
        let ctx = ctx_with(json!({}));
        let conditions = vec![
            ChoiceCondition::If {
                predicate: "context.missing.deeper == 1".into(),
                next: "end".into(),
            },
            ChoiceCondition::Default {
                default: "s1".into(),
            },
        ];
        assert_eq!(evaluate("s2", &conditions, &ctx).unwrap(), "s1");
    }

    #[test]
    fn no_match_and_no_default_is_unresolved() {
        let ctx = ctx_with(json!({"value": 9}));
        let conditions = vec![ChoiceCondition::If {
            predicate: "context.value == 1".into(),
            next: "end".into(),
        }];
        let err = evaluate("s2", &conditions, &ctx).unwrap_err();
        assert!(matches!(err, ExecutorError::ChoiceUnresolved(_)));
    }
}
