// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Template Renderer (§4.1).
//!
//! Templates are evaluated against the job's full [`Context`](crate::model::Context)
//! binding — `context.*`, `meta.*`, `output.*` — using [`tera`], which gives us
//! dotted attribute access, comparison/boolean operators, and literals for
//! free, matching the source's Jinja2-style expressions.

use crate::error::{ExecutorError, Result};
use crate::model::Context;
use serde_json::Value;

/// Renders `template` as plain text substitution against `ctx`.
///
/// Propagates [`ExecutorError::TemplateError`] on any syntax or binding
/// failure; callers rendering a URL/header/body/duration should let this
/// failure become a step failure (§4.1).
pub fn render_string(template: &str, ctx: &Context) -> Result<String> {
    let value = ctx.as_binding_value();
    let tera_ctx = tera::Context::from_value(value)
        .map_err(|e| ExecutorError::TemplateError(e.to_string()))?;
    tera::Tera::one_off(template, &tera_ctx, false).map_err(Into::into)
}

/// Evaluates `expr` as a boolean expression against `ctx`.
///
/// This is syntactic sugar over [`render_string`]: `expr` is wrapped in an
/// `{% if %}` block and the rendered output is compared against `"true"`.
/// Any syntactic or binding failure surfaces as [`ExecutorError::TemplateError`];
/// the Choice Evaluator (§4.4) treats that as "did not match" rather than
/// propagating it — this function does not make that decision itself.
pub fn eval_predicate(expr: &str, ctx: &Context) -> Result<bool> {
    let wrapped = format!("{{% if {expr} %}}true{{% else %}}false{{% endif %}}");
    let rendered = render_string(&wrapped, ctx)?;
    Ok(rendered.trim() == "true")
}

/// Renders each value of a `string -> template` map, returning the rendered
/// map. Used for HTTP headers (§4.3 step 3).
pub fn render_map(
    templates: &std::collections::HashMap<String, String>,
    ctx: &Context,
) -> Result<std::collections::HashMap<String, String>> {
    templates
        .iter()
        .map(|(k, v)| render_string(v, ctx).map(|rendered| (k.clone(), rendered)))
        .collect()
}

/// Renders each value of a body template map, then parses each rendered
/// string as JSON (§4.3 step 2).
pub fn render_body(
    templates: &std::collections::HashMap<String, String>,
    ctx: &Context,
) -> Result<serde_json::Map<String, Value>> {
    let mut body = serde_json::Map::new();
    for (k, v) in templates {
        let rendered = render_string(v, ctx)?;
        let parsed: Value = serde_json::from_str(&rendered).map_err(|e| {
            ExecutorError::TemplateError(format!("body field '{k}' is not valid JSON: {e}"))
        })?;
        body.insert(k.clone(), parsed);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(parameters: Value) -> Context {
        Context::new("job-1", parameters)
    }

    #[test]
    fn render_string_interpolates_nested_attribute() {
        let ctx = ctx_with(json!({"value": 42}));
        let out = render_string("value is {{ context.value }}", &ctx).unwrap();
        assert_eq!(out, "value is 42");
    }

    #[test]
    fn render_string_fails_closed_on_bad_syntax() {
        let ctx = ctx_with(json!({}));
        let err = render_string("{{ unterminated", &ctx).unwrap_err();
        assert!(matches!(err, ExecutorError::TemplateError(_)));
    }

    #[test]
    fn eval_predicate_true_and_false() {
        let ctx = ctx_with(json!({"value": 1}));
        assert!(eval_predicate("context.value == 1", &ctx).unwrap());
        assert!(!eval_predicate("context.value == 2", &ctx).unwrap());
    }

    #[test]
    fn eval_predicate_on_unset_key_is_a_template_error_not_a_panic() {
        let ctx = ctx_with(json!({}));
        let result = eval_predicate("context.missing.deeper == 1", &ctx);
        assert!(result.is_err());
    }

    #[test]
    fn render_body_parses_rendered_values_as_json() {
        let ctx = ctx_with(json!({"count": 3}));
        let mut templates = std::collections::HashMap::new();
        templates.insert("n".to_string(), "{{ context.count }}".to_string());
        let body = render_body(&templates, &ctx).unwrap();
        assert_eq!(body.get("n"), Some(&json!(3)));
    }
}
