// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The HTTP Invoker (§4.3).

use crate::error::{ExecutorError, Result};
use crate::model::{Context, HttpActionConfig};
use crate::template;
use std::time::Duration;

/// Marker returned on success, mirroring the source's `"http_completed"`
/// sentinel (§4.3 step 6).
pub const HTTP_COMPLETED: &str = "http_completed";

/// Issues the HTTP request described by `config`, rendering its templates
/// against `ctx`, and writes the decoded JSON response into
/// `ctx.output[save_as]` when `save_as` is present.
///
/// Returns [`HTTP_COMPLETED`] on success. Network faults, non-JSON responses,
/// and bad body-template JSON all surface as a step failure (§4.3 "Failure
/// modes"); a non-2xx status is not one of them — the response is decoded
/// and saved like any other, so a workflow's `choice` step can branch on an
/// error body captured in `output`.
pub async fn invoke(
    client: &reqwest::Client,
    config: &HttpActionConfig,
    ctx: &mut Context,
    timeout: Duration,
) -> Result<&'static str> {
    let url = template::render_string(&config.url, ctx)?;

    let method = reqwest::Method::from_bytes(config.method.to_uppercase().as_bytes())
        .map_err(|e| ExecutorError::TemplateError(format!("invalid HTTP method: {e}")))?;

    let headers = template::render_map(&config.headers, ctx)?;

    let mut request = client.request(method, &url).timeout(timeout);
    for (name, value) in &headers {
        request = request.header(name, value);
    }

    request = match &config.body {
        Some(body_templates) => {
            let body = template::render_body(body_templates, ctx)?;
            request.json(&serde_json::Value::Object(body))
        }
        None => request.json(&ctx.as_binding_value()),
    };

    let response = request.send().await?;
    let decoded: serde_json::Value = response.json().await?;

    if let Some(save_as) = &config.save_as {
        ctx.save_output(save_as, decoded);
    }

    Ok(HTTP_COMPLETED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn saves_decoded_response_under_save_as() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let config = HttpActionConfig {
            method: "POST".into(),
            url: format!("{}/hook", server.url()),
            headers: HashMap::new(),
            body: Some(HashMap::new()),
            save_as: Some("r".into()),
        };

        let mut ctx = Context::new("job-1", json!({}));
        let client = reqwest::Client::new();
        let result = invoke(&client, &config, &mut ctx, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result, HTTP_COMPLETED);
        assert_eq!(
            ctx.output.as_ref().and_then(|o| o.get("r")),
            Some(&json!({"ok": true}))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_save_as_discards_the_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/hook")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let config = HttpActionConfig {
            method: "GET".into(),
            url: format!("{}/hook", server.url()),
            headers: HashMap::new(),
            body: None,
            save_as: None,
        };

        let mut ctx = Context::new("job-1", json!({}));
        let client = reqwest::Client::new();
        invoke(&client, &config, &mut ctx, Duration::from_secs(5))
            .await
            .unwrap();

        assert!(ctx.output.is_none());
    }

    #[tokio::test]
    async fn non_2xx_status_is_decoded_and_saved_not_failed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "boom"}"#)
            .create_async()
            .await;

        let config = HttpActionConfig {
            method: "POST".into(),
            url: format!("{}/hook", server.url()),
            headers: HashMap::new(),
            body: Some(HashMap::new()),
            save_as: Some("r".into()),
        };

        let mut ctx = Context::new("job-1", json!({}));
        let client = reqwest::Client::new();
        let result = invoke(&client, &config, &mut ctx, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result, HTTP_COMPLETED);
        assert_eq!(
            ctx.output.as_ref().and_then(|o| o.get("r")),
            Some(&json!({"error": "boom"}))
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_executor_error() {
        let config = HttpActionConfig {
            method: "GET".into(),
            url: "http://127.0.0.1:0/unreachable".into(),
            headers: HashMap::new(),
            body: None,
            save_as: None,
        };
        let mut ctx = Context::new("job-1", json!({}));
        let client = reqwest::Client::new();
        let err = invoke(&client, &config, &mut ctx, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::TransportError(_)));
    }
}
