// Copyright (c) 2025 LLM DevOps
// SPDX-License-Identifier: Apache-2.0

//! `/actions` ingress routes (§6). A single update handler per the
//! `ActionUpdateSchema` contract — see §9 "Duplicated PUT handler" for why
//! there is deliberately only one.

use axum::extract::{Path, State};
use axum::Json;
use karya_core::model::{Action, ActionSchema, ActionUpdateSchema};
use karya_core::store::ActionStore;

use crate::ingress::error::ApiError;
use crate::ingress::AppState;

/// `POST /actions` — `409` if an action with this name already exists.
pub async fn create_action(
    State(state): State<AppState>,
    Json(req): Json<ActionSchema>,
) -> Result<Json<ActionSchema>, ApiError> {
    let action = Action {
        name: req.name.clone(),
        action_type: req.action_type,
        config: req.config,
    };
    state.action_store.create(action.clone()).await?;
    tracing::info!(action_name = %req.name, "action created");
    Ok(Json(ActionSchema {
        name: action.name,
        action_type: action.action_type,
        config: action.config,
    }))
}

/// `GET /actions/{name}` — `404` if absent.
pub async fn get_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ActionSchema>, ApiError> {
    let action = state
        .action_store
        .get(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("action '{name}' not found")))?;
    Ok(Json(ActionSchema {
        name: action.name,
        action_type: action.action_type,
        config: action.config,
    }))
}

/// `GET /actions` — list of all known actions.
pub async fn list_actions(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActionSchema>>, ApiError> {
    let actions = state.action_store.list().await?;
    Ok(Json(
        actions
            .into_iter()
            .map(|a| ActionSchema {
                name: a.name,
                action_type: a.action_type,
                config: a.config,
            })
            .collect(),
    ))
}

/// `PUT /actions/{name}` — the single update handler, accepting
/// `{type, config}`. `404` if the name does not exist.
pub async fn update_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<ActionUpdateSchema>,
) -> Result<Json<()>, ApiError> {
    let updated = state
        .action_store
        .update(&name, req.action_type, req.config)
        .await?;
    if !updated {
        return Err(ApiError::not_found(format!("action '{name}' not found")));
    }
    tracing::info!(action_name = %name, "action updated");
    Ok(Json(()))
}

/// `DELETE /actions/{name}` — `404` if absent.
pub async fn delete_action(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<()>, ApiError> {
    let deleted = state.action_store.delete(&name).await?;
    if !deleted {
        return Err(ApiError::not_found(format!("action '{name}' not found")));
    }
    tracing::info!(action_name = %name, "action deleted");
    Ok(Json(()))
}
