// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Project document routes (`/v1/projects`).
//!
//! Projects are JSON documents in the object store under per-user keys.
//! The storage capability has no list operation, so each user also has a
//! manifest document indexing their project summaries; saves and deletes
//! keep it in step.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::storage::OkResponse;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::StorageError;

const PROJECT_CONTENT_TYPE: &str = "application/json";

fn manifest_key(user_id: &str) -> String {
    format!("projects/{user_id}/index.json")
}

fn project_key(user_id: &str, project_id: &str) -> String {
    format!("projects/{user_id}/{project_id}.json")
}

/// Manifest entry for one project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// Full project document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectDocument {
    pub id: String,
    pub name: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveProjectRequest {
    /// Omitted on first save; a fresh id is generated.
    pub id: Option<String>,
    pub name: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Serialize, ToSchema)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

async fn load_manifest(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<ProjectSummary>, ApiError> {
    match state.objects.get(&manifest_key(user_id)).await {
        Ok(object) => serde_json::from_slice(&object.body)
            .map_err(|_| ApiError::internal("stored project manifest is corrupt")),
        Err(StorageError::NotFound(_)) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

async fn store_manifest(
    state: &AppState,
    user_id: &str,
    manifest: &[ProjectSummary],
) -> Result<(), ApiError> {
    let bytes = serde_json::to_vec(manifest)
        .map_err(|_| ApiError::internal("project manifest serialization failed"))?;
    state
        .objects
        .put(
            &manifest_key(user_id),
            bytes,
            PROJECT_CONTENT_TYPE,
            &BTreeMap::new(),
        )
        .await?;
    Ok(())
}

/// List the caller's projects.
#[utoipa::path(
    get,
    path = "/v1/projects",
    tag = "Projects",
    responses(
        (status = 200, description = "Project summaries", body = ProjectList)
    )
)]
pub async fn list_projects(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<ProjectList>, ApiError> {
    let projects = load_manifest(&state, &user.user_id).await?;
    Ok(Json(ProjectList { projects }))
}

/// Create or update a project document.
#[utoipa::path(
    post,
    path = "/v1/projects",
    request_body = SaveProjectRequest,
    tag = "Projects",
    responses(
        (status = 201, description = "Saved project summary", body = ProjectSummary),
        (status = 400, description = "Missing project name")
    )
)]
pub async fn save_project(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<SaveProjectRequest>,
) -> Result<(StatusCode, Json<ProjectSummary>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("project name is required"));
    }

    let id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let document = ProjectDocument {
        id: id.clone(),
        name: request.name.clone(),
        data: request.data,
        updated_at: Utc::now(),
    };
    let bytes = serde_json::to_vec(&document)
        .map_err(|_| ApiError::internal("project serialization failed"))?;
    state
        .objects
        .put(
            &project_key(&user.user_id, &id),
            bytes,
            PROJECT_CONTENT_TYPE,
            &BTreeMap::new(),
        )
        .await?;

    let summary = ProjectSummary {
        id: id.clone(),
        name: document.name,
        updated_at: document.updated_at,
    };

    let mut manifest = load_manifest(&state, &user.user_id).await?;
    match manifest.iter_mut().find(|entry| entry.id == id) {
        Some(entry) => *entry = summary.clone(),
        None => manifest.push(summary.clone()),
    }
    store_manifest(&state, &user.user_id, &manifest).await?;

    info!(user_id = %user.user_id, project_id = %id, "project saved");

    Ok((StatusCode::CREATED, Json(summary)))
}

/// Fetch one project document.
#[utoipa::path(
    get,
    path = "/v1/projects/{project_id}",
    params(
        ("project_id" = String, Path, description = "Project identifier")
    ),
    tag = "Projects",
    responses(
        (status = 200, description = "Project document", body = ProjectDocument),
        (status = 404, description = "No such project")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectDocument>, ApiError> {
    let object = state
        .objects
        .get(&project_key(&user.user_id, &project_id))
        .await
        .map_err(|err| match err {
            StorageError::NotFound(_) => ApiError::not_found("Project not found"),
            other => other.into(),
        })?;

    let document = serde_json::from_slice(&object.body)
        .map_err(|_| ApiError::internal("stored project document is corrupt"))?;
    Ok(Json(document))
}

/// Delete one project document.
#[utoipa::path(
    delete,
    path = "/v1/projects/{project_id}",
    params(
        ("project_id" = String, Path, description = "Project identifier")
    ),
    tag = "Projects",
    responses(
        (status = 200, description = "Project deleted", body = OkResponse)
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(project_id): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .objects
        .delete(&project_key(&user.user_id, &project_id))
        .await?;

    let mut manifest = load_manifest(&state, &user.user_id).await?;
    manifest.retain(|entry| entry.id != project_id);
    store_manifest(&state, &user.user_id, &manifest).await?;

    info!(user_id = %user.user_id, project_id = %project_id, "project deleted");

    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::state::testing::test_state;
    use serde_json::json;

    fn user(id: &str) -> Auth {
        Auth(AuthContext {
            user_id: id.to_string(),
            email: None,
            roles: vec![],
        })
    }

    async fn save(state: &AppState, user_id: &str, name: &str) -> ProjectSummary {
        let (status, Json(summary)) = save_project(
            State(state.clone()),
            user(user_id),
            Json(SaveProjectRequest {
                id: None,
                name: name.to_string(),
                data: json!({"layers": []}),
            }),
        )
        .await
        .expect("save succeeds");
        assert_eq!(status, StatusCode::CREATED);
        summary
    }

    #[tokio::test]
    async fn empty_manifest_lists_nothing() {
        let state = test_state(100);
        let Json(list) = list_projects(State(state), user("user_a")).await.unwrap();
        assert!(list.projects.is_empty());
    }

    #[tokio::test]
    async fn save_then_list_then_get() {
        let state = test_state(100);
        let summary = save(&state, "user_a", "First project").await;

        let Json(list) = list_projects(State(state.clone()), user("user_a"))
            .await
            .unwrap();
        assert_eq!(list.projects.len(), 1);
        assert_eq!(list.projects[0].id, summary.id);

        let Json(document) = get_project(
            State(state),
            user("user_a"),
            Path(summary.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(document.name, "First project");
        assert_eq!(document.data, json!({"layers": []}));
    }

    #[tokio::test]
    async fn resave_with_same_id_updates_in_place() {
        let state = test_state(100);
        let summary = save(&state, "user_a", "First").await;

        let (_, Json(updated)) = save_project(
            State(state.clone()),
            user("user_a"),
            Json(SaveProjectRequest {
                id: Some(summary.id.clone()),
                name: "Renamed".to_string(),
                data: json!({}),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.id, summary.id);

        let Json(list) = list_projects(State(state), user("user_a")).await.unwrap();
        assert_eq!(list.projects.len(), 1);
        assert_eq!(list.projects[0].name, "Renamed");
    }

    #[tokio::test]
    async fn projects_are_scoped_per_user() {
        let state = test_state(100);
        let summary = save(&state, "user_a", "Mine").await;

        let Json(list) = list_projects(State(state.clone()), user("user_b"))
            .await
            .unwrap();
        assert!(list.projects.is_empty());

        let err = get_project(State(state), user("user_b"), Path(summary.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_project_is_404() {
        let state = test_state(100);
        let err = get_project(State(state), user("user_a"), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let state = test_state(100);
        let err = save_project(
            State(state),
            user("user_a"),
            Json(SaveProjectRequest {
                id: None,
                name: "  ".to_string(),
                data: json!({}),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_removes_document_and_manifest_entry() {
        let state = test_state(100);
        let summary = save(&state, "user_a", "Doomed").await;

        let Json(response) = delete_project(
            State(state.clone()),
            user("user_a"),
            Path(summary.id.clone()),
        )
        .await
        .unwrap();
        assert!(response.ok);

        let Json(list) = list_projects(State(state.clone()), user("user_a"))
            .await
            .unwrap();
        assert!(list.projects.is_empty());

        let err = get_project(State(state), user("user_a"), Path(summary.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
