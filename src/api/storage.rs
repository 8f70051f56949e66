// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Object storage routes (`/v1/r2`).

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::presign::DEFAULT_EXPIRES_SECS;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Object key to store the body under.
    pub key: Option<String>,
    /// Content type recorded with the object.
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct KeyQuery {
    /// Object key.
    pub key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub key: String,
    pub etag: String,
    pub url: String,
}

#[derive(Serialize, ToSchema)]
pub struct SignedPutResponse {
    pub url: String,
    pub key: String,
}

#[derive(Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

fn require_key(key: Option<String>) -> Result<String, ApiError> {
    key.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("key query parameter is required"))
}

/// Proxy-upload a request body into the object store.
#[utoipa::path(
    post,
    path = "/v1/r2/upload",
    request_body(content = Vec<u8>, description = "Raw object bytes", content_type = "application/octet-stream"),
    params(UploadQuery),
    tag = "Storage",
    responses(
        (status = 200, description = "Object stored", body = UploadResponse),
        (status = 400, description = "Missing object key")
    )
)]
pub async fn upload_object(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let key = require_key(params.key)?;
    let content_type = params
        .content_type
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let result = state
        .objects
        .put(&key, body.to_vec(), &content_type, &BTreeMap::new())
        .await?;
    let url = state.objects.download_url(&key);

    info!(user_id = %user.user_id, key = %key, "object uploaded");

    Ok(Json(UploadResponse {
        key,
        etag: result.etag,
        url,
    }))
}

/// Issue a presigned PUT URL for a direct-to-storage upload.
#[utoipa::path(
    get,
    path = "/v1/r2/signed-put",
    params(KeyQuery),
    tag = "Storage",
    responses(
        (status = 200, description = "Presigned PUT URL", body = SignedPutResponse),
        (status = 400, description = "Missing object key")
    )
)]
pub async fn signed_put_url(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(params): Query<KeyQuery>,
) -> Result<Json<SignedPutResponse>, ApiError> {
    let key = require_key(params.key)?;
    let url = state
        .presigner
        .presign_put(&key, DEFAULT_EXPIRES_SECS, Utc::now());

    info!(user_id = %user.user_id, key = %key, "presigned upload issued");

    Ok(Json(SignedPutResponse { url, key }))
}

/// Stream an object body back with its stored content type.
#[utoipa::path(
    get,
    path = "/v1/r2/object",
    params(KeyQuery),
    tag = "Storage",
    responses(
        (status = 200, description = "Object body with its stored content type"),
        (status = 404, description = "No object under that key")
    )
)]
pub async fn get_object(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Query(params): Query<KeyQuery>,
) -> Result<Response, ApiError> {
    let key = require_key(params.key)?;
    let object = state.objects.get(&key).await?;

    Ok(([(header::CONTENT_TYPE, object.content_type)], object.body).into_response())
}

/// Delete an object.
#[utoipa::path(
    delete,
    path = "/v1/r2/object",
    params(KeyQuery),
    tag = "Storage",
    responses(
        (status = 200, description = "Object deleted", body = OkResponse)
    )
)]
pub async fn delete_object(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(params): Query<KeyQuery>,
) -> Result<Json<OkResponse>, ApiError> {
    let key = require_key(params.key)?;
    state.objects.delete(&key).await?;

    info!(user_id = %user.user_id, key = %key, "object deleted");

    Ok(Json(OkResponse { ok: true }))
}
