// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! AI inference routes (`/v1/ai`).

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::ai::{
    catalog, ImageGenerateRequest, ImageGeneration, ProviderInfo, TextGenerateRequest,
    TextGeneration,
};
use crate::auth::Auth;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}

/// Proxy a text generation request to the selected provider.
#[utoipa::path(
    post,
    path = "/v1/ai/text-generate",
    request_body = TextGenerateRequest,
    tag = "AI",
    responses(
        (status = 200, description = "Normalized generation result", body = TextGeneration),
        (status = 400, description = "Empty prompt or unknown provider"),
        (status = 502, description = "Provider request failed")
    )
)]
pub async fn text_generate(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<TextGenerateRequest>,
) -> Result<Json<TextGeneration>, ApiError> {
    info!(user_id = %user.user_id, "text generation requested");
    let generation = state.ai.text_generate(request).await?;
    Ok(Json(generation))
}

/// Proxy an image generation request to the selected provider.
#[utoipa::path(
    post,
    path = "/v1/ai/image-generate",
    request_body = ImageGenerateRequest,
    tag = "AI",
    responses(
        (status = 200, description = "Normalized image result", body = ImageGeneration),
        (status = 400, description = "Empty prompt or unknown provider"),
        (status = 502, description = "Provider request failed")
    )
)]
pub async fn image_generate(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<ImageGenerateRequest>,
) -> Result<Json<ImageGeneration>, ApiError> {
    info!(user_id = %user.user_id, "image generation requested");
    let generation = state.ai.image_generate(request).await?;
    Ok(Json(generation))
}

/// Static catalog of supported providers and models.
#[utoipa::path(
    get,
    path = "/v1/ai/providers",
    tag = "AI",
    responses(
        (status = 200, description = "Provider catalog", body = ProvidersResponse)
    )
)]
pub async fn list_providers(Auth(_user): Auth) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: catalog(),
    })
}
