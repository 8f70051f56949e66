// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Request gateway.
//!
//! Router construction reproduces the per-request state machine:
//! OPTIONS short-circuits to a CORS preflight response; `/health` is
//! open; every other path runs Authenticate → RateLimit → Route →
//! Handle, with the 404 fallback inside the guarded subtree so unknown
//! paths still pass the auth and rate-limit gates. Every terminal
//! response picks up the CORS headers on the way out.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth, error::ApiError, rate_limit, state::AppState};

pub mod ai;
pub mod health;
pub mod projects;
pub mod storage;

const CORS_ALLOW_ORIGIN: &str = "*";
const CORS_ALLOW_HEADERS: &str = "authorization,content-type";
const CORS_ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

pub fn router(state: AppState) -> Router {
    let storage_routes = Router::new()
        .route("/upload", post(storage::upload_object))
        .route("/signed-put", get(storage::signed_put_url))
        .route(
            "/object",
            get(storage::get_object).delete(storage::delete_object),
        );

    let ai_routes = Router::new()
        .route("/text-generate", post(ai::text_generate))
        .route("/image-generate", post(ai::image_generate))
        .route("/providers", get(ai::list_providers));

    let project_routes = Router::new()
        .route(
            "/",
            get(projects::list_projects).post(projects::save_project),
        )
        .route(
            "/{project_id}",
            get(projects::get_project).delete(projects::delete_project),
        );

    // Auth runs before the rate limiter (outer layer first), and the
    // fallback sits inside so unknown paths are still gated.
    let guarded = Router::new()
        .nest("/v1/r2", storage_routes)
        .nest("/v1/ai", ai_routes)
        .nest("/v1/projects", project_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::guard::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(guarded)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("No such route")
}

/// CORS injection.
///
/// `tower_http::cors::CorsLayer` is not used here: the gateway contract
/// fixes the preflight status at 204 and requires the headers on every
/// response, with or without an `Origin` header.
async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        "access-control-allow-origin",
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        storage::upload_object,
        storage::signed_put_url,
        storage::get_object,
        storage::delete_object,
        ai::text_generate,
        ai::image_generate,
        ai::list_providers,
        projects::list_projects,
        projects::save_project,
        projects::get_project,
        projects::delete_project
    ),
    components(
        schemas(
            health::HealthResponse,
            storage::UploadResponse,
            storage::SignedPutResponse,
            storage::OkResponse,
            ai::ProvidersResponse,
            crate::ai::TextGenerateRequest,
            crate::ai::TextGeneration,
            crate::ai::ImageGenerateRequest,
            crate::ai::ImageGeneration,
            crate::ai::Usage,
            crate::ai::ProviderInfo,
            projects::ProjectSummary,
            projects::ProjectDocument,
            projects::SaveProjectRequest,
            projects::ProjectList
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Storage", description = "Object uploads and retrieval"),
        (name = "AI", description = "Inference proxying"),
        (name = "Projects", description = "Project documents")
    )
)]
struct ApiDoc;
