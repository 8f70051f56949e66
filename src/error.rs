// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! HTTP error responses.
//!
//! Component modules surface their own closed error enums; this module is
//! the single place those kinds are mapped to HTTP status codes. Every
//! error body is JSON `{"error": "...", "details"?: "..."}` regardless of
//! route. Upstream failure detail is logged here and never echoed to the
//! caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::ai::AiError;
use crate::rate_limit::RateLimitError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl From<RateLimitError> for ApiError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::RateLimited => ApiError::too_many_requests(),
            RateLimitError::Store(store_err) => {
                error!(error = %store_err, "rate limit counter store failure");
                ApiError::internal("rate limiter unavailable")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::not_found("Object not found"),
            StorageError::Upstream(detail) => {
                error!(error = %detail, "storage backend failure");
                ApiError::bad_gateway("storage backend request failed")
            }
        }
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::UnknownProvider(_)
            | AiError::EmptyPrompt
            | AiError::UnsupportedCapability(_) => ApiError::bad_request(err.to_string()),
            AiError::MissingCredentials(name) => {
                error!(secret = %name, "AI provider credentials not configured");
                ApiError::internal("AI provider not configured")
            }
            AiError::Request(detail) => {
                error!(error = %detail, "AI provider request failure");
                ApiError::bad_gateway("AI provider request failed")
            }
            AiError::InvalidResponse(detail) => {
                error!(error = %detail, "AI provider returned an unusable response");
                ApiError::bad_gateway("AI provider returned an invalid response")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::CounterStoreError;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let limited = ApiError::too_many_requests();
        assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn details_are_serialized_when_present() {
        let response = ApiError::bad_request("bad data")
            .with_details("key query parameter is required")
            .into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["details"], "key query parameter is required");
    }

    #[test]
    fn rate_limit_errors_map_to_429_and_500() {
        let limited: ApiError = RateLimitError::RateLimited.into();
        assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);

        let store: ApiError = RateLimitError::Store(CounterStoreError::LockPoisoned).into();
        assert_eq!(store.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_errors_map_to_404_and_502() {
        let missing: ApiError = StorageError::NotFound("a.bin".into()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let upstream: ApiError = StorageError::Upstream("connect refused".into()).into();
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
        // Upstream detail must not leak into the response body.
        assert_eq!(upstream.message, "storage backend request failed");
    }

    #[test]
    fn ai_errors_map_by_kind() {
        let unknown: ApiError = AiError::UnknownProvider("nope".into()).into();
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

        let missing: ApiError = AiError::MissingCredentials("OPENAI_API_KEY".into()).into();
        assert_eq!(missing.status, StatusCode::INTERNAL_SERVER_ERROR);

        let upstream: ApiError = AiError::Request("POST failed".into()).into();
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
    }
}
