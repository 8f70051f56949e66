// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Bearer-token guard.
//!
//! [`require_auth`] runs as middleware on every protected route: it
//! resolves the `Authorization` header into an [`AuthContext`] and stores
//! it as a request extension, or fails the request with a generic 401.
//! Handlers receive the context through the [`Auth`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::warn;

use super::{token, AuthContext, AuthError};
use crate::config::SESSION_SIGNING_SECRET_ENV;
use crate::state::AppState;

/// Resolve the request's bearer token into an [`AuthContext`].
///
/// The signing secret is fetched per request through the secret provider;
/// retrieval failure is reported as an ordinary authentication failure,
/// never as a server error.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    // Case-sensitive scheme prefix, per the token contract.
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    let secret = state
        .secrets
        .get(SESSION_SIGNING_SECRET_ENV)
        .map_err(|_| AuthError::SecretUnavailable)?;

    let claims = token::verify(
        token,
        secret.as_bytes(),
        &state.expectations,
        Utc::now().timestamp(),
    )?;

    AuthContext::from_claims(claims)
}

/// Middleware that authenticates the request and stores the resulting
/// [`AuthContext`] in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state) {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => {
            warn!(
                error_code = err.error_code(),
                path = %request.uri().path(),
                "request rejected during authentication"
            );
            err.into_response()
        }
    }
}

/// Extractor for the authenticated user.
///
/// Reads the [`AuthContext`] placed in the extensions by [`require_auth`];
/// a route reachable without that middleware rejects with 401.
///
/// ```rust,ignore
/// async fn handler(Auth(user): Auth) -> impl IntoResponse {
///     // user.user_id is the verified subject
/// }
/// ```
pub struct Auth(pub AuthContext);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingAuthHeader)
    }
}
