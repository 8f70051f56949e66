// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! Token claims and the per-request authentication context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;

/// Claims carried by a session token.
///
/// `sub` is optional at the codec level: a token without a subject still
/// verifies cryptographically, and the guard rejects it afterwards. This
/// keeps the codec's concerns (structure, signature, registered-claim
/// checks) separate from the gateway's identity requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the canonical user identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// User email, when the identity provider includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role names, in token order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Issued-at timestamp (seconds since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiry timestamp (seconds since epoch). Absent means non-expiring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Verified identity for one request.
///
/// Built by the auth guard after successful verification, carried as a
/// request extension, and dropped when the request completes. Never shared
/// across requests.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthContext {
    /// Canonical user id (the token's `sub` claim).
    pub user_id: String,

    /// User email, when present in the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Role names, in token order. May be empty.
    pub roles: Vec<String>,
}

impl AuthContext {
    /// Build the context from verified claims.
    ///
    /// Fails when the token has no usable subject.
    pub fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = claims
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;

        Ok(Self {
            user_id,
            email: claims.email,
            roles: claims.roles,
        })
    }

    /// Check whether the token carried the named role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims {
            sub: Some("user_123".to_string()),
            email: Some("dev@example.com".to_string()),
            roles: vec!["editor".to_string()],
            iat: Some(1_700_000_000),
            exp: Some(1_700_003_600),
            iss: Some("https://auth.example.com".to_string()),
            aud: None,
        }
    }

    #[test]
    fn from_claims_extracts_identity() {
        let context = AuthContext::from_claims(sample_claims()).unwrap();
        assert_eq!(context.user_id, "user_123");
        assert_eq!(context.email.as_deref(), Some("dev@example.com"));
        assert_eq!(context.roles, vec!["editor"]);
    }

    #[test]
    fn missing_subject_is_rejected() {
        let mut claims = sample_claims();
        claims.sub = None;
        assert!(matches!(
            AuthContext::from_claims(claims),
            Err(AuthError::MissingSubject)
        ));
    }

    #[test]
    fn blank_subject_is_rejected() {
        let mut claims = sample_claims();
        claims.sub = Some("   ".to_string());
        assert!(matches!(
            AuthContext::from_claims(claims),
            Err(AuthError::MissingSubject)
        ));
    }

    #[test]
    fn roles_default_to_empty() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"user_123"}"#).unwrap();
        let context = AuthContext::from_claims(claims).unwrap();
        assert!(context.roles.is_empty());
        assert!(!context.has_role("admin"));
    }

    #[test]
    fn has_role_matches_exactly() {
        let context = AuthContext::from_claims(sample_claims()).unwrap();
        assert!(context.has_role("editor"));
        assert!(!context.has_role("admin"));
    }
}
