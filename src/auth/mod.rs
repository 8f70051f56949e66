// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atelier Labs

//! # Authentication Module
//!
//! Bearer-token authentication for the edge gateway.
//!
//! ## Auth Flow
//!
//! 1. A client app obtains a short-lived HS256 session token from the
//!    identity layer.
//! 2. The client sends `Authorization: Bearer <token>` with every request.
//! 3. The gateway:
//!    - retrieves the signing secret through the secret provider
//!    - verifies structure, signature, expiry, issuer, audience
//!    - extracts `sub` → `user_id`, plus email and role claims
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - The codec fixes HS256; the token header's `alg` is never honored
//! - Signature comparison is constant time
//! - Every failure surfaces as a generic 401; causes are logged only

pub mod claims;
pub mod error;
pub mod guard;
pub mod token;

pub use claims::{AuthContext, Claims};
pub use error::AuthError;
pub use guard::Auth;
pub use token::TokenExpectations;
