// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated principals.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is Principal
//! }
//! ```
//!
//! Behind [`require_auth`](super::middleware::require_auth) the extractor just
//! picks up the principal the gatekeeper resolved. On routes without the
//! gatekeeper it verifies the bearer token itself, **without** fallback
//! rotation: an extractor cannot add headers to the response.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::middleware::bearer_token;
use super::{AuthError, Principal};
use crate::state::AppState;

/// Extractor for authenticated principals.
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the principal
        if let Some(principal) = parts.extensions.get::<Principal>().cloned() {
            return Ok(Auth(principal));
        }

        let token = bearer_token(&parts.headers)?;
        let principal = state.lifecycle.verify_access(token.as_deref())?;

        Ok(Auth(principal))
    }
}
