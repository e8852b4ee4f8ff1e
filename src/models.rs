// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the session and resource endpoints. Field
//! names on the wire are camelCase (`accessToken`, `refreshToken`).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{LifecycleError, Principal, TokenPair};

// =============================================================================
// Session Models
// =============================================================================

/// Body of `POST /login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Name of the already-authenticated user.
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of `POST /token` and `DELETE /logout`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Refresh token previously handed out by `/login` or `/token`.
    ///
    /// Kept as raw JSON: a non-string value is an invalid credential, not a
    /// malformed request.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub token: Option<serde_json::Value>,
}

impl TokenRequest {
    /// The presented token, `None` when absent or null.
    pub fn presented(&self) -> Result<Option<&str>, LifecycleError> {
        match &self.token {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(token)) => Ok(Some(token)),
            Some(_) => Err(LifecycleError::CredentialInvalid),
        }
    }
}

/// Access/refresh credential pair returned by `/login` and `/token`.
///
/// The refresh token rotates on every `/token` call; clients must replace the
/// one they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

/// Response for `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub name: String,
}

impl From<Principal> for MeResponse {
    fn from(principal: Principal) -> Self {
        Self {
            name: principal.name,
        }
    }
}

// =============================================================================
// Resource Models
// =============================================================================

/// A post served by the protected resource endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub username: String,
    pub title: String,
}

impl Post {
    pub fn new(username: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            title: title.into(),
        }
    }
}

/// Posts served when nothing else is configured.
pub fn seed_posts() -> Vec<Post> {
    vec![
        Post::new("Kyle", "Post 1"),
        Post::new("Jim", "Post 2"),
        Post::new("Kyle", "Post 3"),
        Post::new("Jim", "Post 4"),
    ]
}
