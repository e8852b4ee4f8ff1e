// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints: login, refresh, logout.
//!
//! Bodies are parsed leniently: an empty body is treated as `{}` so that a
//! bodiless `/token` call yields 401 (no credential) rather than a JSON error.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::de::DeserializeOwned;

use crate::{
    auth::Principal,
    error::ApiError,
    models::{LoginRequest, TokenPairResponse, TokenRequest},
    state::AppState,
};

fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

/// Start a session for an already-authenticated user.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    tag = "Session",
    responses(
        (status = 200, description = "Credential pair issued", body = TokenPairResponse),
        (status = 400, description = "Missing or blank username"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let request: LoginRequest = parse_body(&body)?;
    let principal = request
        .username
        .as_deref()
        .and_then(Principal::new)
        .ok_or_else(|| ApiError::bad_request("username is required"))?;

    let pair = state.lifecycle.login(&principal)?;
    Ok(Json(pair.into()))
}

/// Exchange a refresh token for a new access token and a new refresh token.
#[utoipa::path(
    post,
    path = "/token",
    request_body = TokenRequest,
    tag = "Session",
    responses(
        (status = 200, description = "Credentials rotated", body = TokenPairResponse),
        (status = 401, description = "No refresh token supplied"),
        (status = 403, description = "Refresh token invalid, expired, revoked or already used"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let request: TokenRequest = parse_body(&body)?;
    let pair = state.lifecycle.refresh(request.presented()?)?;
    Ok(Json(pair.into()))
}

/// Revoke a refresh token. Always succeeds.
#[utoipa::path(
    delete,
    path = "/logout",
    request_body = TokenRequest,
    tag = "Session",
    responses((status = 204, description = "Refresh token revoked (or was never valid)"))
)]
pub async fn logout(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, ApiError> {
    let request: TokenRequest = parse_body(&body)?;
    // Nothing registered can match a non-string token.
    state.lifecycle.logout(request.presented().unwrap_or(None))?;
    Ok(StatusCode::NO_CONTENT)
}
