// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;

use crate::auth::Auth;
use crate::models::MeResponse;

/// Get the principal the presented credentials resolve to.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Resolved principal", body = MeResponse),
        (status = 401, description = "No access token presented"),
        (status = 403, description = "Access token rejected"),
    )
)]
pub async fn get_current_user(Auth(principal): Auth) -> Json<MeResponse> {
    Json(principal.into())
}
