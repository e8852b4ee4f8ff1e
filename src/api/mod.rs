// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_auth, Principal},
    models::{LoginRequest, MeResponse, Post, TokenPairResponse, TokenRequest},
    state::AppState,
};

pub mod health;
pub mod posts;
pub mod session;
pub mod users;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/me", get(users::get_current_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/login", post(session::login))
        .route("/token", post(session::refresh))
        .route("/logout", delete(session::logout))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        session::login,
        session::refresh,
        session::logout,
        posts::list_posts,
        users::get_current_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            TokenRequest,
            TokenPairResponse,
            MeResponse,
            Post,
            Principal,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Session", description = "Login, token refresh and logout"),
        (name = "Posts", description = "Protected resources"),
        (name = "Users", description = "Current principal"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
