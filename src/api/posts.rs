// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Protected resource: posts.

use axum::{extract::State, Json};
use tracing::debug;

use crate::{auth::Auth, models::Post, state::AppState};

/// List all posts.
#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All posts", body = [Post]),
        (status = 401, description = "No access token presented"),
        (status = 403, description = "Access token invalid or expired without a usable refresh token"),
    )
)]
pub async fn list_posts(Auth(principal): Auth, State(state): State<AppState>) -> Json<Vec<Post>> {
    debug!(principal = %principal, "Listing posts");
    Json(state.posts.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn list_posts_returns_configured_posts() {
        let (state, _clock) = test_state();
        let state = state.with_posts(vec![Post::new("alice", "hello")]);

        let Json(posts) = list_posts(Auth(Principal::new("alice").unwrap()), State(state)).await;
        assert_eq!(posts, vec![Post::new("alice", "hello")]);
    }
}
