// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenLifecycle;
use crate::models::{seed_posts, Post};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<TokenLifecycle>,
    pub posts: Arc<Vec<Post>>,
}

impl AppState {
    pub fn new(lifecycle: Arc<TokenLifecycle>) -> Self {
        Self {
            lifecycle,
            posts: Arc::new(seed_posts()),
        }
    }

    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = Arc::new(posts);
        self
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use super::*;
    use crate::auth::{clock::ManualClock, LifecyclePolicy, RenewalRegistry};

    pub const ACCESS_TTL: Duration = Duration::from_secs(15);
    pub const REFRESH_TTL: Duration = Duration::from_secs(3600);

    /// State over an in-memory registry and a clock the test controls.
    pub fn test_state() -> (AppState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let lifecycle = TokenLifecycle::new(
            b"test-access-secret",
            b"test-refresh-secret",
            LifecyclePolicy {
                access_ttl: ACCESS_TTL,
                refresh_ttl: REFRESH_TTL,
            },
            RenewalRegistry::in_memory(),
            clock.clone(),
        );
        (AppState::new(Arc::new(lifecycle)), clock)
    }
}
