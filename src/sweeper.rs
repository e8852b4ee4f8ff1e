// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Registry Sweeper
//!
//! Background task that drops expired refresh registry entries. Expired
//! entries are already refused on presentation; sweeping only bounds the
//! registry's size.
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::TokenLifecycle;

pub struct RegistrySweeper {
    lifecycle: Arc<TokenLifecycle>,
    interval: Duration,
}

impl RegistrySweeper {
    pub fn new(lifecycle: Arc<TokenLifecycle>, interval: Duration) -> Self {
        Self { lifecycle, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            backend = self.lifecycle.registry_backend(),
            "Registry sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Registry sweeper shutting down");
                    return;
                }
            }

            self.sweep_step();
        }
    }

    /// One sweep. Returns the number of entries removed.
    fn sweep_step(&self) -> usize {
        match self.lifecycle.purge_expired() {
            Ok(0) => {
                debug!("Registry sweep: nothing expired");
                0
            }
            Ok(removed) => {
                info!(removed, "Registry sweep: purged expired refresh tokens");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Registry sweep failed");
                0
            }
        }
    }
}
