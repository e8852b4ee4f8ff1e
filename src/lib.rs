// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token Lifecycle Server - access/refresh credential service
//!
//! Issues short-lived access tokens and long-lived rotating refresh tokens,
//! admits requests to protected routes, and revokes refresh tokens on logout.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential codec, refresh registry, lifecycle and gatekeeper
//! - `config` - Environment configuration
//! - `sweeper` - Background purge of expired registry entries

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod sweeper;
