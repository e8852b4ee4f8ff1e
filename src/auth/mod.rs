// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Issues, verifies, rotates and revokes the two credentials a client holds.
//!
//! ## Auth Flow
//!
//! 1. `POST /login` with a username: the server returns an access token
//!    (short TTL) and a refresh token (long TTL, registered server side)
//! 2. Client sends `Authorization: Bearer <access token>` on protected calls
//! 3. When the access token expires, the client either:
//!    - calls `POST /token` with the refresh token, or
//!    - keeps sending the expired access token along with the refresh token;
//!      the gatekeeper rotates both and returns them on the response
//! 4. `DELETE /logout` with the refresh token revokes it (and its family)
//!
//! ## Security
//!
//! - Access and refresh tokens are signed with different secrets
//! - Refresh tokens are honoured only while registered, and rotate on use
//! - Replaying a rotated refresh token revokes the whole family
//! - Clients only ever see 401 (nothing presented) or 403 (rejected)

pub mod claims;
pub mod clock;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod lifecycle;
pub mod middleware;
pub mod registry;

pub use claims::{CredentialClaims, CredentialKind, Principal};
pub use clock::{Clock, SystemClock};
pub use codec::{CredentialCodec, VerifyError};
pub use error::AuthError;
pub use extractor::Auth;
pub use lifecycle::{Admission, LifecycleError, LifecyclePolicy, TokenLifecycle, TokenPair};
pub use middleware::require_auth;
pub use registry::{InMemoryRegistry, RedbRegistry, RenewalRegistry};
