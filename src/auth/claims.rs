// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential claims and the resolved principal.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

/// Which of the two signing secrets a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Short-lived credential presented on every protected request.
    Access,
    /// Long-lived credential exchanged for new access credentials.
    Refresh,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Access => "access",
            CredentialKind::Refresh => "refresh",
        }
    }
}

/// The identity a credential speaks for.
///
/// Authentication of the login step itself happens elsewhere; by the time a
/// `Principal` exists the caller has already been trusted to assert it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    /// Display name (NFC-normalized, surrounding whitespace removed)
    pub name: String,
}

impl Principal {
    /// Build a principal from a caller-supplied name.
    ///
    /// Returns `None` when nothing is left after trimming.
    pub fn new(name: &str) -> Option<Self> {
        let name: String = name.trim().nfc().collect();
        if name.is_empty() {
            None
        } else {
            Some(Self { name })
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Claims carried by both credential kinds.
///
/// Access credentials leave `fam` unset. Refresh credentials always carry the
/// family id of the login they descend from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Principal display name
    pub name: String,
    /// Issued at (UNIX seconds)
    pub iat: i64,
    /// Expires at (UNIX seconds); absent means no expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Unique credential id
    pub jti: String,
    /// Credential kind
    pub typ: CredentialKind,
    /// Refresh family id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fam: Option<String>,
}

impl CredentialClaims {
    pub fn principal(&self) -> Principal {
        Principal {
            name: self.name.clone(),
        }
    }
}
