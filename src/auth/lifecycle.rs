// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Token Lifecycle
//!
//! Owns both codecs and the refresh registry, and implements every state
//! transition a client session goes through:
//!
//! ```text
//! Anonymous ──login──▶ LoggedIn(access valid)
//!                          │ access expires
//!                          ▼
//!                      LoggedIn(access expired, refresh valid)
//!                          │ refresh / fallback rotation ──▶ LoggedIn(access valid)
//!                          │ logout, refresh expiry, reuse detected
//!                          ▼
//!                      LoggedOut
//! ```
//!
//! ## Refresh rotation
//!
//! Every successful refresh returns a new access credential **and** a new
//! refresh credential. The redeemed refresh credential stays in the registry
//! as rotated; presenting it again revokes every credential of its family.
//!
//! ## Error collapse
//!
//! Codec-level outcomes (`Malformed`, `SignatureInvalid`, `Expired`) never
//! leave this module. Callers only see [`LifecycleError`]; refresh failures in
//! particular always surface as `CredentialInvalid` regardless of cause.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::claims::{CredentialKind, Principal};
use super::clock::Clock;
use super::codec::{CredentialCodec, IssuedCredential, VerifyError};
use super::registry::{RegistryError, RenewalRecord, RenewalRegistry, RotateOutcome};

/// Credential lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("no credential presented")]
    NoCredentialPresented,

    #[error("credential is invalid")]
    CredentialInvalid,

    #[error("credential has expired")]
    CredentialExpired,

    #[error("credential registry failure: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// An access credential plus the refresh credential to use next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of verifying a protected request.
///
/// `rotated` is set when the access credential had expired and was replaced
/// using the refresh credential; the caller must hand both new credentials
/// back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub principal: Principal,
    pub rotated: Option<TokenPair>,
}

pub struct TokenLifecycle {
    access: CredentialCodec,
    refresh: CredentialCodec,
    registry: RenewalRegistry,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl TokenLifecycle {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        policy: LifecyclePolicy,
        registry: RenewalRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            access: CredentialCodec::new(CredentialKind::Access, access_secret),
            refresh: CredentialCodec::new(CredentialKind::Refresh, refresh_secret),
            registry,
            clock,
            policy,
        }
    }

    pub fn registry_backend(&self) -> &'static str {
        self.registry.backend()
    }

    /// Number of registry entries, rotated ones included.
    pub fn registry_entries(&self) -> LifecycleResult<usize> {
        Ok(self.registry.len()?)
    }

    /// Start a new session for an already-authenticated principal.
    pub fn login(&self, principal: &Principal) -> LifecycleResult<TokenPair> {
        let now = self.clock.now();
        let family_id = Uuid::new_v4().to_string();

        let access = self
            .access
            .issue(principal, Some(self.policy.access_ttl), None, now)?;
        let refresh = self.issue_refresh(principal, &family_id, now)?;
        self.registry.add(&refresh.token, &registry_record(&refresh))?;

        info!(principal = %principal, family = %family_id, "Issued credential pair");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Exchange a refresh credential for a new access/refresh pair.
    pub fn refresh(&self, token: Option<&str>) -> LifecycleResult<TokenPair> {
        let token = token.ok_or(LifecycleError::NoCredentialPresented)?;
        let (_, pair) = self.redeem(token, None)?;
        Ok(pair)
    }

    /// End the session behind a refresh credential.
    ///
    /// Always succeeds for unknown, malformed or absent tokens. A known token
    /// takes its whole family with it.
    pub fn logout(&self, token: Option<&str>) -> LifecycleResult<()> {
        let Some(token) = token else {
            return Ok(());
        };

        if let Some(record) = self.registry.remove(token)? {
            let revoked = self.registry.revoke_family(&record.family_id)?;
            info!(
                principal = %record.principal,
                family = %record.family_id,
                revoked = revoked + 1,
                "Revoked refresh credentials on logout"
            );
        }
        Ok(())
    }

    /// Verify an access credential without fallback.
    pub fn verify_access(&self, token: Option<&str>) -> LifecycleResult<Principal> {
        let token = token.ok_or(LifecycleError::NoCredentialPresented)?;
        match self.access.verify(token, self.clock.now()) {
            Ok(claims) => Ok(claims.principal()),
            Err(VerifyError::Expired { .. }) => Err(LifecycleError::CredentialExpired),
            Err(e) => {
                debug!(kind = self.access.kind().as_str(), reason = %e, "Rejected credential");
                Err(LifecycleError::CredentialInvalid)
            }
        }
    }

    /// Verify an access credential, rotating via `refresh` if it has expired.
    pub fn verify(&self, access: Option<&str>, refresh: Option<&str>) -> LifecycleResult<Admission> {
        let access = access.ok_or(LifecycleError::NoCredentialPresented)?;

        match self.access.verify(access, self.clock.now()) {
            Ok(claims) => Ok(Admission {
                principal: claims.principal(),
                rotated: None,
            }),
            Err(VerifyError::Expired { principal }) => {
                let Some(refresh) = refresh else {
                    debug!(principal = %principal, "Access credential expired, no refresh credential");
                    return Err(LifecycleError::CredentialExpired);
                };
                let (principal, pair) = self.redeem(refresh, Some(&principal))?;
                info!(principal = %principal, "Rotated expired access credential");
                Ok(Admission {
                    principal,
                    rotated: Some(pair),
                })
            }
            Err(e) => {
                debug!(kind = self.access.kind().as_str(), reason = %e, "Rejected credential");
                Err(LifecycleError::CredentialInvalid)
            }
        }
    }

    /// Drop registry entries whose refresh credential has expired.
    pub fn purge_expired(&self) -> LifecycleResult<usize> {
        Ok(self.registry.purge_expired(self.clock.now().timestamp())?)
    }

    fn issue_refresh(
        &self,
        principal: &Principal,
        family_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> LifecycleResult<IssuedCredential> {
        Ok(self
            .refresh
            .issue(principal, Some(self.policy.refresh_ttl), Some(family_id), now)?)
    }

    /// Validate and consume a refresh credential.
    ///
    /// With `expected` set, the credential must belong to that principal; the
    /// check happens before rotation so a mismatched credential is left intact.
    fn redeem(
        &self,
        token: &str,
        expected: Option<&Principal>,
    ) -> LifecycleResult<(Principal, TokenPair)> {
        let now = self.clock.now();

        let claims = self.refresh.verify(token, now).map_err(|e| {
            debug!(kind = self.refresh.kind().as_str(), reason = %e, "Rejected credential");
            LifecycleError::CredentialInvalid
        })?;

        let Some(family_id) = claims.fam.as_deref() else {
            debug!("Refresh credential without family");
            return Err(LifecycleError::CredentialInvalid);
        };

        let principal = claims.principal();
        if let Some(expected) = expected {
            if *expected != principal {
                warn!(
                    access_principal = %expected,
                    refresh_principal = %principal,
                    "Access and refresh credentials name different principals"
                );
                return Err(LifecycleError::CredentialInvalid);
            }
        }

        let successor = self.issue_refresh(&principal, family_id, now)?;
        match self
            .registry
            .rotate(token, &successor.token, &registry_record(&successor))?
        {
            RotateOutcome::Rotated => {}
            RotateOutcome::Unknown => {
                debug!(principal = %principal, "Refresh credential not registered");
                return Err(LifecycleError::CredentialInvalid);
            }
            RotateOutcome::Reused { family_id, revoked } => {
                warn!(
                    principal = %principal,
                    family = %family_id,
                    revoked,
                    "Rotated refresh credential presented again; family revoked"
                );
                return Err(LifecycleError::CredentialInvalid);
            }
        }

        let access = self
            .access
            .issue(&principal, Some(self.policy.access_ttl), None, now)?;

        Ok((
            principal,
            TokenPair {
                access_token: access.token,
                refresh_token: successor.token,
            },
        ))
    }
}

fn registry_record(refresh: &IssuedCredential) -> RenewalRecord {
    RenewalRecord::active(
        refresh.claims.name.clone(),
        refresh.claims.fam.clone().unwrap_or_default(),
        refresh.claims.exp.unwrap_or(i64::MAX),
    )
}
