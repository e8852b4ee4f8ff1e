// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed credential codec.
//!
//! Credentials are HS256 JWTs. Each codec instance owns exactly one secret and
//! one [`CredentialKind`]; the service runs two of them so that an access
//! credential can never be redeemed as a refresh credential or vice versa.
//!
//! ## Verification outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Malformed` | Not a decodable JWT, or the payload is not our claim shape |
//! | `SignatureInvalid` | Decoded, but not signed by this codec's secret/kind |
//! | `Expired` | Signature valid, but `now >= exp` |
//!
//! The `exp` check is done here rather than by `jsonwebtoken` so the boundary
//! is exact (`>=`, no leeway) and driven by the injected [`Clock`](super::Clock).

use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use super::claims::{CredentialClaims, CredentialKind, Principal};

/// Why a presented credential did not verify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("credential is malformed")]
    Malformed,

    #[error("credential signature is invalid")]
    SignatureInvalid,

    /// The signature checked out, so the principal is trustworthy even though
    /// the credential can no longer be used on its own.
    #[error("credential expired")]
    Expired { principal: Principal },
}

/// A freshly signed credential together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub claims: CredentialClaims,
}

pub struct CredentialCodec {
    kind: CredentialKind,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialCodec {
    pub fn new(kind: CredentialKind, secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            kind,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    /// Sign a new credential for `principal`.
    ///
    /// `ttl = None` produces a credential without `exp`. `family` is only
    /// meaningful for refresh credentials.
    pub fn issue(
        &self,
        principal: &Principal,
        ttl: Option<Duration>,
        family: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, jsonwebtoken::errors::Error> {
        let iat = now.timestamp();
        let exp = ttl.map(|ttl| iat.saturating_add(ttl.as_secs().min(i64::MAX as u64) as i64));

        let claims = CredentialClaims {
            name: principal.name.clone(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
            typ: self.kind,
            fam: family.map(str::to_owned),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedCredential { token, claims })
    }

    /// Check signature, kind and expiry of `token` as of `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<CredentialClaims, VerifyError> {
        let data = decode::<CredentialClaims>(token.trim(), &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    VerifyError::SignatureInvalid
                }
                _ => VerifyError::Malformed,
            })?;

        let claims = data.claims;

        // Same secret configured for both kinds would otherwise let one pass as the other.
        if claims.typ != self.kind {
            return Err(VerifyError::SignatureInvalid);
        }

        if let Some(exp) = claims.exp {
            if now.timestamp() >= exp {
                return Err(VerifyError::Expired {
                    principal: claims.principal(),
                });
            }
        }

        Ok(claims)
    }
}
