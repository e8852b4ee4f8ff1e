// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::lifecycle::LifecycleError;

/// Authentication error type.
///
/// This is the only auth-related error that reaches clients. Codec detail
/// (malformed vs. bad signature) is not represented.
#[derive(Debug)]
pub enum AuthError {
    /// No credential presented
    MissingCredential,
    /// Credential is malformed, forged, revoked, unregistered or presented
    /// under a scheme other than `Bearer`
    CredentialInvalid,
    /// Access credential expired and could not be renewed
    CredentialExpired,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::CredentialInvalid => "credential_invalid",
            AuthError::CredentialExpired => "credential_expired",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential => StatusCode::UNAUTHORIZED,
            AuthError::CredentialInvalid | AuthError::CredentialExpired => StatusCode::FORBIDDEN,
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "A credential is required"),
            AuthError::CredentialInvalid => write!(f, "Credential is invalid"),
            AuthError::CredentialExpired => write!(f, "Credential has expired"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<LifecycleError> for AuthError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NoCredentialPresented => AuthError::MissingCredential,
            LifecycleError::CredentialInvalid => AuthError::CredentialInvalid,
            LifecycleError::CredentialExpired => AuthError::CredentialExpired,
            LifecycleError::Registry(e) => {
                tracing::error!(error = %e, "Refresh registry failure");
                AuthError::InternalError("credential registry unavailable".to_string())
            }
            LifecycleError::Signing(e) => {
                tracing::error!(error = %e, "Credential signing failure");
                AuthError::InternalError("credential signing failed".to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
