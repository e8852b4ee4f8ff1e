// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request gatekeeper for protected routes.
//!
//! ## Credentials read from the request
//!
//! - Access token: `Authorization: Bearer <token>`
//! - Refresh token (optional): `X-Refresh-Token: <token>` header, falling back
//!   to the `refresh_token` cookie
//!
//! ## Outcomes
//!
//! | Lifecycle result | Response |
//! |------------------|----------|
//! | No access token | 401 |
//! | Credential under a scheme other than `Bearer` | 403 |
//! | Invalid / expired-and-unrecoverable | 403 |
//! | Admitted | handler runs with [`Principal`] in request extensions |
//!
//! ## Side effect: credential rotation
//!
//! When the access token has expired but the refresh token is still good, the
//! request is admitted **and the response carries replacement credentials**:
//!
//! - `Authorization: Bearer <new access token>`
//! - `X-Refresh-Token: <new refresh token>`
//! - `Set-Cookie: refresh_token=<new refresh token>; HttpOnly; SameSite=Strict; Path=/`
//!
//! The refresh token presented with the request is consumed by this; clients
//! must adopt the new pair.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/posts", get(list_posts))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{AuthError, TokenPair};
use crate::state::AppState;

/// Header carrying the refresh token on requests and rotated responses.
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-refresh-token");

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Gatekeeper middleware for protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let access = match bearer_token(request.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };
    let refresh = refresh_token(request.headers());

    let admission = match state.lifecycle.verify(access.as_deref(), refresh.as_deref()) {
        Ok(admission) => admission,
        Err(e) => return AuthError::from(e).into_response(),
    };

    request.extensions_mut().insert(admission.principal);
    let mut response = next.run(request).await;

    if let Some(pair) = admission.rotated {
        attach_rotated_credentials(response.headers_mut(), &pair);
    }
    response
}

/// Extract the bearer token from the `Authorization` header.
///
/// The scheme is matched case-insensitively. A missing header or an empty
/// token is `Ok(None)`; a credential under any other scheme, or a header that
/// is not visible ASCII, was presented but cannot be used and is rejected as
/// invalid.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| AuthError::CredentialInvalid)?.trim();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    let token = token.trim();

    if token.is_empty() {
        return Ok(None);
    }
    if !scheme.eq_ignore_ascii_case("Bearer") {
        debug!(scheme, "Authorization header uses an unsupported scheme");
        return Err(AuthError::CredentialInvalid);
    }
    Ok(Some(token.to_string()))
}

/// Extract the refresh token from the dedicated header or the cookie.
pub fn refresh_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(&REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .or_else(|| get_cookie(headers, REFRESH_TOKEN_COOKIE))
}

/// Find a cookie by name across all `Cookie` headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Put replacement credentials on an outgoing response.
pub fn attach_rotated_credentials(headers: &mut HeaderMap, pair: &TokenPair) {
    let bearer = HeaderValue::from_str(&format!("Bearer {}", pair.access_token));
    let refresh = HeaderValue::from_str(&pair.refresh_token);
    let cookie = HeaderValue::from_str(&format!(
        "{REFRESH_TOKEN_COOKIE}={}; HttpOnly; SameSite=Strict; Path=/",
        pair.refresh_token
    ));

    match (bearer, refresh, cookie) {
        (Ok(bearer), Ok(refresh), Ok(cookie)) => {
            headers.insert(AUTHORIZATION, bearer);
            headers.insert(REFRESH_TOKEN_HEADER, refresh);
            headers.append(SET_COOKIE, cookie);
        }
        _ => warn!("Rotated credentials are not valid header values; not attached"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::StatusCode, routing::get, Extension, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::Principal;
    use crate::state::testing::{test_state, ACCESS_TTL};

    async fn whoami(Extension(principal): Extension<Principal>) -> String {
        principal.name
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    fn request(access: Option<&str>, refresh_cookie: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(access) = access {
            builder = builder.header(AUTHORIZATION, format!("Bearer {access}"));
        }
        if let Some(refresh) = refresh_cookie {
            builder = builder.header(COOKIE, format!("theme=dark; {REFRESH_TOKEN_COOKIE}={refresh}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Ok(None)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap().as_deref(), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Ok(None)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap().as_deref(), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("BEARER  abc.def.ghi "));
        assert_eq!(bearer_token(&headers).unwrap().as_deref(), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::CredentialInvalid)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert!(matches!(bearer_token(&headers), Ok(None)));
    }

    #[test]
    fn refresh_token_prefers_header_over_cookie() {
        let mut headers = HeaderMap::new();
        assert!(refresh_token(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("a=1; refresh_token=from-cookie"));
        assert_eq!(refresh_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(REFRESH_TOKEN_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(refresh_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn get_cookie_ignores_similar_names() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("xrefresh_token=nope; refresh_token="));
        assert!(get_cookie(&headers, REFRESH_TOKEN_COOKIE).is_none());
    }

    #[tokio::test]
    async fn missing_access_token_is_401() {
        let (state, _clock) = test_state();
        let response = app(state).oneshot(request(None, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_access_token_is_403() {
        let (state, _clock) = test_state();
        let response = app(state)
            .oneshot(request(Some("garbage"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    fn request_with_authorization(value: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/whoami")
            .header(AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn other_auth_schemes_are_403() {
        let (state, _clock) = test_state();
        let app = app(state);

        for value in ["Basic dXNlcjpwYXNz", "Token garbage"] {
            let response = app
                .clone()
                .oneshot(request_with_authorization(value))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{value}");
        }
    }

    #[tokio::test]
    async fn bearer_scheme_is_case_insensitive() {
        let (state, _clock) = test_state();
        let pair = state
            .lifecycle
            .login(&Principal::new("alice").unwrap())
            .unwrap();

        let response = app(state)
            .oneshot(request_with_authorization(&format!("bearer {}", pair.access_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn valid_access_token_is_admitted_without_rotation() {
        let (state, _clock) = test_state();
        let pair = state
            .lifecycle
            .login(&Principal::new("alice").unwrap())
            .unwrap();

        let response = app(state)
            .oneshot(request(Some(&pair.access_token), Some(&pair.refresh_token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(AUTHORIZATION).is_none());
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn expired_access_with_refresh_cookie_rotates() {
        let (state, clock) = test_state();
        let pair = state
            .lifecycle
            .login(&Principal::new("alice").unwrap())
            .unwrap();
        clock.advance(ACCESS_TTL + Duration::from_secs(1));

        let response = app(state)
            .oneshot(request(Some(&pair.access_token), Some(&pair.refresh_token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let new_access = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .expect("rotated access token");
        assert_ne!(new_access, pair.access_token);

        let new_refresh = response
            .headers()
            .get(&REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .expect("rotated refresh token");
        assert_ne!(new_refresh, pair.refresh_token);

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with(&format!("{REFRESH_TOKEN_COOKIE}={new_refresh};")));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn expired_access_without_refresh_is_403() {
        let (state, clock) = test_state();
        let pair = state
            .lifecycle
            .login(&Principal::new("alice").unwrap())
            .unwrap();
        clock.advance(ACCESS_TTL);

        let response = app(state)
            .oneshot(request(Some(&pair.access_token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
