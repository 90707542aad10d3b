// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

use crate::gateway::api::types::ApiError;
use crate::gateway::AppState;
use crate::media::constant_time_eq;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

/// Caller presented the shared trigger secret (or none is configured).
pub struct TriggerAuth;

/// Check `Authorization: Bearer <secret>` against `expected`.
pub fn bearer_matches(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token.trim().as_bytes(), expected.as_bytes()))
}

impl FromRequestParts<AppState> for TriggerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_matches(&parts.headers, state.trigger_secret.as_deref()) {
            Ok(TriggerAuth)
        } else {
            tracing::warn!(uri = %parts.uri, "rejected trigger call with missing or wrong secret");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Caller presented the shared service secret.
///
/// Fails closed: with no service secret configured, every call is refused.
pub struct ServiceAuth;

impl FromRequestParts<AppState> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.service_secret.as_deref() else {
            tracing::warn!(uri = %parts.uri, "rejected service call, no service secret configured");
            return Err(ApiError::Unauthorized);
        };
        if bearer_matches(&parts.headers, Some(secret)) {
            Ok(ServiceAuth)
        } else {
            tracing::warn!(uri = %parts.uri, "rejected service call with missing or wrong secret");
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn no_secret_configured_allows_everything() {
        assert!(bearer_matches(&HeaderMap::new(), None));
    }

    #[test]
    fn secret_must_match_exactly() {
        assert!(bearer_matches(&headers("Bearer hunter2"), Some("hunter2")));
        assert!(!bearer_matches(&headers("Bearer hunter3"), Some("hunter2")));
        assert!(!bearer_matches(&headers("hunter2"), Some("hunter2")));
        assert!(!bearer_matches(&HeaderMap::new(), Some("hunter2")));
    }
}
