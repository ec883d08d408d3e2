// ABOUTME: Bearer-token middleware gating protected resources per RFC 6749 section 7 and RFC 6750
// ABOUTME: Validates token status and scope coverage before the downstream handler runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::config::Config;
use crate::errors::AuthzError;
use crate::models::TokenStatus;
use crate::render;

/// Upper bound on a form body the gate is willing to buffer while looking
/// for an `access_token` parameter.
const FORM_BODY_LIMIT: usize = 1 << 20;

/// Resource-gate middleware. Wrap a downstream router with
/// `axum::middleware::from_fn_with_state(config, resource_gate)` or use
/// [`crate::routes::protect`].
///
/// Accepts the token from the `Authorization: Bearer` header, the
/// `access_token` query parameter, or an `application/x-www-form-urlencoded`
/// body parameter (RFC 6750 §2). Requests with no authentication
/// information at all get a bare 401 without an error code (§3.1).
pub async fn resource_gate(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Response {
    let bearer = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => Some(token.to_owned()),
            None => {
                return challenge(
                    StatusCode::UNAUTHORIZED,
                    Some(&AuthzError::unsupported_token_type()),
                );
            }
        },
        None => None,
    };

    let (token, request) = match bearer {
        Some(token) => (token, request),
        None => form_token(request).await,
    };

    if token.is_empty() {
        // The request lacks any authentication information; RFC 6750 §3.1
        // says the response SHOULD NOT include an error code.
        return challenge(StatusCode::UNAUTHORIZED, None);
    }

    let info = match config.provider.token_info(&token).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            return challenge(StatusCode::UNAUTHORIZED, Some(&AuthzError::invalid_token()));
        }
        Err(err) => {
            return challenge(
                StatusCode::UNAUTHORIZED,
                Some(&AuthzError::server_error(None, &err)),
            );
        }
    };

    if info.status != TokenStatus::Active {
        return challenge(StatusCode::UNAUTHORIZED, Some(&AuthzError::invalid_token()));
    }

    let required = match config.provider.resource_scopes(request.uri()).await {
        Ok(required) => required,
        Err(err) => {
            return challenge(
                StatusCode::UNAUTHORIZED,
                Some(&AuthzError::server_error(None, &err)),
            );
        }
    };

    // RFC 6750 §3.1: every scope the resource requires must be carried by
    // the token.
    let carried: HashSet<&str> = info.scopes.iter().map(|s| s.id.as_str()).collect();
    if required.iter().any(|s| !carried.contains(s.id.as_str())) {
        return challenge(
            StatusCode::FORBIDDEN,
            Some(&AuthzError::insufficient_scope()),
        );
    }

    next.run(request).await
}

/// Looks for an `access_token` parameter in the query string, then in a
/// form-encoded body. The body is buffered and handed back so the
/// downstream handler can still read it.
async fn form_token(request: Request) -> (String, Request) {
    if let Some(query) = request.uri().query() {
        if let Some(token) = form_value(query, "access_token") {
            return (token, request);
        }
    }

    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return (String::new(), request);
    }

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, FORM_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "failed to buffer form body while extracting bearer token");
            Default::default()
        }
    };

    let token = std::str::from_utf8(&bytes)
        .ok()
        .and_then(|encoded| form_value(encoded, "access_token"))
        .unwrap_or_default();

    (token, Request::from_parts(parts, Body::from(bytes)))
}

fn form_value(encoded: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.into_owned())
}

/// 401/403 response. Every 401 carries the `WWW-Authenticate: Bearer`
/// challenge of RFC 6750 §3.
fn challenge(status: StatusCode, error: Option<&AuthzError>) -> Response {
    let mut response = match error {
        Some(error) => render::json(status, error, false),
        None => render::empty(status),
    };

    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }

    response
}
