// ABOUTME: Security-header-enforcing response writers for JSON, HTML and redirects
// ABOUTME: Credential-bearing responses always carry the cache-suppression trio
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use handlebars::Handlebars;
use serde::Serialize;
use url::Url;

use crate::config::AUTHZ_FORM_TEMPLATE;

/// `Cache-Control: no-store`, `Pragma: no-cache`, `Expires: 0`.
fn suppress_caching(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

fn security_headers(headers: &mut HeaderMap, sts_max_age: Duration) {
    // max-age=0 is still emitted, as an explicit opt-out in development
    let sts = format!("max-age={}", sts_max_age.as_secs());
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_str(&sts).unwrap_or_else(|_| HeaderValue::from_static("max-age=0")),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
}

/// Serializes `data` as a JSON body. `cache` is false for every
/// credential-bearing response, switching the cache-suppression trio on.
pub fn json<T: Serialize>(status: StatusCode, data: &T, cache: bool) -> Response {
    let body = match serde_json::to_vec(data) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize JSON response body");
            return empty(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let length = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if !cache {
        suppress_caching(headers);
    }

    response
}

/// Renders the authorization form template bound to `data` and writes it
/// with the full security-header set. Template failures are logged and
/// degrade to an empty body rather than leaking an error page.
pub fn html<T: Serialize>(
    status: StatusCode,
    form: &Handlebars<'static>,
    data: &T,
    sts_max_age: Duration,
) -> Response {
    let body = match form.render(AUTHZ_FORM_TEMPLATE, data) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(error = %err, "failed to render authorization form");
            String::new()
        }
    };

    let length = body.len();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    security_headers(headers, sts_max_age);
    suppress_caching(headers);

    response
}

/// 302 to `url`, with caching suppressed so credential-bearing redirect
/// targets are never stored.
pub fn redirect(url: &Url) -> Response {
    let location = match HeaderValue::from_str(url.as_str()) {
        Ok(location) => location,
        Err(err) => {
            tracing::error!(error = %err, "redirect target is not a valid header value");
            return empty(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;

    let headers = response.headers_mut();
    headers.insert(header::LOCATION, location);
    suppress_caching(headers);

    response
}

/// Bodyless response with caching suppressed.
pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    suppress_caching(response.headers_mut());
    response
}
