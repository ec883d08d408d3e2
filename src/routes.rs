// ABOUTME: HTTP route assembly for the authorization and token endpoints
// ABOUTME: Builds an axum Router from the validated configuration; no global handler registries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::authorization::{authorize_consent, authorize_form};
use crate::config::Config;
use crate::middleware::resource_gate;
use crate::tokens::{issue_token, revoke_token};

/// Builds the protocol router:
///
/// - `GET {authz_endpoint}` renders the consent form
/// - `POST {authz_endpoint}` issues a grant or implicit access token
/// - `POST {token_endpoint}` issues and refreshes tokens
/// - `DELETE {token_endpoint}/:token` revokes a token (RFC 7009)
///
/// Unknown methods on these paths get the framework's 405.
pub fn oauth2_routes(config: Arc<Config>) -> Router {
    let revoke_path = format!("{}/:token", config.token_endpoint.trim_end_matches('/'));

    Router::new()
        .route(
            &config.authz_endpoint,
            get(authorize_form).post(authorize_consent),
        )
        .route(&config.token_endpoint, post(issue_token))
        .route(&revoke_path, delete(revoke_token))
        .with_state(config)
}

/// Wraps `router` with the resource gate so every route in it requires a
/// valid bearer token covering the resource's scopes.
pub fn protect(router: Router, config: Arc<Config>) -> Router {
    router.layer(from_fn_with_state(config, resource_gate))
}
