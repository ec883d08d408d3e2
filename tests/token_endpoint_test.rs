// ABOUTME: Integration tests for the token endpoint grant types and RFC 7009 revocation
// ABOUTME: Covers replay protection, refresh rotation, scope narrowing and client binding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{
    basic_auth, body_string, obtain_authz_code, send, setup, token_request, CLIENT_ID,
    CLIENT_SECRET, OTHER_CLIENT_ID, OTHER_CLIENT_SECRET, PASSWORD, TOKEN_ENDPOINT, USERNAME,
};
use oauth2_core::errors::AuthzError;
use oauth2_core::models::TokenResponse;
use oauth2_core::provider::Provider as _;
use oauth2_core::routes::oauth2_routes;

async fn token_json(response: axum::http::Response<Body>) -> TokenResponse {
    serde_json::from_str(&body_string(response).await).unwrap()
}

async fn error_json(response: axum::http::Response<Body>) -> AuthzError {
    serde_json::from_str(&body_string(response).await).unwrap()
}

// =============================================================================
// Authorization-code exchange (RFC 6749 §4.1.3, §4.1.4)
// =============================================================================

#[tokio::test]
async fn authorization_code_exchanges_for_a_token_pair() {
    let (_provider, config) = setup();
    let code = obtain_authz_code(&config).await;

    let response = send(
        oauth2_routes(config),
        token_request("authorization_code", &[("code", &code)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
    assert_eq!(headers.get(header::EXPIRES).unwrap(), "0");

    let token = token_json(response).await;
    assert_eq!(token.token_type, "bearer");
    assert_eq!(token.expires_in, 600);
    assert!(!token.access_token.is_empty());
    assert!(token.refresh_token.is_some());
    assert_eq!(token.scope.as_deref(), Some("read write identity"));
}

#[tokio::test]
async fn authorization_code_cannot_be_replayed() {
    let (_provider, config) = setup();
    let code = obtain_authz_code(&config).await;

    let response = send(
        oauth2_routes(config.clone()),
        token_request("authorization_code", &[("code", &code)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = token_json(response).await;
    assert_eq!(token.token_type, "bearer");
    assert_eq!(token.expires_in, 600);

    // Second exchange of the same code must fail closed (§4.1.4).
    let response = send(
        oauth2_routes(config),
        token_request("authorization_code", &[("code", &code)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = error_json(response).await;
    assert_eq!(error.code.as_str(), "invalid_grant");
    assert_eq!(
        error.description,
        "Grant code was revoked, expired or already used."
    );
}

#[tokio::test]
async fn empty_authorization_code_is_rejected() {
    let (_provider, config) = setup();

    let response = send(
        oauth2_routes(config),
        token_request("authorization_code", &[]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = error_json(response).await;
    assert_eq!(error.code.as_str(), "unauthorized_client");
    assert_eq!(error.description, "Authorization code can't be empty.");
}

#[tokio::test]
async fn unknown_authorization_code_is_an_invalid_grant() {
    let (_provider, config) = setup();

    let response = send(
        oauth2_routes(config),
        token_request("authorization_code", &[("code", "no-such-code")]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_json(response).await.code.as_str(), "invalid_grant");
}

#[tokio::test]
async fn code_issued_to_another_client_is_rejected() {
    let (_provider, config) = setup();
    let code = obtain_authz_code(&config).await;

    let mut request = token_request("authorization_code", &[("code", &code)]);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth(OTHER_CLIENT_ID, OTHER_CLIENT_SECRET)
            .parse()
            .unwrap(),
    );

    let response = send(oauth2_routes(config), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_json(response).await.code.as_str(), "invalid_grant");
}

// =============================================================================
// Client authentication
// =============================================================================

#[tokio::test]
async fn missing_client_credentials_are_rejected() {
    let (_provider, config) = setup();

    let mut request = token_request("client_credentials", &[]);
    request.headers_mut().remove(header::AUTHORIZATION);

    let response = send(oauth2_routes(config), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = error_json(response).await;
    assert_eq!(error.code.as_str(), "unauthorized_client");
}

#[tokio::test]
async fn wrong_client_secret_is_rejected() {
    let (_provider, config) = setup();

    let mut request = token_request("client_credentials", &[]);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth(CLIENT_ID, "wrong_secret").parse().unwrap(),
    );

    let response = send(oauth2_routes(config), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_json(response).await.code.as_str(),
        "unauthorized_client"
    );
}

#[tokio::test]
async fn unknown_grant_type_is_rejected() {
    let (_provider, config) = setup();

    let response = send(oauth2_routes(config), token_request("saml2_bearer", &[])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_json(response).await.code.as_str(),
        "unsupported_grant_type"
    );
}

// =============================================================================
// Resource-owner password credentials (RFC 6749 §4.3)
// =============================================================================

#[tokio::test]
async fn password_grant_issues_a_token_pair() {
    let (_provider, config) = setup();

    let response = send(
        oauth2_routes(config),
        token_request(
            "password",
            &[
                ("username", USERNAME),
                ("password", PASSWORD),
                ("scope", "read write"),
            ],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = token_json(response).await;
    assert_eq!(token.token_type, "bearer");
    assert!(token.refresh_token.is_some());
    assert_eq!(token.scope.as_deref(), Some("read write"));
}

#[tokio::test]
async fn password_grant_rejects_bad_owner_credentials() {
    let (_provider, config) = setup();

    let response = send(
        oauth2_routes(config),
        token_request(
            "password",
            &[("username", USERNAME), ("password", "not-the-password")],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = error_json(response).await;
    assert_eq!(error.code.as_str(), "access_denied");
    assert_eq!(error.description, "Resource owner credentials are invalid.");
}

// =============================================================================
// Client credentials (RFC 6749 §4.4)
// =============================================================================

#[tokio::test]
async fn client_credentials_grant_never_issues_a_refresh_token() {
    let (_provider, config) = setup();

    let response = send(
        oauth2_routes(config),
        token_request("client_credentials", &[("scope", "read")]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(!body.contains("refresh_token"));

    let token: TokenResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(token.token_type, "bearer");
    assert!(token.refresh_token.is_none());
}

// =============================================================================
// Refresh (RFC 6749 §6)
// =============================================================================

async fn obtain_token_pair(config: &std::sync::Arc<oauth2_core::Config>) -> TokenResponse {
    let code = obtain_authz_code(config).await;
    let response = send(
        oauth2_routes(config.clone()),
        token_request("authorization_code", &[("code", &code)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    token_json(response).await
}

#[tokio::test]
async fn refresh_rotates_the_pair_and_invalidates_the_old_refresh_token() {
    let (_provider, config) = setup();
    let original = obtain_token_pair(&config).await;
    let refresh = original.refresh_token.clone().unwrap();

    let response = send(
        oauth2_routes(config.clone()),
        token_request("refresh_token", &[("refresh_token", &refresh)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = token_json(response).await;
    assert_ne!(rotated.access_token, original.access_token);
    assert!(rotated.refresh_token.is_some());
    assert_ne!(rotated.refresh_token.as_deref(), Some(refresh.as_str()));
    // Scope is inherited unchanged when the request omits it.
    assert_eq!(rotated.scope, original.scope);

    // Rotation is mandatory: the old refresh token is no longer redeemable.
    let response = send(
        oauth2_routes(config),
        token_request("refresh_token", &[("refresh_token", &refresh)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_json(response).await.code.as_str(), "invalid_grant");
}

#[tokio::test]
async fn refresh_may_narrow_but_never_widen_scope() {
    let (_provider, config) = setup();
    let original = obtain_token_pair(&config).await;
    let refresh = original.refresh_token.unwrap();

    let response = send(
        oauth2_routes(config.clone()),
        token_request(
            "refresh_token",
            &[("refresh_token", &refresh), ("scope", "read")],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let narrowed = token_json(response).await;
    assert_eq!(narrowed.scope.as_deref(), Some("read"));

    // Widening past the narrowed set is an invalid_scope.
    let rotated = narrowed.refresh_token.unwrap();
    let response = send(
        oauth2_routes(config),
        token_request(
            "refresh_token",
            &[("refresh_token", &rotated), ("scope", "read admin")],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_json(response).await.code.as_str(), "invalid_scope");
}

#[tokio::test]
async fn refresh_token_is_bound_to_the_issuing_client() {
    let (_provider, config) = setup();
    let original = obtain_token_pair(&config).await;
    let refresh = original.refresh_token.unwrap();

    let mut request = token_request("refresh_token", &[("refresh_token", &refresh)]);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth(OTHER_CLIENT_ID, OTHER_CLIENT_SECRET)
            .parse()
            .unwrap(),
    );

    let response = send(oauth2_routes(config), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = error_json(response).await;
    assert_eq!(error.code.as_str(), "invalid_request");
    assert_eq!(
        error.description,
        "Authenticated client did not generate token used."
    );
}

// =============================================================================
// Revocation (RFC 7009)
// =============================================================================

fn revoke_request(token: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("{TOKEN_ENDPOINT}/{token}"))
        .header(header::AUTHORIZATION, authorization.to_owned())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn revocation_is_idempotent() {
    let (provider, config) = setup();
    let token = obtain_token_pair(&config).await;
    let authorization = basic_auth(CLIENT_ID, CLIENT_SECRET);

    let response = send(
        oauth2_routes(config.clone()),
        revoke_request(&token.access_token, &authorization),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(provider
        .token_info(&token.access_token)
        .await
        .unwrap()
        .is_none());

    // Revoking the already-absent value succeeds with the same status.
    let response = send(
        oauth2_routes(config),
        revoke_request(&token.access_token, &authorization),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn revocation_requires_the_owning_client() {
    let (provider, config) = setup();
    let token = obtain_token_pair(&config).await;

    let response = send(
        oauth2_routes(config),
        revoke_request(
            &token.access_token,
            &basic_auth(OTHER_CLIENT_ID, OTHER_CLIENT_SECRET),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_json(response).await.code.as_str(),
        "invalid_request"
    );

    // The token survives the failed revocation.
    assert!(provider
        .token_info(&token.access_token)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn revocation_requires_client_authentication() {
    let (_provider, config) = setup();
    let token = obtain_token_pair(&config).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("{TOKEN_ENDPOINT}/{}", token.access_token))
        .body(Body::empty())
        .unwrap();

    let response = send(oauth2_routes(config), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_json(response).await.code.as_str(),
        "unauthorized_client"
    );
}
