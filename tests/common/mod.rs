// ABOUTME: Shared fixtures for the integration test suite
// ABOUTME: Builds a configured router over the in-memory provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use oauth2_core::config::{Config, ConfigBuilder};
use oauth2_core::models::Client;
use oauth2_core::providers::MemoryProvider;
use oauth2_core::routes::oauth2_routes;
use tower::ServiceExt;
use url::Url;

pub const CLIENT_ID: &str = "test_client_id";
pub const CLIENT_SECRET: &str = "test_client_secret";
pub const REDIRECT_URL: &str = "https://example.com/oauth2/callback";
pub const OTHER_CLIENT_ID: &str = "other_client_id";
pub const OTHER_CLIENT_SECRET: &str = "other_client_secret";
pub const LOGIN_URL: &str = "https://api.hooklift.io/accounts/login";
pub const AUTHZ_ENDPOINT: &str = "https://example.com/oauth2/authzs";
pub const TOKEN_ENDPOINT: &str = "https://example.com/oauth2/tokens";
pub const USERNAME: &str = "resource_owner";
pub const PASSWORD: &str = "owner_password";

pub const AUTHZ_FORM: &str = r#"
<html>
    <body>
    {{#if errors}}
        <div id="errors">
            <ul>
            {{#each errors}}
                <li>{{error}}: {{error_description}}</li>
            {{/each}}
            </ul>
        </div>
    {{else}}
        <div id="client">
            <h2>{{client.name}}</h2>
            <h3>{{client.description}}</h3>
            <a href="{{client.homepage_url}}">
                <figure><img src="{{client.logo_url}}"/></figure>
            </a>
        </div>
        <div id="scopes">
            <ul>
                {{#each scopes}}
                    <li>{{id}}: {{description}}</li>
                {{/each}}
            </ul>
        </div>
        <form>
         <input type="hidden" name="client_id" value="{{client.id}}"/>
         <input type="hidden" name="response_type" value="{{grant_type}}"/>
         <input type="hidden" name="redirect_uri" value="{{client.redirect_url}}"/>
         <input type="hidden" name="scope" value="{{stringify_scopes scopes}}"/>
         <input type="hidden" name="state" value="{{state}}"/>
        </form>
    {{/if}}
    </body>
</html>
"#;

pub fn test_client() -> Client {
    Client {
        id: CLIENT_ID.to_owned(),
        name: "Test Client".to_owned(),
        description: "An application under test".to_owned(),
        logo_url: Some(Url::parse("https://example.com/logo.png").unwrap()),
        homepage_url: Some(Url::parse("https://example.com").unwrap()),
        redirect_url: Url::parse(REDIRECT_URL).unwrap(),
    }
}

fn other_client() -> Client {
    Client {
        id: OTHER_CLIENT_ID.to_owned(),
        name: "Other Client".to_owned(),
        description: "A different application".to_owned(),
        logo_url: None,
        homepage_url: None,
        redirect_url: Url::parse("https://other.example.com/oauth2/callback").unwrap(),
    }
}

/// Provider and configuration mirroring the production wiring, with the
/// resource owner's session state under test control.
pub fn setup_with(user_authenticated: bool) -> (Arc<MemoryProvider>, Arc<Config>) {
    oauth2_core::logging::init_with_filter("warn");

    let provider = Arc::new(
        MemoryProvider::new()
            .with_client(test_client(), CLIENT_SECRET)
            .with_client(other_client(), OTHER_CLIENT_SECRET)
            .with_user(USERNAME, PASSWORD)
            .with_scope("read", "Read access to your resources")
            .with_scope("write", "Write access to your resources")
            .with_scope("identity", "Access to your profile")
            .with_scope("admin", "Administrative access")
            .with_resource("/protected_resource", &["read", "write", "identity"])
            .with_resource("/admin", &["admin"])
            .with_user_authenticated(user_authenticated),
    );

    let config = Arc::new(
        ConfigBuilder::new()
            .authz_form(AUTHZ_FORM)
            .provider(provider.clone())
            .login_url(Url::parse(LOGIN_URL).unwrap(), "redirect_to")
            .sts_max_age(Duration::from_secs(0))
            .token_expiration(Duration::from_secs(600))
            .authz_expiration(Duration::from_secs(60))
            .build()
            .unwrap(),
    );

    (provider, config)
}

pub fn setup() -> (Arc<MemoryProvider>, Arc<Config>) {
    setup_with(true)
}

/// Standard authorization request query, RFC 6749 §4.1.1.
pub fn authorize_query(response_type: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", CLIENT_ID)
        .append_pair("response_type", response_type)
        .append_pair("state", "state-test")
        .append_pair("redirect_uri", REDIRECT_URL)
        .append_pair("scope", "read write identity")
        .finish()
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Drives the full consent POST and returns the issued authorization code.
pub async fn obtain_authz_code(config: &Arc<Config>) -> String {
    let request = Request::builder()
        .method("POST")
        .uri(AUTHZ_ENDPOINT)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(authorize_query("code")))
        .unwrap();

    let response = send(oauth2_routes(config.clone()), request).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let url = Url::parse(location).unwrap();

    let code = url
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    assert!(!code.is_empty());

    code
}

/// Exchanges an authorization code at the token endpoint.
pub fn token_request(grant_type: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("grant_type", grant_type);
    for (key, value) in pairs {
        form.append_pair(key, value);
    }

    Request::builder()
        .method("POST")
        .uri(TOKEN_ENDPOINT)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, basic_auth(CLIENT_ID, CLIENT_SECRET))
        .body(Body::from(form.finish()))
        .unwrap()
}
