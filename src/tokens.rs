// ABOUTME: Token endpoint: client authentication, the four grant types and RFC 7009 revocation
// ABOUTME: Implements RFC 6749 sections 4.1.3, 4.3, 4.4, 5 and 6 over the provider seam
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::Config;
use crate::errors::AuthzError;
use crate::models::{Client, GrantStatus, Scope, TokenRequest, TokenResponse};
use crate::render;

/// POST handler: authenticates the client, then dispatches on `grant_type`.
pub async fn issue_token(
    State(config): State<Arc<Config>>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let client = match authenticate_client(&config, &headers).await {
        Ok(client) => client,
        Err(response) => return response,
    };

    match request.grant_type.as_deref() {
        Some("authorization_code") => authorization_code_grant(&config, &client, &request).await,
        Some("password") => owner_credentials_grant(&config, &client, &request).await,
        Some("client_credentials") => client_credentials_grant(&config, &client, &request).await,
        Some("refresh_token") => refresh_token_grant(&config, &client, &request).await,
        _ => render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::unsupported_grant_type(),
            false,
        ),
    }
}

/// DELETE handler: RFC 7009 revocation with the token value as the final
/// path segment. Idempotent; no `token_type_hint` handling since token
/// values are unique across both indexes.
pub async fn revoke_token(
    State(config): State<Arc<Config>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Response {
    let client = match authenticate_client(&config, &headers).await {
        Ok(client) => client,
        Err(response) => return response,
    };

    let stored = match config.provider.token_info(&token).await {
        Ok(Some(stored)) => stored,
        // Already absent: revocation is idempotent.
        Ok(None) => return render::empty(StatusCode::OK),
        Err(err) => {
            tracing::error!(error = %err, "failed to look token up for revocation");
            return render::empty(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    if stored.client_id != client.id {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::client_id_mismatch(),
            false,
        );
    }

    match config.provider.revoke_token(&token).await {
        Ok(()) => render::empty(StatusCode::OK),
        Err(err) => {
            tracing::error!(error = %err, "failed to revoke token");
            render::empty(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// HTTP-Basic client authentication, mandatory for every token-endpoint
/// request. Failure is a 400 per RFC 6749 §5.2 (401 is only required when
/// the `Authorization` header scheme itself is being challenged).
async fn authenticate_client(
    config: &Arc<Config>,
    headers: &HeaderMap,
) -> Result<Client, Response> {
    let unauthorized = || {
        render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::unauthorized_client(),
            false,
        )
    };

    let Some((username, password)) = basic_credentials(headers) else {
        return Err(unauthorized());
    };

    match config
        .provider
        .authenticate_client(&username, &password)
        .await
    {
        Ok(Some(client)) => Ok(client),
        Ok(None) => Err(unauthorized()),
        Err(err) => {
            tracing::error!(error = %err, "client authentication failed in provider");
            Err(unauthorized())
        }
    }
}

/// Extracts `Basic` credentials from the `Authorization` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}

/// RFC 6749 §4.1.3/§4.1.4: exchange an authorization code for an
/// access+refresh pair.
///
/// `client_id` and `redirect_uri` form fields are ignored: the client is
/// always authenticated, and the redirect URL is the static registered one.
async fn authorization_code_grant(
    config: &Arc<Config>,
    client: &Client,
    request: &TokenRequest,
) -> Response {
    let Some(code) = request.code.as_deref().filter(|code| !code.is_empty()) else {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::unauthorized_client()
                .with_description("Authorization code can't be empty."),
            false,
        );
    };

    let grant = match config.provider.grant_info(code).await {
        Ok(Some(grant)) => grant,
        Ok(None) => {
            return render::json(StatusCode::BAD_REQUEST, &AuthzError::invalid_grant(), false);
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to look grant up");
            return render::json(StatusCode::BAD_REQUEST, &AuthzError::invalid_grant(), false);
        }
    };

    // Replay detection: one-shot codes are rejected on any second use.
    if grant.status != GrantStatus::Active {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::invalid_grant()
                .with_description("Grant code was revoked, expired or already used."),
            false,
        );
    }

    if client.redirect_url.as_str() != grant.redirect_url.as_str() {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::invalid_grant()
                .with_description("Grant code was generated for a different redirect URI."),
            false,
        );
    }

    // Should not happen when the provider does its work properly, but it
    // is checked anyway.
    if grant.client_id != client.id {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::invalid_grant()
                .with_description("Grant code was generated for a different client ID."),
            false,
        );
    }

    match config
        .provider
        .gen_token(
            Some(&grant),
            client,
            &grant.scopes,
            true,
            config.token_expiration,
        )
        .await
    {
        Ok(token) => render::json(StatusCode::OK, &TokenResponse::from(&token), false),
        Err(err) => render::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &AuthzError::server_error(None, &err),
            false,
        ),
    }
}

/// RFC 6749 §4.3: resource-owner password credentials.
async fn owner_credentials_grant(
    config: &Arc<Config>,
    client: &Client,
    request: &TokenRequest,
) -> Response {
    let username = request.username.as_deref().unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();

    if !config.provider.authenticate_user(username, password).await {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::unauthorized_user(),
            false,
        );
    }

    let scopes = match requested_scopes(config, request).await {
        Ok(scopes) => scopes,
        Err(response) => return response,
    };

    match config
        .provider
        .gen_token(None, client, &scopes, true, config.token_expiration)
        .await
    {
        Ok(token) => render::json(StatusCode::OK, &TokenResponse::from(&token), false),
        Err(err) => render::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &AuthzError::server_error(None, &err),
            false,
        ),
    }
}

/// RFC 6749 §4.4: client credentials. The client is already authenticated;
/// no refresh token is issued (§4.4.3).
async fn client_credentials_grant(
    config: &Arc<Config>,
    client: &Client,
    request: &TokenRequest,
) -> Response {
    let scopes = match requested_scopes(config, request).await {
        Ok(scopes) => scopes,
        Err(response) => return response,
    };

    match config
        .provider
        .gen_token(None, client, &scopes, false, config.token_expiration)
        .await
    {
        Ok(token) => render::json(StatusCode::OK, &TokenResponse::from(&token), false),
        Err(err) => render::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &AuthzError::server_error(None, &err),
            false,
        ),
    }
}

/// RFC 6749 §6: refresh an access token with mandatory rotation.
async fn refresh_token_grant(
    config: &Arc<Config>,
    client: &Client,
    request: &TokenRequest,
) -> Response {
    let value = request.refresh_token.as_deref().unwrap_or_default();

    let stored = match config.provider.token_info(value).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            return render::json(StatusCode::BAD_REQUEST, &AuthzError::invalid_grant(), false);
        }
        Err(err) => {
            return render::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &AuthzError::server_error(None, &err),
                false,
            );
        }
    };

    // The requested scope must not include any scope not originally
    // granted; when omitted it is treated as equal to the original.
    let requested = match requested_scopes(config, request).await {
        Ok(scopes) => scopes,
        Err(response) => return response,
    };

    let scopes = if requested.is_empty() {
        stored.scopes.clone()
    } else {
        let granted: HashSet<&str> = stored.scopes.iter().map(|s| s.id.as_str()).collect();
        if requested.iter().any(|s| !granted.contains(s.id.as_str())) {
            return render::json(StatusCode::BAD_REQUEST, &AuthzError::invalid_scope(), false);
        }
        requested
    };

    if stored.client_id != client.id {
        return render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::client_id_mismatch(),
            false,
        );
    }

    match config.provider.refresh_token(&stored, &scopes).await {
        Ok(token) => render::json(StatusCode::OK, &TokenResponse::from(&token), false),
        Err(err) => render::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &AuthzError::server_error(None, &err),
            false,
        ),
    }
}

/// Parses the optional `scope` form field. An absent scope yields an empty
/// set; the caller decides what that means for its grant type.
async fn requested_scopes(
    config: &Arc<Config>,
    request: &TokenRequest,
) -> Result<Vec<Scope>, Response> {
    let Some(scope) = request.scope.as_deref().filter(|scope| !scope.is_empty()) else {
        return Ok(Vec::new());
    };

    config.provider.scopes_info(scope).await.map_err(|err| {
        render::json(
            StatusCode::BAD_REQUEST,
            &AuthzError::server_error(None, &err),
            false,
        )
    })
}
