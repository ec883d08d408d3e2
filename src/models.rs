// ABOUTME: Core OAuth 2.0 data model: clients, scopes, grants, tokens and wire structs
// ABOUTME: Statuses are explicit enums with monotone transitions, lookups are Option-typed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// 3rd-party client application, registered out-of-band by the operator.
///
/// Immutable from the core's perspective; retrieved by id or authenticated
/// by credentials through the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier
    pub id: String,
    /// Display name shown on the consent form
    pub name: String,
    /// Description shown on the consent form
    pub description: String,
    /// Logo shown on the consent form
    pub logo_url: Option<Url>,
    /// Homepage, so resource owners can verify the client themselves
    pub homepage_url: Option<Url>,
    /// The single redirect URL registered for this client
    pub redirect_url: Url,
}

/// Named permission attached to grants and tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope identifier, e.g. "read"
    pub id: String,
    /// Description for the resource owner to understand what she authorizes
    pub description: String,
}

/// Joins scope ids with single spaces, preserving order.
#[must_use]
pub fn stringify_scopes(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(|scope| scope.id.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lifecycle of an authorization grant. Transitions are monotone along
/// `Active → {Used, Expired, Revoked}`; a grant never returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    /// Issued and exchangeable
    Active,
    /// Consumed by a successful token exchange; one-shot
    Used,
    /// Past its expiration time
    Expired,
    /// Withdrawn by the operator or a cascade revocation
    Revoked,
}

/// Single-use authorization code binding a client, a redirect URL and a
/// scope set to the resource owner's consent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Opaque, unguessable code value; unique for the lifetime of the system
    pub code: String,
    /// Client the code was issued to
    pub client_id: String,
    /// Redirect URL used in the originating authorization request
    pub redirect_url: Url,
    /// Scopes the resource owner consented to
    pub scopes: Vec<Scope>,
    /// Expiration instant; expiry is data, not a timer
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle status
    pub status: GrantStatus,
}

/// Lifecycle of an access or refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Valid for presentation
    Active,
    /// Past its expiration time
    Expired,
    /// Revoked through RFC 7009 or refresh rotation
    Revoked,
}

/// Opaque bearer credential. Access and refresh tokens share this shape
/// but live in distinct provider indexes; a value is never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Opaque access-token value; unique for the lifetime of the system
    pub value: String,
    /// Always "bearer"
    pub token_type: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Scopes carried by the token; always a subset of the originating grant's
    pub scopes: Vec<Scope>,
    /// Expiration instant, maintained by the provider
    pub expires_at: DateTime<Utc>,
    /// Lifetime in seconds at issuance, echoed on the wire as `expires_in`
    pub expires_in: i64,
    /// Refresh-token value issued alongside, when the grant allows one
    pub refresh_token: Option<String>,
    /// Current lifecycle status
    pub status: TokenStatus,
}

/// Token endpoint success body per RFC 6749 §5.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer token value
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    /// Seconds until expiry
    pub expires_in: i64,
    /// Refresh token, absent on implicit and client-credentials issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-joined scope ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<&Token> for TokenResponse {
    fn from(token: &Token) -> Self {
        let scope = if token.scopes.is_empty() {
            None
        } else {
            Some(stringify_scopes(&token.scopes))
        };

        Self {
            access_token: token.value.clone(),
            token_type: token.token_type.clone(),
            expires_in: token.expires_in,
            refresh_token: token.refresh_token.clone(),
            scope,
        }
    }
}

/// Authorization request parameters, from the query string on GET and the
/// form body on POST. Everything is optional here; the validation ladder
/// decides what each absence means.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    /// "code" or "token"
    pub response_type: Option<String>,
    /// Client identifier
    pub client_id: Option<String>,
    /// Redirect URL override; must equal the registered one
    pub redirect_uri: Option<String>,
    /// Space-separated scope ids
    pub scope: Option<String>,
    /// Client CSRF state; mandatory here
    pub state: Option<String>,
}

/// Token endpoint form body. Field relevance depends on `grant_type`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// One of `authorization_code`, `password`, `client_credentials`, `refresh_token`
    pub grant_type: Option<String>,
    /// Authorization code, for the `authorization_code` grant
    pub code: Option<String>,
    /// Resource owner username, for the `password` grant
    pub username: Option<String>,
    /// Resource owner password, for the `password` grant
    pub password: Option<String>,
    /// Space-separated scope ids
    pub scope: Option<String>,
    /// Refresh token value, for the `refresh_token` grant
    pub refresh_token: Option<String>,
}

/// Data binding for the consent form template.
///
/// Serialized field names are what the template sees: `client`, `scopes`,
/// `errors`, `grant_type` and `state`, plus the registered
/// `stringify_scopes` helper.
#[derive(Debug, Clone, Serialize)]
pub struct AuthzData {
    /// Client requesting authorization; absent on early validation errors
    pub client: Option<Client>,
    /// Scopes the client asked for, with descriptions
    pub scopes: Vec<Scope>,
    /// Errors to surface to the resource owner
    pub errors: Vec<crate::errors::AuthzError>,
    /// "code" or "token"
    pub grant_type: String,
    /// Client CSRF state, round-tripped through the form
    pub state: String,
}

impl AuthzData {
    /// Binding for an error-only render, before any request data is trusted.
    #[must_use]
    pub fn with_errors(errors: Vec<crate::errors::AuthzError>) -> Self {
        Self {
            client: None,
            scopes: Vec::new(),
            errors,
            grant_type: String::new(),
            state: String::new(),
        }
    }
}
