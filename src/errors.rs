// ABOUTME: OAuth 2.0 error taxonomy and wire encodings for JSON and redirect-URI delivery
// ABOUTME: Implements RFC 6749 sections 4.1.2.1, 4.2.2.1 and 5.2 error responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Closed set of protocol error codes. Anything outside this set is an
/// internal bug and maps to [`ErrorCode::ServerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing, duplicate or malformed request parameter
    InvalidRequest,
    /// Client authentication failed, missing, or unknown client
    UnauthorizedClient,
    /// Resource owner or server denied the request
    AccessDenied,
    /// `response_type` not in {"code", "token"}
    UnsupportedResponseType,
    /// Requested scope exceeds what was originally granted
    InvalidScope,
    /// Provider failure or unexpected internal condition
    ServerError,
    /// Token endpoint received an unknown `grant_type`
    UnsupportedGrantType,
    /// Authorization code missing, expired, revoked, used or mismatched
    InvalidGrant,
    /// Bearer token expired, revoked, or of an unsupported type
    InvalidToken,
    /// Token scopes do not cover the requested resource
    InsufficientScope,
}

impl ErrorCode {
    /// Wire representation of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidToken => "invalid_token",
            Self::InsufficientScope => "insufficient_scope",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol error as delivered to clients and resource owners.
///
/// Carries its own wire representation: the JSON body shape of RFC 6749 §5.2
/// and the redirect-URI encodings of §4.1.2.1 (query) and §4.2.2.1
/// (fragment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzError {
    /// Error code from the closed set
    #[serde(rename = "error")]
    pub code: ErrorCode,
    /// Human-readable description for the developer of the failing client
    #[serde(rename = "error_description")]
    pub description: String,
    /// Optional URI with further error information
    #[serde(rename = "error_uri", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Client CSRF state, echoed back when it was already validated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthzError {
    /// Effective redirect URL does not string-equal the registered one.
    #[must_use]
    pub fn redirect_url_mismatch() -> Self {
        Self {
            code: ErrorCode::AccessDenied,
            description: "3rd-party client app provided a redirect_uri that does not match \
                          the URI registered for this client in our database."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Redirect URL failed to parse or is not HTTPS.
    #[must_use]
    pub fn redirect_url_invalid() -> Self {
        Self {
            code: ErrorCode::AccessDenied,
            description: "3rd-party client app provided an invalid redirect_uri. It does not \
                          comply with http://tools.ietf.org/html/rfc3986#section-4.3 or does \
                          not use HTTPS."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Authorization request arrived without a `client_id`.
    #[must_use]
    pub fn client_id_missing() -> Self {
        Self {
            code: ErrorCode::UnauthorizedClient,
            description: "3rd-party client app didn't send us its client ID.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// `client_id` does not resolve to a registered client.
    #[must_use]
    pub fn client_id_not_found() -> Self {
        Self {
            code: ErrorCode::UnauthorizedClient,
            description: "3rd-party client app requesting access to your resources was not \
                          found in our database."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Client authentication at the token endpoint failed or was missing.
    #[must_use]
    pub fn unauthorized_client() -> Self {
        Self {
            code: ErrorCode::UnauthorizedClient,
            description: "You must provide an authorization header with your client credentials."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Token endpoint received a `grant_type` outside the supported set.
    #[must_use]
    pub fn unsupported_grant_type() -> Self {
        Self {
            code: ErrorCode::UnsupportedGrantType,
            description: "grant_type provided is not supported by this authorization server."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Grant or refresh token is invalid for the presenting client.
    #[must_use]
    pub fn invalid_grant() -> Self {
        Self {
            code: ErrorCode::InvalidGrant,
            description: "The provided authorization grant (e.g., authorization code, resource \
                          owner credentials) or refresh token is invalid, expired, revoked, \
                          does not match the redirection URI used in the authorization \
                          request, or was issued to another client."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Resource owner credentials rejected on the password grant.
    #[must_use]
    pub fn unauthorized_user() -> Self {
        Self {
            code: ErrorCode::AccessDenied,
            description: "Resource owner credentials are invalid.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Refresh requested a scope outside the originally granted set.
    #[must_use]
    pub fn invalid_scope() -> Self {
        Self {
            code: ErrorCode::InvalidScope,
            description: "Scope exceeds the scope granted by the resource owner.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Presented token belongs to a different client than the one authenticated.
    #[must_use]
    pub fn client_id_mismatch() -> Self {
        Self {
            code: ErrorCode::InvalidRequest,
            description: "Authenticated client did not generate token used.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// `Authorization` header carried a non-Bearer scheme.
    #[must_use]
    pub fn unsupported_token_type() -> Self {
        Self {
            code: ErrorCode::InvalidToken,
            description: "Unsupported token type.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Bearer token expired or was revoked.
    #[must_use]
    pub fn invalid_token() -> Self {
        Self {
            code: ErrorCode::InvalidToken,
            description: "Access token expired or was revoked.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// Token scopes do not cover the scopes the resource requires.
    #[must_use]
    pub fn insufficient_scope() -> Self {
        Self {
            code: ErrorCode::InsufficientScope,
            description: "The request requires higher privileges than provided by the access \
                          token."
                .to_owned(),
            uri: None,
            state: None,
        }
    }

    /// `response_type` outside {"code", "token"}. State is already
    /// validated at this point and is echoed back.
    #[must_use]
    pub fn unsupported_response_type(state: &str) -> Self {
        Self {
            code: ErrorCode::UnsupportedResponseType,
            description: "Authorization server does not support obtaining an authorization \
                          code using this authorization flow."
                .to_owned(),
            uri: None,
            state: Some(state.to_owned()),
        }
    }

    /// `state` is mandatory here even though RFC 6749 only recommends it.
    #[must_use]
    pub fn state_required() -> Self {
        Self {
            code: ErrorCode::InvalidRequest,
            description: "state parameter is required by this authorization server.".to_owned(),
            uri: None,
            state: None,
        }
    }

    /// `scope` is mandatory on authorization requests.
    #[must_use]
    pub fn scope_required(state: &str) -> Self {
        Self {
            code: ErrorCode::InvalidRequest,
            description: "scope parameter is required by this authorization server.".to_owned(),
            uri: None,
            state: Some(state.to_owned()),
        }
    }

    /// Provider failure. The underlying error is logged and never surfaced
    /// to the client.
    #[must_use]
    pub fn server_error(state: Option<&str>, err: &ProviderError) -> Self {
        tracing::error!(error = %err, "internal server error");

        Self {
            code: ErrorCode::ServerError,
            description: "The authorization server encountered an unexpected condition that \
                          prevented it from fulfilling the request."
                .to_owned(),
            uri: None,
            state: state.map(ToOwned::to_owned),
        }
    }

    /// Replace the description, keeping code and state.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Encode into the query component of `url` per RFC 6749 §4.1.2.1.
    pub fn encode_in_query(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        query.append_pair("error", self.code.as_str());

        if !self.description.is_empty() {
            query.append_pair("error_description", &self.description);
        }

        if let Some(uri) = &self.uri {
            query.append_pair("error_uri", uri);
        }

        if let Some(state) = &self.state {
            query.append_pair("state", state);
        }
    }

    /// Encode into the fragment component of `url` per RFC 6749 §4.2.2.1.
    pub fn encode_in_fragment(&self, url: &mut Url) {
        let mut pairs = url::form_urlencoded::Serializer::new(String::new());
        pairs.append_pair("error", self.code.as_str());

        if !self.description.is_empty() {
            pairs.append_pair("error_description", &self.description);
        }

        if let Some(uri) = &self.uri {
            pairs.append_pair("error_uri", uri);
        }

        if let Some(state) = &self.state {
            pairs.append_pair("state", state);
        }

        url.set_fragment(Some(&pairs.finish()));
    }
}

/// Failure reported by the [`Provider`](crate::provider::Provider) seam.
///
/// The core wraps these as `server_error` on the wire; the underlying
/// message only ever reaches the logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backing store failed or returned inconsistent data
    #[error("storage failure: {0}")]
    Storage(String),
    /// A state transition lost a race, e.g. a grant consumed concurrently
    #[error("conflicting state transition: {0}")]
    Conflict(String),
}
