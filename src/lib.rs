// ABOUTME: OAuth 2.0 authorization-server core implementing RFC 6749, RFC 6750 and RFC 7009
// ABOUTME: Protocol state machine only; storage and user auth live behind the Provider seam
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

#![deny(unsafe_code)]

//! # OAuth 2.0 authorization-server core
//!
//! A protocol engine mediating between a 3rd-party client, a resource
//! owner and a protected resource server, issuing and validating
//! short-lived opaque bearer credentials:
//!
//! - **Authorization endpoint**: authorization-code and implicit flows,
//!   consent rendering, grant issuance via redirect ([`authorization`])
//! - **Token endpoint**: `authorization_code`, `password`,
//!   `client_credentials` and `refresh_token` grants plus RFC 7009
//!   revocation ([`tokens`])
//! - **Resource gate**: bearer-token middleware enforcing scope coverage
//!   for protected resources ([`middleware`])
//!
//! The core is stateless between requests. Persistence, resource-owner
//! authentication, the scope catalog and the consent template all sit
//! behind the single [`provider::Provider`] seam; an in-memory
//! implementation ships in [`providers::memory`].
//!
//! Stricter than the RFC where that buys security: `state` and `scope`
//! are mandatory on authorization requests, redirect URLs must be HTTPS
//! and string-equal the registered value, authorization codes are
//! one-shot with replay detection, and refresh tokens rotate on every
//! use.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use oauth2_core::config::ConfigBuilder;
//! use oauth2_core::providers::MemoryProvider;
//! use oauth2_core::routes::oauth2_routes;
//! use url::Url;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(
//!     MemoryProvider::new()
//!         .with_scope("read", "Read access to your resources")
//!         .with_scope("write", "Write access to your resources"),
//! );
//!
//! let form = r#"<html><body>
//!   {{#each errors}}<p>{{error}}: {{error_description}}</p>{{/each}}
//!   <h2>{{client.name}}</h2>
//!   <ul>{{#each scopes}}<li>{{id}}: {{description}}</li>{{/each}}</ul>
//! </body></html>"#;
//!
//! let config = Arc::new(
//!     ConfigBuilder::new()
//!         .authz_form(form)
//!         .provider(provider)
//!         .login_url(
//!             Url::parse("https://accounts.example.com/login")?,
//!             "redirect_to",
//!         )
//!         .token_expiration(Duration::from_secs(600))
//!         .build()?,
//! );
//!
//! let app = oauth2_routes(config);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

/// Authorization endpoint: consent form, code and implicit flows
pub mod authorization;

/// Typed configuration with a validating builder
pub mod config;

/// Protocol error taxonomy and its JSON and redirect-URI encodings
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Resource-gate middleware
pub mod middleware;

/// Clients, scopes, grants, tokens and wire structs
pub mod models;

/// The Provider Port: the core's only dependency seam
pub mod provider;

/// Bundled provider implementations
pub mod providers;

/// Response writers enforcing security and cache-suppression headers
pub mod render;

/// Router assembly
pub mod routes;

/// Token endpoint: grant exchange, refresh and revocation
pub mod tokens;

pub use config::{Config, ConfigBuilder, ConfigError};
pub use errors::{AuthzError, ErrorCode, ProviderError};
pub use models::{
    AuthzData, Client, Grant, GrantStatus, Scope, Token, TokenResponse, TokenStatus,
};
pub use provider::{Provider, SessionContext};
pub use routes::{oauth2_routes, protect};
