// ABOUTME: Provider Port, the single seam between the protocol core and storage/auth
// ABOUTME: The core calls the provider; the provider never calls the core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, Uri};

use crate::errors::ProviderError;
use crate::models::{Client, Grant, Scope, Token};

/// Request-scoped view the provider may consult to recognize an existing
/// resource-owner session. Opaque to the core.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    /// Headers of the in-flight request, cookies included
    pub headers: &'a HeaderMap,
}

/// The sole dependency seam of the protocol core: storage of clients,
/// grants and tokens, resource-owner authentication, the scope catalog.
///
/// All state lives behind this trait; the core is stateless between
/// requests. Lookups return `Ok(None)` for missing entities: a missing
/// client, grant or token is a first-class value, not an error and not a
/// zero-valued sentinel.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Authenticates a previously registered client by its HTTP-Basic
    /// credentials. Unknown clients and bad secrets are `Ok(None)`.
    async fn authenticate_client(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Client>, ProviderError>;

    /// Authenticates the resource owner. Used by the password grant only.
    async fn authenticate_user(&self, username: &str, password: &str) -> bool;

    /// Whether the resource owner behind this request has a valid session.
    /// A `false` sends the user to the login URL before any validation runs.
    fn is_user_authenticated(&self, session: &SessionContext<'_>) -> bool;

    /// Returns registered client information by id.
    async fn client_info(&self, client_id: &str) -> Result<Option<Client>, ProviderError>;

    /// Parses a space-separated scope string into the catalog's scope
    /// descriptions, preserving request order. Unrecognized ids are
    /// silently dropped; an empty result is only valid for empty input.
    async fn scopes_info(&self, scopes: &str) -> Result<Vec<Scope>, ProviderError>;

    /// Scopes required to access the given resource URL.
    async fn resource_scopes(&self, url: &Uri) -> Result<Vec<Scope>, ProviderError>;

    /// Issues and persists an authorization grant with a fresh, unguessable
    /// code, status Active, expiring after `expiration`.
    ///
    /// Codes must be short-lived to mitigate leaks; RFC 6749 §4.1.2
    /// recommends at most 10 minutes.
    async fn gen_grant(
        &self,
        client: &Client,
        scopes: &[Scope],
        expiration: Duration,
    ) -> Result<Grant, ProviderError>;

    /// Returns the grant stored under `code`, reflecting expiry in its
    /// status. Unknown codes are `Ok(None)`.
    async fn grant_info(&self, code: &str) -> Result<Option<Grant>, ProviderError>;

    /// Issues and persists an access token over `scopes`, with a refresh
    /// token attached and indexed when `issue_refresh` is set.
    ///
    /// When `grant` is present, the implementation MUST atomically observe
    /// the grant's status and transition it Active → Used, so that a
    /// concurrent second exchange of the same grant fails instead of
    /// issuing twice. A grant that is no longer Active is a
    /// [`ProviderError::Conflict`].
    async fn gen_token(
        &self,
        grant: Option<&Grant>,
        client: &Client,
        scopes: &[Scope],
        issue_refresh: bool,
        expiration: Duration,
    ) -> Result<Token, ProviderError>;

    /// Looks a value up across both the access and refresh indexes,
    /// reflecting expiry in the returned status.
    async fn token_info(&self, value: &str) -> Result<Option<Token>, ProviderError>;

    /// Issues a new access+refresh pair restricted to `scopes` and
    /// invalidates `old`'s refresh token. Rotation is mandatory: the old
    /// refresh value must not remain redeemable.
    async fn refresh_token(&self, old: &Token, scopes: &[Scope]) -> Result<Token, ProviderError>;

    /// Expires a specific token value, removing it from both indexes.
    /// Idempotent: revoking an absent value succeeds.
    async fn revoke_token(&self, value: &str) -> Result<(), ProviderError>;
}
