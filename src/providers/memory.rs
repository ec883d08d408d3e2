// ABOUTME: In-memory Provider implementation for tests and single-process embedding
// ABOUTME: One mutex over all indexes makes the one-shot grant transition atomic
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::Uri;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;

use crate::errors::ProviderError;
use crate::models::{Client, Grant, GrantStatus, Scope, Token, TokenStatus};
use crate::provider::{Provider, SessionContext};

struct RegisteredClient {
    client: Client,
    secret: String,
}

#[derive(Default)]
struct Inner {
    clients: HashMap<String, RegisteredClient>,
    users: HashMap<String, String>,
    scope_catalog: Vec<Scope>,
    resources: HashMap<String, Vec<Scope>>,
    grants: HashMap<String, Grant>,
    access_tokens: HashMap<String, Token>,
    refresh_tokens: HashMap<String, Token>,
}

/// [`Provider`] backed by process memory. Clients, users and the scope
/// catalog are registered up front; grants and tokens accumulate at
/// runtime. All indexes sit behind one mutex, which is what makes the
/// observe-and-transition of a one-shot grant atomic.
pub struct MemoryProvider {
    user_authenticated: AtomicBool,
    inner: Mutex<Inner>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_authenticated: AtomicBool::new(true),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registers a client and the secret it authenticates with.
    #[must_use]
    pub fn with_client(self, client: Client, secret: &str) -> Self {
        self.lock().clients.insert(
            client.id.clone(),
            RegisteredClient {
                client,
                secret: secret.to_owned(),
            },
        );
        self
    }

    /// Registers a resource owner for the password grant.
    #[must_use]
    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.lock()
            .users
            .insert(username.to_owned(), password.to_owned());
        self
    }

    /// Adds a scope to the catalog. Requests for scopes outside the
    /// catalog are silently dropped.
    #[must_use]
    pub fn with_scope(self, id: &str, description: &str) -> Self {
        self.lock().scope_catalog.push(Scope {
            id: id.to_owned(),
            description: description.to_owned(),
        });
        self
    }

    /// Declares the scopes required to access a resource path.
    #[must_use]
    pub fn with_resource(self, path: &str, scope_ids: &[&str]) -> Self {
        let scopes = {
            let inner = self.lock();
            scope_ids
                .iter()
                .map(|id| {
                    inner
                        .scope_catalog
                        .iter()
                        .find(|scope| scope.id == *id)
                        .cloned()
                        .unwrap_or_else(|| Scope {
                            id: (*id).to_owned(),
                            description: String::new(),
                        })
                })
                .collect()
        };
        self.lock().resources.insert(path.to_owned(), scopes);
        self
    }

    /// Sets whether the resource owner counts as logged in.
    #[must_use]
    pub fn with_user_authenticated(self, authenticated: bool) -> Self {
        self.user_authenticated
            .store(authenticated, Ordering::Relaxed);
        self
    }

    /// Flips the resource-owner session state at runtime.
    pub fn set_user_authenticated(&self, authenticated: bool) {
        self.user_authenticated
            .store(authenticated, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 256 bits of system randomness, URL-safe base64 without padding.
    fn random_value() -> Result<String, ProviderError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes)
            .map_err(|_| ProviderError::Storage("system RNG failure".to_owned()))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    fn issue_locked(
        inner: &mut Inner,
        client_id: &str,
        scopes: &[Scope],
        issue_refresh: bool,
        expiration: Duration,
    ) -> Result<Token, ProviderError> {
        let refresh_token = if issue_refresh {
            Some(Self::random_value()?)
        } else {
            None
        };

        let token = Token {
            value: Self::random_value()?,
            token_type: "bearer".to_owned(),
            client_id: client_id.to_owned(),
            scopes: scopes.to_vec(),
            expires_at: Utc::now() + expiration,
            expires_in: i64::try_from(expiration.as_secs()).unwrap_or(i64::MAX),
            refresh_token,
            status: TokenStatus::Active,
        };

        inner
            .access_tokens
            .insert(token.value.clone(), token.clone());
        if let Some(refresh) = &token.refresh_token {
            inner.refresh_tokens.insert(refresh.clone(), token.clone());
        }

        Ok(token)
    }

    fn expire_token_on_read(token: &mut Token) {
        if token.status == TokenStatus::Active && token.expires_at <= Utc::now() {
            token.status = TokenStatus::Expired;
        }
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn authenticate_client(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Client>, ProviderError> {
        let inner = self.lock();
        let Some(registered) = inner.clients.get(username) else {
            return Ok(None);
        };

        let matches: bool = registered
            .secret
            .as_bytes()
            .ct_eq(password.as_bytes())
            .into();
        Ok(matches.then(|| registered.client.clone()))
    }

    async fn authenticate_user(&self, username: &str, password: &str) -> bool {
        let inner = self.lock();
        inner
            .users
            .get(username)
            .is_some_and(|stored| stored.as_bytes().ct_eq(password.as_bytes()).into())
    }

    fn is_user_authenticated(&self, _session: &SessionContext<'_>) -> bool {
        self.user_authenticated.load(Ordering::Relaxed)
    }

    async fn client_info(&self, client_id: &str) -> Result<Option<Client>, ProviderError> {
        Ok(self
            .lock()
            .clients
            .get(client_id)
            .map(|registered| registered.client.clone()))
    }

    async fn scopes_info(&self, scopes: &str) -> Result<Vec<Scope>, ProviderError> {
        let inner = self.lock();
        Ok(scopes
            .split_whitespace()
            .filter_map(|id| inner.scope_catalog.iter().find(|scope| scope.id == id))
            .cloned()
            .collect())
    }

    async fn resource_scopes(&self, url: &Uri) -> Result<Vec<Scope>, ProviderError> {
        Ok(self
            .lock()
            .resources
            .get(url.path())
            .cloned()
            .unwrap_or_default())
    }

    async fn gen_grant(
        &self,
        client: &Client,
        scopes: &[Scope],
        expiration: Duration,
    ) -> Result<Grant, ProviderError> {
        let grant = Grant {
            code: Self::random_value()?,
            client_id: client.id.clone(),
            redirect_url: client.redirect_url.clone(),
            scopes: scopes.to_vec(),
            expires_at: Utc::now() + expiration,
            status: GrantStatus::Active,
        };

        self.lock().grants.insert(grant.code.clone(), grant.clone());
        Ok(grant)
    }

    async fn grant_info(&self, code: &str) -> Result<Option<Grant>, ProviderError> {
        let mut inner = self.lock();
        let Some(grant) = inner.grants.get_mut(code) else {
            return Ok(None);
        };

        if grant.status == GrantStatus::Active && grant.expires_at <= Utc::now() {
            grant.status = GrantStatus::Expired;
        }

        Ok(Some(grant.clone()))
    }

    async fn gen_token(
        &self,
        grant: Option<&Grant>,
        client: &Client,
        scopes: &[Scope],
        issue_refresh: bool,
        expiration: Duration,
    ) -> Result<Token, ProviderError> {
        let mut inner = self.lock();

        // Observe and consume the grant under the same lock as issuance:
        // a racing second exchange sees Used and fails.
        if let Some(grant) = grant {
            if let Some(stored) = inner.grants.get_mut(&grant.code) {
                if stored.status != GrantStatus::Active {
                    return Err(ProviderError::Conflict(
                        "grant code is no longer active".to_owned(),
                    ));
                }
                stored.status = GrantStatus::Used;
            }
        }

        Self::issue_locked(&mut inner, &client.id, scopes, issue_refresh, expiration)
    }

    async fn token_info(&self, value: &str) -> Result<Option<Token>, ProviderError> {
        let mut inner = self.lock();

        if let Some(token) = inner.access_tokens.get_mut(value) {
            Self::expire_token_on_read(token);
            return Ok(Some(token.clone()));
        }

        if let Some(token) = inner.refresh_tokens.get_mut(value) {
            Self::expire_token_on_read(token);
            return Ok(Some(token.clone()));
        }

        Ok(None)
    }

    async fn refresh_token(&self, old: &Token, scopes: &[Scope]) -> Result<Token, ProviderError> {
        let mut inner = self.lock();

        let Some(refresh_value) = &old.refresh_token else {
            return Err(ProviderError::Storage(
                "token has no refresh component".to_owned(),
            ));
        };

        // Rotation: the old refresh value stops being redeemable before the
        // new pair exists.
        inner.refresh_tokens.remove(refresh_value);

        let lifetime = Duration::from_secs(u64::try_from(old.expires_in).unwrap_or(600));
        Self::issue_locked(&mut inner, &old.client_id, scopes, true, lifetime)
    }

    async fn revoke_token(&self, value: &str) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        inner.access_tokens.remove(value);
        inner.refresh_tokens.remove(value);
        Ok(())
    }
}
