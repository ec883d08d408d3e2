// ABOUTME: Typed configuration for the authorization server with a validating builder
// ABOUTME: Invalid configurations fail at construction time, never at first request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;
use std::time::Duration;

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, TemplateError,
};
use thiserror::Error;
use url::Url;

use crate::models::{stringify_scopes, Scope};
use crate::provider::Provider;

/// Template name the authorization form is registered under.
pub(crate) const AUTHZ_FORM_TEMPLATE: &str = "authz_form";

/// Default authorization endpoint path.
pub const DEFAULT_AUTHZ_ENDPOINT: &str = "/oauth2/authzs";
/// Default token endpoint path.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "/oauth2/tokens";
/// Default Strict-Transport-Security max age: one year.
pub const DEFAULT_STS_MAX_AGE: Duration = Duration::from_secs(31_536_000);
/// Default access-token lifetime. Low values keep the attack window
/// narrow at the cost of more refresh traffic.
pub const DEFAULT_TOKEN_EXPIRATION: Duration = Duration::from_secs(600);
/// Default authorization-grant lifetime. Should be very low.
pub const DEFAULT_AUTHZ_EXPIRATION: Duration = Duration::from_secs(60);
/// Default query parameter carrying the post-login return URL.
pub const DEFAULT_LOGIN_REDIRECT_PARAM: &str = "redirect_to";

/// Immutable server configuration. Built once through [`ConfigBuilder`],
/// read concurrently by every request after that.
pub struct Config {
    /// Path of the authorization endpoint
    pub authz_endpoint: String,
    /// Path of the token endpoint
    pub token_endpoint: String,
    /// Strict-Transport-Security max age on HTML responses
    pub sts_max_age: Duration,
    /// Access-token lifetime, echoed as `expires_in`
    pub token_expiration: Duration,
    /// Authorization-grant lifetime
    pub authz_expiration: Duration,
    /// Where unauthenticated resource owners are sent
    pub login_url: Url,
    /// Query key on `login_url` carrying the original request URL
    pub login_url_redirect_param: String,
    /// The storage/auth seam
    pub provider: Arc<dyn Provider>,
    pub(crate) authz_form: Handlebars<'static>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("authz_endpoint", &self.authz_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("sts_max_age", &self.sts_max_age)
            .field("token_expiration", &self.token_expiration)
            .field("authz_expiration", &self.authz_expiration)
            .field("login_url", &self.login_url)
            .field("login_url_redirect_param", &self.login_url_redirect_param)
            .field("provider", &"<dyn Provider>")
            .field("authz_form", &"<Handlebars>")
            .finish()
    }
}

/// Configuration rejected at build time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No authorization form template was supplied, or it was empty
    #[error("authorization form template is required")]
    MissingAuthzForm,
    /// The authorization form template failed to parse
    #[error("authorization form template failed to parse: {0}")]
    InvalidAuthzForm(#[from] Box<TemplateError>),
    /// No provider implementation was supplied
    #[error("an implementation of the Provider trait is required")]
    MissingProvider,
    /// No login URL was supplied
    #[error("a login URL for unauthenticated resource owners is required")]
    MissingLoginUrl,
}

/// Builder for [`Config`]. Endpoints, expirations and the STS age have
/// defaults; the form, provider and login URL are mandatory.
#[derive(Default)]
pub struct ConfigBuilder {
    authz_endpoint: Option<String>,
    token_endpoint: Option<String>,
    sts_max_age: Option<Duration>,
    token_expiration: Option<Duration>,
    authz_expiration: Option<Duration>,
    login_url: Option<Url>,
    login_url_redirect_param: Option<String>,
    authz_form: Option<String>,
    provider: Option<Arc<dyn Provider>>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the authorization endpoint. Defaults to `/oauth2/authzs`.
    #[must_use]
    pub fn authz_endpoint(mut self, path: impl Into<String>) -> Self {
        self.authz_endpoint = Some(path.into());
        self
    }

    /// Path of the token endpoint. Defaults to `/oauth2/tokens`.
    #[must_use]
    pub fn token_endpoint(mut self, path: impl Into<String>) -> Self {
        self.token_endpoint = Some(path.into());
        self
    }

    /// Strict-Transport-Security max age. Zero still emits the header as
    /// `max-age=0`, an explicit opt-out for development.
    #[must_use]
    pub fn sts_max_age(mut self, max_age: Duration) -> Self {
        self.sts_max_age = Some(max_age);
        self
    }

    /// Access-token lifetime echoed as `expires_in`.
    #[must_use]
    pub fn token_expiration(mut self, expiration: Duration) -> Self {
        self.token_expiration = Some(expiration);
        self
    }

    /// Authorization-grant lifetime.
    #[must_use]
    pub fn authz_expiration(mut self, expiration: Duration) -> Self {
        self.authz_expiration = Some(expiration);
        self
    }

    /// Login destination for unauthenticated resource owners, and the
    /// query key carrying the original request URL back to us.
    #[must_use]
    pub fn login_url(mut self, url: Url, redirect_param: impl Into<String>) -> Self {
        self.login_url = Some(url);
        self.login_url_redirect_param = Some(redirect_param.into());
        self
    }

    /// Authorization form template source. Parsed once at build;
    /// HTML-escaped by default at render time.
    #[must_use]
    pub fn authz_form(mut self, template: impl Into<String>) -> Self {
        self.authz_form = Some(template.into());
        self
    }

    /// The [`Provider`] implementation backing the server.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validates and assembles the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the form template is missing, empty
    /// or unparseable, or when the provider or login URL is absent.
    pub fn build(self) -> Result<Config, ConfigError> {
        let form_source = self
            .authz_form
            .filter(|source| !source.trim().is_empty())
            .ok_or(ConfigError::MissingAuthzForm)?;

        let provider = self.provider.ok_or(ConfigError::MissingProvider)?;
        let login_url = self.login_url.ok_or(ConfigError::MissingLoginUrl)?;

        let mut authz_form = Handlebars::new();
        authz_form
            .register_template_string(AUTHZ_FORM_TEMPLATE, form_source)
            .map_err(Box::new)?;
        authz_form.register_helper("stringify_scopes", Box::new(stringify_scopes_helper));

        Ok(Config {
            authz_endpoint: self
                .authz_endpoint
                .unwrap_or_else(|| DEFAULT_AUTHZ_ENDPOINT.to_owned()),
            token_endpoint: self
                .token_endpoint
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_owned()),
            sts_max_age: self.sts_max_age.unwrap_or(DEFAULT_STS_MAX_AGE),
            token_expiration: self.token_expiration.unwrap_or(DEFAULT_TOKEN_EXPIRATION),
            authz_expiration: self.authz_expiration.unwrap_or(DEFAULT_AUTHZ_EXPIRATION),
            login_url,
            login_url_redirect_param: self
                .login_url_redirect_param
                .unwrap_or_else(|| DEFAULT_LOGIN_REDIRECT_PARAM.to_owned()),
            provider,
            authz_form,
        })
    }
}

/// `{{stringify_scopes scopes}}` template helper: space-joined scope ids.
fn stringify_scopes_helper(
    helper: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let scopes: Vec<Scope> = helper
        .param(0)
        .and_then(|param| serde_json::from_value(param.value().clone()).ok())
        .unwrap_or_default();

    out.write(&stringify_scopes(&scopes))?;
    Ok(())
}
