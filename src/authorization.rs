// ABOUTME: Authorization endpoint: consent rendering, authorization-code and implicit flows
// ABOUTME: Implements RFC 6749 sections 4.1.1, 4.1.2 and 4.2 with a strict validation ladder
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

use std::sync::Arc;

use axum::extract::{Form, OriginalUri, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::Response;
use url::Url;

use crate::config::Config;
use crate::errors::AuthzError;
use crate::models::{stringify_scopes, AuthorizeRequest, AuthzData, Client, Scope};
use crate::provider::SessionContext;
use crate::render;

/// Authorization request after the full validation ladder has passed.
/// From here every error may be delivered to the (trusted) redirect URL.
struct ValidatedAuthz {
    client: Client,
    scopes: Vec<Scope>,
    grant_type: String,
    state: String,
}

impl ValidatedAuthz {
    fn to_authz_data(&self) -> AuthzData {
        AuthzData {
            client: Some(self.client.clone()),
            scopes: self.scopes.clone(),
            errors: Vec::new(),
            grant_type: self.grant_type.clone(),
            state: self.state.clone(),
        }
    }
}

/// GET handler: renders the consent form for the resource owner.
pub async fn authorize_form(
    State(config): State<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(request): Query<AuthorizeRequest>,
) -> Response {
    match validate(&config, &uri, &headers, &request).await {
        Ok(authz) => render::html(
            StatusCode::OK,
            &config.authz_form,
            &authz.to_authz_data(),
            config.sts_max_age,
        ),
        Err(response) => response,
    }
}

/// POST handler: acts on the resource owner's consent, issuing a grant
/// (code flow) or an access token (implicit flow) via redirect.
pub async fn authorize_consent(
    State(config): State<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(request): Form<AuthorizeRequest>,
) -> Response {
    let authz = match validate(&config, &uri, &headers, &request).await {
        Ok(authz) => authz,
        Err(response) => return response,
    };

    if authz.grant_type == "token" {
        implicit_grant(&config, &authz).await
    } else {
        code_grant(&config, &authz).await
    }
}

/// The validation ladder of the authorization endpoint, ordered so each
/// step may depend on the previous one having succeeded.
///
/// Until the redirect URL is proven to equal the registered HTTPS value,
/// errors are rendered into the consent form so the resource owner, not
/// an attacker-controlled redirect target, is the one informed. After
/// that point errors travel by redirect.
async fn validate(
    config: &Arc<Config>,
    uri: &Uri,
    headers: &HeaderMap,
    request: &AuthorizeRequest,
) -> Result<ValidatedAuthz, Response> {
    let session = SessionContext { headers };
    if !config.provider.is_user_authenticated(&session) {
        let mut login = config.login_url.clone();
        login
            .query_pairs_mut()
            .append_pair(&config.login_url_redirect_param, &uri.to_string());
        return Err(render::redirect(&login));
    }

    let Some(client_id) = request.client_id.as_deref().filter(|id| !id.is_empty()) else {
        return Err(consent_error(config, AuthzError::client_id_missing()));
    };

    let client = match config.provider.client_info(client_id).await {
        Ok(Some(client)) => client,
        Ok(None) => return Err(consent_error(config, AuthzError::client_id_not_found())),
        Err(err) => {
            return Err(consent_error(config, AuthzError::server_error(None, &err)));
        }
    };

    // A missing redirect_uri falls back to the registered one; a supplied
    // one must parse, use HTTPS and string-equal the registered value.
    let redirect_url = match request.redirect_uri.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => match Url::parse(raw) {
            Ok(url) => url,
            Err(_) => return Err(consent_error(config, AuthzError::redirect_url_invalid())),
        },
        None => client.redirect_url.clone(),
    };

    if redirect_url.scheme() != "https" {
        return Err(consent_error(config, AuthzError::redirect_url_invalid()));
    }

    if redirect_url.as_str() != client.redirect_url.as_str() {
        return Err(consent_error(config, AuthzError::redirect_url_mismatch()));
    }

    // The redirect URL is trusted from here on.
    let response_type = request.response_type.clone().unwrap_or_default();

    let Some(state) = request.state.clone().filter(|state| !state.is_empty()) else {
        return Err(redirect_error(
            &redirect_url,
            &AuthzError::state_required(),
            &response_type,
        ));
    };

    if response_type != "code" && response_type != "token" {
        return Err(redirect_error(
            &redirect_url,
            &AuthzError::unsupported_response_type(&state),
            &response_type,
        ));
    }

    let Some(scope) = request.scope.as_deref().filter(|scope| !scope.is_empty()) else {
        return Err(redirect_error(
            &redirect_url,
            &AuthzError::scope_required(&state),
            &response_type,
        ));
    };

    let scopes = match config.provider.scopes_info(scope).await {
        Ok(scopes) => scopes,
        Err(err) => {
            return Err(redirect_error(
                &redirect_url,
                &AuthzError::server_error(Some(&state), &err),
                &response_type,
            ));
        }
    };

    Ok(ValidatedAuthz {
        client,
        scopes,
        grant_type: response_type,
        state,
    })
}

/// RFC 6749 §4.1.2: issue an authorization code and deliver it as query
/// parameters on the redirect URL.
async fn code_grant(config: &Arc<Config>, authz: &ValidatedAuthz) -> Response {
    let grant = match config
        .provider
        .gen_grant(&authz.client, &authz.scopes, config.authz_expiration)
        .await
    {
        Ok(grant) => grant,
        Err(err) => {
            return render::html(
                StatusCode::OK,
                &config.authz_form,
                &AuthzData::with_errors(vec![AuthzError::server_error(None, &err)]),
                config.sts_max_age,
            );
        }
    };

    let mut url = authz.client.redirect_url.clone();
    url.query_pairs_mut()
        .append_pair("code", &grant.code)
        .append_pair("state", &authz.state);

    render::redirect(&url)
}

/// RFC 6749 §4.2: issue an access token directly and deliver it in the
/// fragment component of the redirect URL. Never emits a refresh token.
async fn implicit_grant(config: &Arc<Config>, authz: &ValidatedAuthz) -> Response {
    let token = match config
        .provider
        .gen_token(
            None,
            &authz.client,
            &authz.scopes,
            false,
            config.token_expiration,
        )
        .await
    {
        Ok(token) => token,
        Err(err) => {
            let mut url = authz.client.redirect_url.clone();
            AuthzError::server_error(Some(&authz.state), &err).encode_in_fragment(&mut url);
            return render::redirect(&url);
        }
    };

    let mut pairs = url::form_urlencoded::Serializer::new(String::new());
    pairs
        .append_pair("access_token", &token.value)
        .append_pair("token_type", &token.token_type)
        .append_pair("expires_in", &token.expires_in.to_string())
        .append_pair("scope", &stringify_scopes(&token.scopes))
        .append_pair("state", &authz.state);

    let mut url = authz.client.redirect_url.clone();
    url.set_fragment(Some(&pairs.finish()));

    render::redirect(&url)
}

/// Error delivery before the redirect URL is trusted: rendered into the
/// consent form, 200 OK, never a redirect.
fn consent_error(config: &Arc<Config>, error: AuthzError) -> Response {
    render::html(
        StatusCode::OK,
        &config.authz_form,
        &AuthzData::with_errors(vec![error]),
        config.sts_max_age,
    )
}

/// Error delivery after the redirect URL is trusted: 302 with the error
/// in the query component for the code flow and in the fragment for the
/// implicit flow.
fn redirect_error(redirect_url: &Url, error: &AuthzError, response_type: &str) -> Response {
    let mut url = redirect_url.clone();
    if response_type == "token" {
        error.encode_in_fragment(&mut url);
    } else {
        error.encode_in_query(&mut url);
    }
    render::redirect(&url)
}
