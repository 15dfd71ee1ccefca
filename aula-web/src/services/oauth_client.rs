//! OAuth2 / OpenID Connect provider client
//!
//! Authorization-code flow only: build the authorize URL, exchange the code
//! at the token endpoint, then read the profile from the userinfo endpoint.

use aula_common::config::OAuthProviderConfig;
use serde::Deserialize;
use serde_json::Value;

use super::{build_http_client, ClientError};

const SERVICE: &str = "OAuth provider";
const TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Profile reported by the provider after sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub provider_account_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl ProviderProfile {
    /// Extract the profile from a userinfo document
    ///
    /// Accepts OIDC claims (`sub`, `picture`) as well as the common
    /// non-OIDC shapes (`id` as string or number, `avatar_url`).
    pub fn from_userinfo(doc: &Value) -> Result<Self, ClientError> {
        let provider_account_id = match doc.get("sub").or_else(|| doc.get("id")) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ClientError::Parse(
                    SERVICE,
                    "userinfo has no subject identifier".to_string(),
                ))
            }
        };

        let email = doc
            .get("email")
            .and_then(Value::as_str)
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ClientError::Parse(SERVICE, "userinfo has no email".to_string()))?;

        let text = |key: &str| {
            doc.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            provider_account_id,
            email,
            name: text("name"),
            image: text("picture").or_else(|| text("avatar_url")),
        })
    }
}

#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(SERVICE, TIMEOUT_SECS)?,
        })
    }

    /// Provider authorization URL the browser is redirected to
    pub fn authorize_url(
        provider: &OAuthProviderConfig,
        redirect_uri: &str,
        state: &str,
    ) -> Result<String, ClientError> {
        let scope = provider.scopes.join(" ");
        let url = reqwest::Url::parse_with_params(
            &provider.authorize_url,
            &[
                ("client_id", provider.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| ClientError::Parse(SERVICE, format!("invalid authorize_url: {}", e)))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(
        &self,
        provider: &OAuthProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, ClientError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", provider.client_id.as_str()),
        ];
        if let Some(secret) = &provider.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        tracing::debug!(provider = %provider.name, "Exchanging authorization code");

        let response = self
            .http
            .post(&provider.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %provider.name, status = status.as_u16(), body = %error_text, "Provider error response");
            return Err(ClientError::Status(SERVICE, status.as_u16()));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ClientError::Parse(SERVICE, e.to_string()))
    }

    /// Read the signed-in user's profile
    pub async fn fetch_profile(
        &self,
        provider: &OAuthProviderConfig,
        access_token: &str,
    ) -> Result<ProviderProfile, ClientError> {
        let response = self
            .http
            .get(&provider.userinfo_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %provider.name, status = status.as_u16(), body = %error_text, "Provider error response");
            return Err(ClientError::Status(SERVICE, status.as_u16()));
        }

        let doc: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(SERVICE, e.to_string()))?;

        ProviderProfile::from_userinfo(&doc)
    }
}
