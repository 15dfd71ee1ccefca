//! Outbound integrations and multi-step domain operations
//!
//! - AI tutor and AI evaluator HTTP clients
//! - OAuth provider client (code exchange, userinfo)
//! - Achievement awarding and lesson-progress bookkeeping

pub mod awards;
pub mod evaluator_client;
pub mod oauth_client;
pub mod progress;
pub mod tutor_client;

pub use evaluator_client::{EvaluationRequest, EvaluationVerdict, EvaluatorClient};
pub use oauth_client::{OAuthClient, ProviderProfile};
pub use tutor_client::{ChatTurn, TutorClient, TutorContext, TutorReply, TutorRequest};

use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("Aula/", env!("CARGO_PKG_VERSION"));

/// Outbound client errors
///
/// The `&'static str` names the remote service for log and error messages.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("{0} network error: {1}")]
    Network(&'static str, String),

    #[error("{0} returned HTTP {1}")]
    Status(&'static str, u16),

    #[error("{0} response could not be parsed: {1}")]
    Parse(&'static str, String),
}

impl ClientError {
    /// Remote service named by the error
    pub fn service(&self) -> &'static str {
        match self {
            ClientError::NotConfigured(service)
            | ClientError::Timeout(service)
            | ClientError::Network(service, _)
            | ClientError::Status(service, _)
            | ClientError::Parse(service, _) => service,
        }
    }

    fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(service)
        } else {
            ClientError::Network(service, err.to_string())
        }
    }
}

/// Configured URL and optional bearer key of a JSON service
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    pub url: String,
    pub api_key: Option<String>,
}

impl Endpoint {
    pub(crate) fn from_config(config: &aula_common::config::ServiceConfig) -> Option<Self> {
        config
            .url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Endpoint {
                url: url.clone(),
                api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            })
    }
}

pub(crate) fn build_http_client(
    service: &'static str,
    timeout_secs: u64,
) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| ClientError::Network(service, e.to_string()))
}

/// POST a JSON body and decode a JSON answer; no retries
pub(crate) async fn post_json<Req, Resp>(
    http: &reqwest::Client,
    service: &'static str,
    endpoint: &Endpoint,
    body: &Req,
) -> Result<Resp, ClientError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let mut request = http.post(&endpoint.url).json(body);
    if let Some(key) = &endpoint.api_key {
        request = request.bearer_auth(key);
    }

    tracing::debug!(service, url = %endpoint.url, "Calling external service");

    let response = request
        .send()
        .await
        .map_err(|e| ClientError::from_reqwest(service, e))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::warn!(service, status = status.as_u16(), body = %error_text, "Upstream error response");
        return Err(ClientError::Status(service, status.as_u16()));
    }

    response
        .json::<Resp>()
        .await
        .map_err(|e| ClientError::Parse(service, e.to_string()))
}
