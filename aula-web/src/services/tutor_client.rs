//! AI tutor client
//!
//! Request: `{"message", "history": [{"role", "content"}], "context": {...}}`
//! Response: `{"reply": "..."}` (`response` and `answer` accepted as aliases)

use aula_common::config::ServiceConfig;
use serde::{Deserialize, Serialize};

use super::{build_http_client, post_json, ClientError, Endpoint};

const SERVICE: &str = "AI tutor";

/// One previous turn of the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TutorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TutorRequest {
    pub message: String,
    pub history: Vec<ChatTurn>,
    pub context: TutorContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TutorReply {
    #[serde(alias = "response", alias = "answer")]
    pub reply: String,
}

/// Chat-style tutoring service client
#[derive(Clone)]
pub struct TutorClient {
    http: reqwest::Client,
    endpoint: Option<Endpoint>,
    history_limit: u32,
}

impl TutorClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(SERVICE, config.timeout_secs)?,
            endpoint: Endpoint::from_config(config),
            history_limit: config.history_limit,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Number of previous turns forwarded with each message
    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }

    pub async fn chat(&self, request: &TutorRequest) -> Result<TutorReply, ClientError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(ClientError::NotConfigured(SERVICE))?;

        let reply: TutorReply = post_json(&self.http, SERVICE, endpoint, request).await?;
        if reply.reply.trim().is_empty() {
            return Err(ClientError::Parse(SERVICE, "empty reply".to_string()));
        }
        Ok(reply)
    }
}
