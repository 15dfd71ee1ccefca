//! AI evaluator client (automated grading)

use aula_common::config::ServiceConfig;
use serde::{Deserialize, Serialize};

use super::{build_http_client, post_json, ClientError, Endpoint};

const SERVICE: &str = "AI evaluator";

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRequest {
    pub evaluation_id: String,
    pub title: String,
    pub instructions: String,
    pub max_score: f64,
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationVerdict {
    pub score: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl EvaluationVerdict {
    /// Score limited to `[0, max_score]`; NaN counts as zero
    pub fn clamped_score(&self, max_score: f64) -> f64 {
        if self.score.is_nan() {
            return 0.0;
        }
        self.score.clamp(0.0, max_score.max(0.0))
    }
}

#[derive(Clone)]
pub struct EvaluatorClient {
    http: reqwest::Client,
    endpoint: Option<Endpoint>,
}

impl EvaluatorClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(SERVICE, config.timeout_secs)?,
            endpoint: Endpoint::from_config(config),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationVerdict, ClientError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(ClientError::NotConfigured(SERVICE))?;

        post_json(&self.http, SERVICE, endpoint, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(score: f64) -> EvaluationVerdict {
        EvaluationVerdict {
            score,
            feedback: None,
        }
    }

    #[test]
    fn test_clamped_score() {
        assert_eq!(verdict(50.0).clamped_score(100.0), 50.0);
        assert_eq!(verdict(150.0).clamped_score(100.0), 100.0);
        assert_eq!(verdict(-3.0).clamped_score(100.0), 0.0);
        assert_eq!(verdict(f64::NAN).clamped_score(100.0), 0.0);
    }

    #[tokio::test]
    async fn test_unconfigured_client() {
        let client = EvaluatorClient::new(&ServiceConfig::default()).unwrap();
        assert!(!client.is_configured());

        let request = EvaluationRequest {
            evaluation_id: "e1".to_string(),
            title: "Essay".to_string(),
            instructions: "Explain".to_string(),
            max_score: 10.0,
            answer: "Because".to_string(),
        };
        let err = client.evaluate(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConfigured(_)));
    }

    #[test]
    fn test_feedback_optional() {
        let v: EvaluationVerdict = serde_json::from_str(r#"{"score": 7.5}"#).unwrap();
        assert_eq!(v.score, 7.5);
        assert!(v.feedback.is_none());
    }
}
