//! Gemini implementation of the analysis collaborator.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AnalysisError, AnalysisService, AnalysisTask};

const DEFAULT_MODEL: &str = "gemini-2.5-pro";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Response models
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

// ============================================================================
// Service
// ============================================================================

/// Analysis collaborator backed by the Gemini `generateContent` API.
pub struct GeminiAnalysis {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiAnalysis {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, AnalysisError> {
        if api_key.trim().is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AnalysisError::Http)?;
        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }
}

#[async_trait]
impl AnalysisService for GeminiAnalysis {
    async fn analyze(&self, task: AnalysisTask, payload: &Value) -> Result<Value, AnalysisError> {
        let prompt = format!(
            "{}\n{}",
            task.prompt(),
            serde_json::to_string(payload).unwrap_or_default()
        );

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"responseMimeType": "application/json"}
        });

        debug!("Requesting {} analysis from {}", task.name(), self.model);
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout
                } else {
                    AnalysisError::Http(e)
                }
            })?
            .error_for_status()
            .map_err(AnalysisError::Http)?;

        let parsed: GenerateContentResponse =
            response.json().await.map_err(AnalysisError::Http)?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AnalysisError::EmptyResponse)?;

        Ok(coerce_reply(&text))
    }
}

/// Interpret the model reply as JSON; a reply that is not valid JSON
/// (despite the prompt contract) is preserved verbatim under `summary`.
fn coerce_reply(text: &str) -> Value {
    let stripped = strip_code_fence(text);
    match serde_json::from_str(stripped) {
        Ok(value) => value,
        Err(_) => {
            warn!("Analysis reply was not valid JSON; wrapping as summary");
            json!({"summary": stripped})
        }
    }
}

/// Models occasionally wrap the object in a markdown code fence anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
