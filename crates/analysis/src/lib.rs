//! Stockscope Analysis
//!
//! Narrow async seam to an external analysis collaborator. The pipeline
//! hands over a JSON payload and a task kind; the collaborator returns a
//! structured JSON analysis. [`GeminiAnalysis`] is the production
//! implementation; tests substitute their own [`AnalysisService`].

mod gemini;
pub mod prompts;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use gemini::GeminiAnalysis;

/// Which kind of payload is being analyzed; selects the prompt template.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnalysisTask {
    Market,
    News,
    Fundamentals,
}

impl AnalysisTask {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Market => prompts::MARKET_PROMPT,
            Self::News => prompts::NEWS_PROMPT,
            Self::Fundamentals => prompts::FUNDAMENTALS_PROMPT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::News => "news",
            Self::Fundamentals => "fundamentals",
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis API key is not configured")]
    MissingApiKey,

    #[error("Analysis request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Analysis request timed out")]
    Timeout,

    #[error("Analysis service returned an empty response")]
    EmptyResponse,
}

/// The external analysis collaborator.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Analyze `payload` according to `task`. The result is always a JSON
    /// object, even when the upstream reply was free text.
    async fn analyze(&self, task: AnalysisTask, payload: &Value) -> Result<Value, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_task_selects_a_distinct_prompt() {
        let prompts = [
            AnalysisTask::Market.prompt(),
            AnalysisTask::News.prompt(),
            AnalysisTask::Fundamentals.prompt(),
        ];
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        // Every template pins the JSON reply contract.
        assert!(prompts.iter().all(|p| p.contains("valid JSON object")));
    }
}
