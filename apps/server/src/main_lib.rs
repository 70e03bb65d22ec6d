use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;
use stockscope_analysis::{AnalysisError, AnalysisService, AnalysisTask, GeminiAnalysis};
use stockscope_core::{FlightGuard, Pipeline};
use stockscope_market_data::{
    FnGuideAdapter, NaverAdapter, NaverApiKeys, YahooAdapter, provider::SourceAdapter,
};
use stockscope_store::CacheStore;

pub struct AppState {
    /// Source adapters keyed by their id, the `source` path segment.
    pub adapters: HashMap<&'static str, Arc<dyn SourceAdapter>>,
    pub store: CacheStore,
    pub pipeline: Pipeline,
    /// App-wide single-flight guard, shared by collect and process runs.
    pub flight: FlightGuard,
}

impl AppState {
    pub fn adapter(&self, source: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(source).cloned()
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("SS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Placeholder collaborator when no API key is configured; the server
/// still serves collection and cached data.
struct DisabledAnalysis;

#[async_trait]
impl AnalysisService for DisabledAnalysis {
    async fn analyze(&self, _task: AnalysisTask, _payload: &Value) -> Result<Value, AnalysisError> {
        Err(AnalysisError::MissingApiKey)
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = CacheStore::open(&config.db_path)?;
    tracing::info!("Cache database in use: {}", config.db_path);

    let naver_keys = match (&config.naver_client_id, &config.naver_client_secret) {
        (Some(id), Some(secret)) => Some(NaverApiKeys {
            client_id: id.clone(),
            client_secret: secret.clone(),
        }),
        _ => {
            tracing::warn!("Naver Open API credentials missing; naver news listing disabled");
            None
        }
    };

    let mut adapters: HashMap<&'static str, Arc<dyn SourceAdapter>> = HashMap::new();
    for adapter in [
        Arc::new(YahooAdapter::new()?) as Arc<dyn SourceAdapter>,
        Arc::new(NaverAdapter::new(naver_keys)?) as Arc<dyn SourceAdapter>,
        Arc::new(FnGuideAdapter::new()?) as Arc<dyn SourceAdapter>,
    ] {
        adapters.insert(adapter.id(), adapter);
    }

    let analysis: Arc<dyn AnalysisService> = match &config.gemini_api_key {
        Some(key) => Arc::new(GeminiAnalysis::new(key.clone(), config.gemini_model.clone())?),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; process endpoints will fail at analysis");
            Arc::new(DisabledAnalysis)
        }
    };

    let flight = FlightGuard::new();
    let pipeline = Pipeline::new(store.clone(), analysis, flight.clone());

    Ok(Arc::new(AppState {
        adapters,
        store,
        pipeline,
        flight,
    }))
}
