//! News endpoints: streaming collect and process runs.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event as SseEvent, Sse},
    routing::get,
};
use futures_core::stream::Stream;
use serde::Deserialize;

use crate::{
    api::{EVENT_BUFFER, sse_response},
    main_lib::AppState,
};
use stockscope_core::{Collector, ProgressEvent, ProgressSink};
use stockscope_market_data::Symbol;

#[derive(Deserialize)]
pub struct NewsQuery {
    /// Lookback window in days; also selects the article cap.
    #[serde(default = "default_period")]
    pub period: u32,
    #[serde(default)]
    pub force: bool,
}

fn default_period() -> u32 {
    7
}

/// Article cap per lookback window.
fn article_cap(period: u32) -> usize {
    match period {
        0 => 50,
        1 => 30,
        7 => 100,
        _ => 200,
    }
}

async fn news_stream(
    State(state): State<Arc<AppState>>,
    Path((function, source, symbol)): Path<(String, String, String)>,
    Query(query): Query<NewsQuery>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (sink, rx) = ProgressSink::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        run_news(state, function, source, symbol, query, sink).await;
    });

    sse_response(rx)
}

async fn run_news(
    state: Arc<AppState>,
    function: String,
    source: String,
    symbol: String,
    query: NewsQuery,
    sink: ProgressSink,
) {
    let Some(adapter) = state.adapter(&source) else {
        sink.finish(ProgressEvent::error(format!("Unknown source '{}'", source)))
            .await;
        return;
    };
    let parsed = match Symbol::parse(&symbol) {
        Ok(parsed) => parsed,
        Err(e) => {
            sink.finish(ProgressEvent::error(e.to_string())).await;
            return;
        }
    };

    let limit = article_cap(query.period);
    let collector = Collector::new(adapter, state.store.clone(), state.flight.clone());
    match function.as_str() {
        "collect" => {
            collector
                .run_news(&parsed, query.period, limit, query.force, &sink)
                .await;
        }
        "process" => {
            state
                .pipeline
                .process_news(&collector, &parsed, query.period, limit, query.force, &sink)
                .await;
        }
        other => {
            sink.finish(ProgressEvent::error(format!("Unknown function '{}'", other)))
                .await;
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/news/{function}/{source}/{symbol}", get(news_stream))
}
