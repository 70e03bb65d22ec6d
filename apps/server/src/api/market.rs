//! Price endpoints: streaming collect and process runs.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event as SseEvent, Sse},
    routing::get,
};
use chrono::{Days, NaiveDate, Utc};
use futures_core::stream::Stream;
use serde::Deserialize;

use crate::{
    api::{EVENT_BUFFER, sse_response},
    main_lib::AppState,
};
use stockscope_core::{Collector, ProgressEvent, ProgressSink};
use stockscope_market_data::Symbol;

/// Lookback when the caller omits a date range.
const DEFAULT_RANGE_DAYS: u64 = 180;

#[derive(Deserialize)]
pub struct MarketQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub force: bool,
}

async fn market_stream(
    State(state): State<Arc<AppState>>,
    Path((function, source, symbol)): Path<(String, String, String)>,
    Query(query): Query<MarketQuery>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (sink, rx) = ProgressSink::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        run_market(state, function, source, symbol, query, sink).await;
    });

    sse_response(rx)
}

async fn run_market(
    state: Arc<AppState>,
    function: String,
    source: String,
    symbol: String,
    query: MarketQuery,
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

    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = query
        .start_date
        .unwrap_or_else(|| end - Days::new(DEFAULT_RANGE_DAYS));

    let collector = Collector::new(adapter, state.store.clone(), state.flight.clone());
    match function.as_str() {
        "collect" => {
            collector
                .run_prices(&parsed, start, end, query.force, &sink)
                .await;
        }
        "process" => {
            state
                .pipeline
                .process_prices(&collector, &parsed, start, end, query.force, &sink)
                .await;
        }
        other => {
            sink.finish(ProgressEvent::error(format!("Unknown function '{}'", other)))
                .await;
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/market/{function}/{source}/{symbol}", get(market_stream))
}
