//! Synchronous fundamentals endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use stockscope_market_data::{FinancialStatement, Market, Symbol};

#[derive(Deserialize)]
pub struct FundamentalsQuery {
    #[serde(default)]
    pub nocache: bool,
}

/// Statement source per market: Korean codes go to FnGuide, US tickers
/// to Yahoo.
fn source_for(market: Market) -> &'static str {
    match market {
        Market::Kr => "fnguide",
        Market::Us => "yahoo",
    }
}

async fn get_fundamentals(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<FundamentalsQuery>,
) -> ApiResult<Json<FinancialStatement>> {
    let symbol = Symbol::parse(&ticker)?;
    let source = source_for(symbol.market());
    let adapter = state
        .adapter(source)
        .ok_or_else(|| ApiError::Internal(format!("Adapter '{}' not registered", source)))?;

    let statement = state
        .pipeline
        .fundamentals(adapter, &symbol, query.nocache)
        .await?;
    Ok(Json(statement))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/fundamentals/{ticker}", get(get_fundamentals))
}
