//! Orchestrator and pipeline error types.

use thiserror::Error;

use stockscope_analysis::AnalysisError;
use stockscope_market_data::FetchError;
use stockscope_store::StoreError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// The consumer went away; the run stops without a terminal event.
    #[error("Run cancelled by consumer")]
    Cancelled,

    /// A cached record did not carry the kind its key promises.
    #[error("Cached record has unexpected kind for {key}")]
    KindMismatch { key: String },
}
