use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use stockscope_analysis::AnalysisError;
use stockscope_core::CoreError;
use stockscope_market_data::FetchError;
use stockscope_store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not Found")]
    NotFound,
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fetch(FetchError::InvalidSymbol(s)) => {
                ApiError::BadRequest(format!("Symbol format not recognized: {}", s))
            }
            CoreError::Fetch(FetchError::SymbolNotFound { .. }) => ApiError::NotFound,
            CoreError::Fetch(e) => ApiError::Upstream(e.to_string()),
            CoreError::Analysis(e) => ApiError::Upstream(e.to_string()),
            CoreError::Store(e) => ApiError::Internal(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        CoreError::Fetch(err).into()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Upstream(reason) => (StatusCode::BAD_GATEWAY, reason.clone()),
            ApiError::Internal(reason) => (StatusCode::INTERNAL_SERVER_ERROR, reason.clone()),
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
