//! Router assembly and shared SSE plumbing.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Router,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
};
use futures_core::stream::Stream;
use tokio::sync::mpsc::Receiver;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{config::Config, main_lib::AppState};
use stockscope_core::ProgressEvent;

pub mod fundamentals;
pub mod health;
pub mod market;
pub mod news;

/// Buffer for one run's event stream; progress overflow is dropped by
/// the sink, never the terminal event.
pub(crate) const EVENT_BUFFER: usize = 64;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    // The timeout layer covers the request/response endpoints only; SSE
    // runs are long-lived and end with their terminal event.
    let api = Router::new()
        .route("/api/v1/healthz", get(health::healthz))
        .route("/api/v1/readyz", get(health::readyz))
        .merge(fundamentals::router())
        .layer(TimeoutLayer::new(config.request_timeout));

    Router::new()
        .merge(api)
        .merge(market::router())
        .merge(news::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Turn a run's event receiver into an SSE response. The stream closes
/// when the run drops its sink, which happens right after the terminal
/// event.
pub(crate) fn sse_response(
    rx: Receiver<ProgressEvent>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = tokio_stream::StreamExt::filter_map(ReceiverStream::new(rx), |event| {
        match SseEvent::default().json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(err) => {
                tracing::error!("Failed to serialize SSE event: {}", err);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
