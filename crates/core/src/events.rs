//! Progress events and the channel they travel on.
//!
//! A run emits any number of `progress` events followed by exactly one
//! terminal event (`result`, `final` or `error`). Terminal delivery is
//! awaited; intermediate progress is lossy so a slow consumer can never
//! stall a collection run.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// One message on a run's event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        step: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        current: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    Result {
        data: Value,
    },
    Final {
        result: Value,
        analysis: Value,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn step(step: &str, current: usize, total: usize) -> Self {
        Self::Progress {
            step: step.to_string(),
            current: Some(current),
            total: Some(total),
            status: None,
        }
    }

    pub fn status(step: &str, status: &str) -> Self {
        Self::Progress {
            step: step.to_string(),
            current: None,
            total: None,
            status: Some(status.to_string()),
        }
    }

    pub fn result(data: Value) -> Self {
        Self::Result { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Terminal events end the stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Sending half of a run's event stream.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
    terminated: Arc<AtomicBool>,
}

impl ProgressSink {
    /// Create a sink and its receiving end with a bounded buffer.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                terminated: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Emit an intermediate progress event. Never blocks; if the buffer
    /// is full the event is dropped.
    pub fn emit(&self, event: ProgressEvent) {
        debug_assert!(!event.is_terminal());
        if self.terminated.load(Ordering::Acquire) {
            return;
        }
        if self.tx.try_send(event).is_err() {
            debug!("Progress event dropped (consumer slow or gone)");
        }
    }

    /// Deliver the terminal event. Waits for buffer space so the terminal
    /// is never lost to a momentarily full channel; a dropped receiver is
    /// ignored. The sink refuses everything afterwards.
    pub async fn finish(&self, event: ProgressEvent) {
        debug_assert!(event.is_terminal());
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.tx.send(event).await;
    }

    /// True once the consumer dropped the receiving end.
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }
}
