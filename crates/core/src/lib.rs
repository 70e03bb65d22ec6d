//! Stockscope Core
//!
//! Collection orchestrator and processing pipeline: the policy layer
//! between the HTTP surface and the source adapters. Owns cache-or-compute
//! decisions, pacing, retry, single-flight, progress event streams and the
//! hand-off to the analysis collaborator.

pub mod collect;
pub mod errors;
pub mod events;
pub mod flight;
pub mod pacer;
pub mod pipeline;
pub mod policy;

pub use collect::Collector;
pub use errors::CoreError;
pub use events::{ProgressEvent, ProgressSink};
pub use flight::{FlightGuard, FlightPermit};
pub use pacer::Pacer;
pub use pipeline::Pipeline;
