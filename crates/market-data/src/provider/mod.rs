//! Source adapter implementations.
//!
//! Each submodule binds the [`SourceAdapter`] capability set to one
//! external provider and one market convention.

mod capabilities;
mod traits;

pub mod fnguide;
pub mod naver;
pub mod yahoo;

pub use capabilities::{AdapterCapabilities, RateLimit};
pub use traits::SourceAdapter;
