//! Region-of-interest providers.
//!
//! A provider samples frames from a source asset and reports boxes around
//! content that must survive adaptation (logos, on-screen text, faces).
//! Detection is best-effort: providers report `DetectionUnavailable` and the
//! caller decides whether to continue without ROIs.

pub mod error;
pub mod fixed;
pub mod gemini;
pub mod provider;
pub mod types;

pub use error::{RoiError, RoiResult};
pub use fixed::{DisabledRoiProvider, FixedRoiProvider};
pub use gemini::{GeminiConfig, GeminiRoiProvider};
pub use provider::{RoiProvider, SamplingParams};
