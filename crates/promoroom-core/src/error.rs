//! Error types for promoroom-core.
//!
//! The engine recovers from every failure locally (a failed step logs and
//! becomes a no-op), so the hierarchy only covers the fallible parsing
//! seams.

use thiserror::Error;

/// Core error type for promoroom-core.
#[derive(Error, Debug)]
pub enum AdsError {
    /// Client state blob could not be encoded or decoded.
    #[error("client state serialization failed: {0}")]
    ClientState(#[source] serde_json::Error),

    /// Bundle payload could not be decoded.
    #[error("bundle deserialization failed: {0}")]
    Bundle(#[source] serde_json::Error),

    /// Bundle decoded but carries no categories.
    #[error("bundle does not contain any categories")]
    EmptyBundle,
}

/// Result type alias for AdsError.
pub type Result<T, E = AdsError> = std::result::Result<T, E>;
