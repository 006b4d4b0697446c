//! # Error Types
//!
//! Errors shared across crates.

use thiserror::Error;

/// Errors from encoding or decoding shared framings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input was empty.
    #[error("Empty input")]
    Empty,

    /// Serialization failed.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Deserialization failed.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Hex string could not be parsed.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
