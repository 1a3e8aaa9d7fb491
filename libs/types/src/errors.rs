//! Error types for identifier parsing

use thiserror::Error;

/// Failure to parse an identifier from its textual form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("Invalid hex identifier: {input}")]
    InvalidHex { input: String },

    #[error("Invalid identifier length: expected 32 bytes, got {length}")]
    InvalidLength { length: usize },
}
