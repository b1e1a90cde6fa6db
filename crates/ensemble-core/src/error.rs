//! Error types for Ensemble core types

use thiserror::Error;

/// Errors related to identity and group identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid hex identifier: {0}")]
    InvalidHex(String),

    #[error("Identifier must not be empty")]
    Empty,
}

/// Errors related to group type encoding
#[derive(Debug, Error)]
pub enum GroupTypeError {
    #[error("Group type JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown group type: {0}")]
    UnknownType(String),

    #[error("Custom group type is missing field: {0}")]
    MissingField(&'static str),
}
