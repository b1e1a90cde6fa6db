//! Error types for ensemble-groups

use ensemble_core::GroupTypeError;
use thiserror::Error;

/// Errors reported by the group engine collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine refused the update
    #[error("group update rejected: {0}")]
    Rejected(String),

    /// The engine could not be reached
    #[error("group engine unavailable")]
    Unavailable,
}

/// Errors that can occur in the group session layer
#[derive(Debug, Error)]
pub enum GroupsError {
    /// The session task has stopped
    #[error("group session closed")]
    SessionClosed,

    /// Group engine error
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Group type could not be encoded
    #[error("group type error: {0}")]
    GroupType(#[from] GroupTypeError),

    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Scenario file could not be read
    #[error("scenario error: {0}")]
    Scenario(String),
}

impl From<serde_json::Error> for GroupsError {
    fn from(e: serde_json::Error) -> Self {
        GroupsError::Serialization(e.to_string())
    }
}

impl From<postcard::Error> for GroupsError {
    fn from(e: postcard::Error) -> Self {
        GroupsError::Serialization(e.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for GroupsError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        GroupsError::SessionClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for GroupsError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        GroupsError::SessionClosed
    }
}

/// Result type for group session operations
pub type GroupsResult<T> = Result<T, GroupsError>;
