//! # Control-Plane Errors
//!
//! A single error taxonomy shared by every component. Validation errors are
//! raised synchronously before any state is touched; resolution errors carry
//! enough classification for the caller's own retry policy.

use crate::models::ids::{ActorHandleId, ActorId, ObjectId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlPlaneError {
    #[error("Identifier allocation failed: {0}")]
    Allocation(String),
    #[error("Stale actor handle {handle_id}: {reason}")]
    StaleHandle {
        handle_id: ActorHandleId,
        actor_id: Option<ActorId>,
        reason: String,
    },
    #[error("Object {object_id} is not yet available")]
    ObjectUnavailable { object_id: ObjectId },
    #[error("Object {object_id} is lost")]
    ObjectLost { object_id: ObjectId },
    #[error("Malformed argument: {0}")]
    MalformedArgument(String),
    #[error("Duplicate resource key: {key}")]
    DuplicateResourceKey { key: String },
    #[error("Negative resource quantity for {key}: {value}")]
    NegativeResourceQuantity { key: String, value: f64 },
    #[error("Invalid task spec: {0}")]
    InvalidTaskSpec(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Task sink error: {0}")]
    Sink(String),
}

/// How a caller should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Nothing the caller can do; the process should stop using this path
    Fatal,
    /// Transient; the same operation may succeed later
    Retryable,
    /// The owning task must be executed again to recover
    Reexecute,
    /// Input was rejected before any side effect; fix it and resubmit
    Rejected,
}

impl ControlPlaneError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Allocation(_) => ErrorClass::Fatal,
            Self::StaleHandle { .. } | Self::ObjectUnavailable { .. } | Self::Sink(_) => {
                ErrorClass::Retryable
            }
            Self::ObjectLost { .. } => ErrorClass::Reexecute,
            Self::MalformedArgument(_)
            | Self::DuplicateResourceKey { .. }
            | Self::NegativeResourceQuantity { .. }
            | Self::InvalidTaskSpec(_)
            | Self::Configuration(_) => ErrorClass::Rejected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    pub(crate) fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::InvalidTaskSpec(reason.into())
    }

    pub(crate) fn stale_handle(
        handle_id: ActorHandleId,
        actor_id: Option<ActorId>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StaleHandle {
            handle_id,
            actor_id,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ControlPlaneError {
    fn from(error: serde_json::Error) -> Self {
        ControlPlaneError::MalformedArgument(format!("JSON serialization error: {error}"))
    }
}

impl From<config::ConfigError> for ControlPlaneError {
    fn from(error: config::ConfigError) -> Self {
        ControlPlaneError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ControlPlaneError>;
