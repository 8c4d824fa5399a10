use thiserror::Error;

use super::EntityKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MirrorError {
    #[error("Field '{field}' is not fillable on {kind}")]
    NotFillable { kind: EntityKind, field: String },

    #[error("Operation '{operation}' is not supported by {kind}")]
    Unsupported {
        kind: EntityKind,
        operation: &'static str,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Request to '{path}' failed: {reason}")]
    RequestFailed { path: String, reason: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Attribute '{0}' is already being resolved on this entity")]
    RecomputationCycle(String),

    #[error("{kind} with key '{key}' already exists in collection")]
    DuplicateKey { kind: EntityKind, key: String },

    #[error("{0} has no key and cannot be stored in a collection")]
    MissingKey(EntityKind),

    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
}

impl MirrorError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    pub fn request_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}
