use thiserror::Error;

use crate::domain::room::RoomId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Credential rejected by the gate. Carries no detail about which part failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid or missing token")]
    InvalidToken,
    #[error("caller identity does not match the bound identity")]
    IdentityMismatch,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },
    #[error("target matches {} rooms", candidates.len())]
    AmbiguousTarget { candidates: Vec<RoomId> },
    #[error("intent resolution timed out after {timeout_ms}ms")]
    ResolutionTimeout { timeout_ms: u64 },
}

impl IntentError {
    pub fn missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingFields { fields: fields.into_iter().map(Into::into).collect() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no active room matches {selector}")]
    NotFound { selector: String },
    #[error("caller may not modify room {id}")]
    Forbidden { id: RoomId },
    #[error("selector matches {count} rooms")]
    Ambiguous { count: usize },
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("room store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid arguments: {}", fields.join(", "))]
    InvalidArguments { fields: Vec<String> },
    #[error("unknown tool `{name}`")]
    UnknownTool { name: String },
}

impl StoreError {
    /// Whether the failure is the caller's to fix, as opposed to an infrastructure fault.
    pub fn is_caller_fault(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}
