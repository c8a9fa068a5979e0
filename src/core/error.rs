use crate::core::locks::LockTimeout;
use crate::models::MatchState;
use crate::services::StorageError;
use std::time::Duration;
use thiserror::Error;

/// Rejections from the relationship state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move a relationship from {from} to {to}")]
    InvalidTransition { from: MatchState, to: MatchState },

    #[error("relationship already ended ({state})")]
    AlreadyTerminal { state: MatchState },

    #[error("user is not part of this relationship")]
    NotAuthorized,
}

/// Errors surfaced by the matching engine and the transition coordinator
///
/// Display strings are stable and safe to show to end users; storage
/// details stay in the `source()` chain.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot move a relationship from {from} to {to}")]
    InvalidTransition { from: MatchState, to: MatchState },

    #[error("relationship already ended ({state})")]
    AlreadyTerminal { state: MatchState },

    #[error("user is not part of this relationship")]
    NotAuthorized,

    #[error("one of these users has blocked the other")]
    Blocked,

    #[error("this relationship has ended and cannot be swiped on again")]
    RelationshipTerminated { state: MatchState },

    #[error("message must be at least {min} characters")]
    MessageTooShort { min: usize },

    #[error("a friend request is already pending for this match")]
    RequestPending,

    #[error("friend request was already answered")]
    AlreadyResponded,

    #[error("daily friend request limit of {limit} reached")]
    RateLimited { limit: u32 },

    #[error("an active match is required")]
    NoActiveMatch,

    #[error("no relationship found between these users")]
    MatchNotFound,

    #[error("friend request not found")]
    RequestNotFound,

    #[error("no swipe to undo")]
    NothingToUndo,

    #[error("undo window of {window_secs}s has expired")]
    UndoWindowExpired { window_secs: u64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("timed out after {0:?} waiting for a concurrent operation on this user")]
    LockTimeout(Duration),

    #[error("concurrent update detected, please retry")]
    StorageConflict(#[source] StorageError),

    #[error("storage unavailable")]
    Storage(#[source] StorageError),
}

impl EngineError {
    /// Contention errors a caller may retry with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::LockTimeout(_) | EngineError::StorageConflict(_))
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::AlreadyTerminal { .. } => "already_terminal",
            EngineError::NotAuthorized => "not_authorized",
            EngineError::Blocked => "blocked",
            EngineError::RelationshipTerminated { .. } => "relationship_terminated",
            EngineError::MessageTooShort { .. } => "message_too_short",
            EngineError::RequestPending => "request_pending",
            EngineError::AlreadyResponded => "already_responded",
            EngineError::RateLimited { .. } => "rate_limited",
            EngineError::NoActiveMatch => "no_active_match",
            EngineError::MatchNotFound => "match_not_found",
            EngineError::RequestNotFound => "request_not_found",
            EngineError::NothingToUndo => "nothing_to_undo",
            EngineError::UndoWindowExpired { .. } => "undo_window_expired",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::LockTimeout(_) => "lock_timeout",
            EngineError::StorageConflict(_) => "storage_conflict",
            EngineError::Storage(_) => "storage_error",
        }
    }
}

impl From<TransitionError> for EngineError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::InvalidTransition { from, to } => {
                EngineError::InvalidTransition { from, to }
            }
            TransitionError::AlreadyTerminal { state } => EngineError::AlreadyTerminal { state },
            TransitionError::NotAuthorized => EngineError::NotAuthorized,
        }
    }
}

impl From<LockTimeout> for EngineError {
    fn from(value: LockTimeout) -> Self {
        EngineError::LockTimeout(value.waited)
    }
}

impl From<StorageError> for EngineError {
    fn from(value: StorageError) -> Self {
        if value.is_conflict() {
            EngineError::StorageConflict(value)
        } else {
            EngineError::Storage(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(EngineError::LockTimeout(Duration::from_millis(5)).is_retryable());
        assert!(EngineError::StorageConflict(StorageError::Conflict("dup".into())).is_retryable());
        assert!(!EngineError::NotAuthorized.is_retryable());
        assert!(!EngineError::RateLimited { limit: 5 }.is_retryable());
    }

    #[test]
    fn test_storage_errors_are_wrapped() {
        let err: EngineError = StorageError::Corrupt("bad enum in row".into()).into();
        assert_eq!(err.code(), "storage_error");
        assert_eq!(err.to_string(), "storage unavailable");

        let err: EngineError = StorageError::Conflict("duplicate key".into()).into();
        assert_eq!(err.code(), "storage_conflict");
        assert!(!err.to_string().contains("duplicate key"));
    }
}
