use crate::core::error::TransitionError;
use crate::models::{ArchiveReason, Match, MatchState, UserId};
use chrono::{DateTime, Utc};

/// Result of applying a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Changed(Match),
    /// Idempotent repeat (graceful exit on an already gracefully-exited match)
    Unchanged(Match),
}

impl TransitionOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, TransitionOutcome::Changed(_))
    }

    pub fn into_match(self) -> Match {
        match self {
            TransitionOutcome::Changed(m) | TransitionOutcome::Unchanged(m) => m,
        }
    }
}

pub fn is_terminal(state: MatchState) -> bool {
    matches!(
        state,
        MatchState::Unmatched | MatchState::GracefulExit | MatchState::Blocked
    )
}

pub fn can_transition(from: MatchState, to: MatchState) -> bool {
    use MatchState::*;
    match from {
        Active => matches!(to, Friends | Unmatched | GracefulExit | Blocked),
        Friends => matches!(to, Unmatched | GracefulExit | Blocked),
        Unmatched | GracefulExit | Blocked => false,
    }
}

pub fn can_message(state: MatchState) -> bool {
    matches!(state, MatchState::Active | MatchState::Friends)
}

/// Validate and apply `to` on `current`.
///
/// Checks run in order: participant, idempotent graceful exit, terminal
/// source, transition table.
pub fn apply_transition(
    current: &Match,
    to: MatchState,
    initiator: UserId,
    reason: Option<ArchiveReason>,
    at: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionError> {
    if !current.involves(initiator) {
        return Err(TransitionError::NotAuthorized);
    }

    let from = current.state;
    if from == MatchState::GracefulExit && to == MatchState::GracefulExit {
        return Ok(TransitionOutcome::Unchanged(current.clone()));
    }
    if is_terminal(from) {
        return Err(TransitionError::AlreadyTerminal { state: from });
    }
    if !can_transition(from, to) {
        return Err(TransitionError::InvalidTransition { from, to });
    }

    let mut next = current.clone();
    next.state = to;
    next.state_changed_at = at;
    if is_terminal(to) {
        next.end_reason = reason.or_else(|| default_reason(to));
        next.ended_by = Some(initiator);
    }
    Ok(TransitionOutcome::Changed(next))
}

fn default_reason(to: MatchState) -> Option<ArchiveReason> {
    match to {
        MatchState::GracefulExit => Some(ArchiveReason::GracefulExit),
        MatchState::Unmatched => Some(ArchiveReason::Unmatch),
        MatchState::Blocked => Some(ArchiveReason::Block),
        MatchState::Active | MatchState::Friends => None,
    }
}
