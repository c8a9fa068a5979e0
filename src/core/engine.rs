use crate::config::MatchingSettings;
use crate::core::clock::{Clock, SystemClock};
use crate::core::error::EngineError;
use crate::core::locks::UserLockRegistry;
use crate::core::state_machine::{apply_transition, is_terminal};
use crate::models::{
    ArchiveReason, ConversationId, Direction, Like, Match, MatchId, MatchState, UserId,
};
use crate::services::{Storage, UnitOfWork};
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a swipe
#[derive(Debug, Clone, Serialize)]
pub struct SwipeResult {
    pub matched: bool,
    pub r#match: Option<Match>,
    pub like: Like,
    /// True only for the swipe that created the match
    pub new_match: bool,
}

/// Outcome of undoing a swipe
#[derive(Debug, Clone, Serialize)]
pub struct UndoResult {
    pub undone: Like,
    /// Match ended because its triggering like was withdrawn
    pub unmatched: Option<Match>,
}

/// Records swipes and turns mutual likes into matches
///
/// Every call runs under the pairwise user lock and commits exactly one
/// unit of work.
#[derive(Clone)]
pub struct MatchingEngine {
    storage: Arc<dyn Storage>,
    locks: UserLockRegistry,
    clock: Arc<dyn Clock>,
    settings: MatchingSettings,
}

impl MatchingEngine {
    pub fn new(storage: Arc<dyn Storage>, locks: UserLockRegistry, settings: MatchingSettings) -> Self {
        Self {
            storage,
            locks,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn locks(&self) -> &UserLockRegistry {
        &self.locks
    }

    /// Record `from` swiping on `to`, creating the match on a mutual like.
    ///
    /// A write conflict from the store is retried up to
    /// `conflict_retries` times. A retry re-reads the pair, so a match
    /// created by a competing transaction is returned instead of an error.
    pub async fn record_swipe(
        &self,
        from: UserId,
        to: UserId,
        direction: Direction,
    ) -> Result<SwipeResult, EngineError> {
        if from == to {
            return Err(EngineError::InvalidRequest(
                "users cannot swipe on themselves".to_string(),
            ));
        }

        let _pair = self.locks.acquire_pair(from, to).await?;

        let mut attempt = 0;
        loop {
            match self.try_record_swipe(from, to, direction).await {
                Err(EngineError::StorageConflict(source))
                    if attempt < self.settings.conflict_retries =>
                {
                    attempt += 1;
                    warn!(
                        "Swipe {} -> {} hit a write conflict (attempt {}): {}",
                        from, to, attempt, source
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_record_swipe(
        &self,
        from: UserId,
        to: UserId,
        direction: Direction,
    ) -> Result<SwipeResult, EngineError> {
        let now = self.clock.now();
        let match_id = MatchId::for_pair(from, to);
        let mut uow = self.storage.begin().await?;

        if uow.is_blocked(from, to).await? {
            return Err(EngineError::Blocked);
        }
        if let Some(existing) = uow.get_match(&match_id).await? {
            match existing.state {
                MatchState::Blocked => return Err(EngineError::Blocked),
                state if is_terminal(state) => {
                    return Err(EngineError::RelationshipTerminated { state })
                }
                _ => {}
            }
        }

        let like = uow.upsert_like(from, to, direction, now).await?;
        debug!("Recorded {:?} from {} to {}", direction, from, to);

        let mut outcome = None;
        if direction == Direction::Like && uow.find_mutual_like(to, from).await? {
            let (found, created) = uow.create_match_if_absent(&match_id, from, to, now).await?;
            uow.get_or_create_by_users(from, to, now).await?;
            outcome = Some((found, created));
        }

        uow.commit().await?;

        let new_match = matches!(outcome, Some((_, true)));
        if new_match {
            info!("Match {} created", match_id);
        }
        Ok(SwipeResult {
            matched: outcome.is_some(),
            r#match: outcome.map(|(m, _)| m),
            like,
            new_match,
        })
    }

    /// Withdraw `user`'s most recent swipe if it is still inside the undo window.
    pub async fn undo_last_swipe(&self, user: UserId) -> Result<UndoResult, EngineError> {
        let latest = {
            let mut uow = self.storage.begin().await?;
            uow.latest_like_by(user).await?
        };
        let latest = latest.ok_or(EngineError::NothingToUndo)?;
        self.ensure_within_window(&latest)?;

        let target = latest.to_user;
        let _pair = self.locks.acquire_pair(user, target).await?;

        let now = self.clock.now();
        let mut uow = self.storage.begin().await?;

        // re-read under the lock; the swipe may have been replaced meanwhile
        let like = match uow.get_like(user, target).await? {
            Some(like) if !like.is_deleted() => like,
            _ => return Err(EngineError::NothingToUndo),
        };
        self.ensure_within_window(&like)?;

        uow.soft_delete_like(user, target, now).await?;

        let mut unmatched = None;
        if like.direction == Direction::Like {
            unmatched = self.end_untouched_match(uow.as_mut(), user, target).await?;
        }

        uow.commit().await?;

        info!("User {} undid swipe on {}", user, target);
        let mut undone = like;
        undone.deleted_at = Some(now);
        Ok(UndoResult { undone, unmatched })
    }

    fn ensure_within_window(&self, like: &Like) -> Result<(), EngineError> {
        let window = Duration::seconds(self.settings.undo_window_secs as i64);
        if self.clock.now().signed_duration_since(like.created_at) > window {
            return Err(EngineError::UndoWindowExpired {
                window_secs: self.settings.undo_window_secs,
            });
        }
        Ok(())
    }

    /// A match that never left ACTIVE is unmatched once a like behind it is gone.
    async fn end_untouched_match(
        &self,
        uow: &mut dyn UnitOfWork,
        user: UserId,
        target: UserId,
    ) -> Result<Option<Match>, EngineError> {
        let match_id = MatchId::for_pair(user, target);
        let existing = match uow.get_match(&match_id).await? {
            Some(m) if m.state == MatchState::Active && m.state_changed_at == m.created_at => m,
            _ => return Ok(None),
        };

        let now = self.clock.now();
        let ended = apply_transition(
            &existing,
            MatchState::Unmatched,
            user,
            Some(ArchiveReason::Unmatch),
            now,
        )?
        .into_match();
        uow.update_match_state(&ended).await?;

        let convo_id = ConversationId::for_pair(user, target);
        if let Some(convo) = uow.get_conversation(&convo_id).await? {
            if !convo.is_archived() {
                uow.archive(&convo_id, ArchiveReason::Unmatch, now).await?;
            }
        }
        Ok(Some(ended))
    }
}
