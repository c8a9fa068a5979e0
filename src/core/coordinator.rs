use crate::config::RelationshipSettings;
use crate::core::clock::{start_of_day, Clock, SystemClock};
use crate::core::error::EngineError;
use crate::core::locks::UserLockRegistry;
use crate::core::state_machine::{apply_transition, is_terminal, TransitionOutcome};
use crate::models::{
    ArchiveReason, Block, Conversation, ConversationId, FriendRequest, FriendRequestStatus, Match,
    MatchId, MatchState, Notification, NotificationPayload, UserId,
};
use crate::services::{Storage, UnitOfWork};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Moves matches through their lifecycle
///
/// Each operation locks both users and commits the match, conversation,
/// friend request and notification writes in one unit of work.
#[derive(Clone)]
pub struct RelationshipTransitionCoordinator {
    storage: Arc<dyn Storage>,
    locks: UserLockRegistry,
    clock: Arc<dyn Clock>,
    settings: RelationshipSettings,
}

impl RelationshipTransitionCoordinator {
    pub fn new(
        storage: Arc<dyn Storage>,
        locks: UserLockRegistry,
        settings: RelationshipSettings,
    ) -> Self {
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

    /// Ask `to` to turn an active match into a friendship.
    ///
    /// # Errors
    /// * `NoActiveMatch` - the pair has no ACTIVE match
    /// * `MessageTooShort` - trimmed message under the configured minimum
    /// * `RequestPending` - an earlier request from `from` is unanswered
    /// * `RateLimited` - daily quota for `from` is used up
    pub async fn propose_friend_zone(
        &self,
        from: UserId,
        to: UserId,
        message: &str,
    ) -> Result<FriendRequest, EngineError> {
        if from == to {
            return Err(EngineError::InvalidRequest(
                "cannot send a friend request to yourself".to_string(),
            ));
        }

        let _pair = self.locks.acquire_pair(from, to).await?;
        let now = self.clock.now();
        let mut uow = self.storage.begin().await?;

        let match_id = MatchId::for_pair(from, to);
        match uow.get_match(&match_id).await? {
            Some(m) if m.state == MatchState::Active => {}
            _ => return Err(EngineError::NoActiveMatch),
        }

        let message = message.trim();
        let min = self.settings.min_friend_request_length;
        if message.chars().count() < min {
            return Err(EngineError::MessageTooShort { min });
        }

        if uow.find_pending_request(from, to, &match_id).await?.is_some() {
            return Err(EngineError::RequestPending);
        }

        let limit = self.settings.friend_requests_per_day;
        let sent_today = uow.count_requests_since(from, start_of_day(now)).await?;
        if sent_today >= limit {
            return Err(EngineError::RateLimited { limit });
        }

        let request = FriendRequest::new(from, to, message.to_string(), now);
        uow.insert_friend_request(&request).await?;
        notify(
            uow.as_mut(),
            to,
            NotificationPayload::FriendRequest {
                request_id: request.id,
                match_id: match_id.clone(),
                from_user: from,
                message: request.message.clone(),
            },
            now,
        )
        .await?;

        uow.commit().await?;
        info!("Friend request {} sent on match {}", request.id, match_id);
        Ok(request)
    }

    /// Accept or decline a pending friend request. Only the recipient may answer.
    ///
    /// The match must still be ACTIVE. Any other pending request on the same
    /// match is expired with it.
    pub async fn respond_to_friend_request(
        &self,
        request_id: Uuid,
        responder: UserId,
        accept: bool,
    ) -> Result<FriendRequest, EngineError> {
        let request = {
            let mut uow = self.storage.begin().await?;
            uow.get_friend_request(request_id).await?
        }
        .ok_or(EngineError::RequestNotFound)?;

        let _pair = self
            .locks
            .acquire_pair(request.from_user, request.to_user)
            .await?;
        let now = self.clock.now();
        let mut uow = self.storage.begin().await?;

        let mut request = uow
            .get_friend_request(request_id)
            .await?
            .ok_or(EngineError::RequestNotFound)?;
        if request.to_user != responder {
            return Err(EngineError::NotAuthorized);
        }
        if !request.is_pending() {
            return Err(EngineError::AlreadyResponded);
        }

        let current = uow
            .get_match(&request.match_id)
            .await?
            .ok_or(EngineError::MatchNotFound)?;
        if current.state != MatchState::Active {
            return Err(if is_terminal(current.state) {
                EngineError::AlreadyTerminal {
                    state: current.state,
                }
            } else {
                EngineError::NoActiveMatch
            });
        }

        let (target, reason, status) = if accept {
            (MatchState::Friends, None, FriendRequestStatus::Accepted)
        } else {
            (
                MatchState::Unmatched,
                Some(ArchiveReason::FriendZoneDeclined),
                FriendRequestStatus::Declined,
            )
        };

        let next = apply_transition(&current, target, responder, reason, now)?.into_match();
        uow.update_match_state(&next).await?;
        uow.update_friend_request_status(request.id, status, now)
            .await?;
        expire_pending_requests(uow.as_mut(), &next.id, now).await?;

        if let Some(reason) = reason {
            let convo = uow
                .get_or_create_by_users(request.from_user, request.to_user, now)
                .await?;
            if !convo.is_archived() {
                uow.archive(&convo.id, reason, now).await?;
            }
        }

        let payload = if accept {
            NotificationPayload::FriendRequestAccepted {
                request_id: request.id,
                match_id: request.match_id.clone(),
                responder,
            }
        } else {
            NotificationPayload::FriendRequestDeclined {
                request_id: request.id,
                match_id: request.match_id.clone(),
                responder,
            }
        };
        notify(uow.as_mut(), request.from_user, payload, now).await?;

        uow.commit().await?;
        info!(
            "Friend request {} {:?}; match {} is now {}",
            request.id, status, next.id, next.state
        );

        request.status = status;
        request.responded_at = Some(now);
        Ok(request)
    }

    /// End the relationship and notify `other`. Repeating it is a no-op success.
    pub async fn graceful_exit(
        &self,
        initiator: UserId,
        other: UserId,
    ) -> Result<Match, EngineError> {
        let _pair = self.locks.acquire_pair(initiator, other).await?;
        let now = self.clock.now();
        let mut uow = self.storage.begin().await?;

        let current = existing_match(uow.as_mut(), initiator, other).await?;
        let next = match apply_transition(
            &current,
            MatchState::GracefulExit,
            initiator,
            Some(ArchiveReason::GracefulExit),
            now,
        )? {
            TransitionOutcome::Unchanged(m) => {
                debug!("Match {} already gracefully exited", m.id);
                return Ok(m);
            }
            TransitionOutcome::Changed(m) => m,
        };

        uow.update_match_state(&next).await?;
        expire_pending_requests(uow.as_mut(), &next.id, now).await?;
        archive_conversation(uow.as_mut(), initiator, other, ArchiveReason::GracefulExit, now)
            .await?;
        notify(
            uow.as_mut(),
            other,
            NotificationPayload::GracefulExit {
                match_id: next.id.clone(),
                initiator,
            },
            now,
        )
        .await?;

        uow.commit().await?;
        info!("Match {} ended by graceful exit from {}", next.id, initiator);
        Ok(next)
    }

    /// End the relationship without notifying the other user.
    pub async fn unmatch(&self, initiator: UserId, other: UserId) -> Result<Match, EngineError> {
        let _pair = self.locks.acquire_pair(initiator, other).await?;
        let now = self.clock.now();
        let mut uow = self.storage.begin().await?;

        let current = existing_match(uow.as_mut(), initiator, other).await?;
        let next = apply_transition(
            &current,
            MatchState::Unmatched,
            initiator,
            Some(ArchiveReason::Unmatch),
            now,
        )?
        .into_match();

        uow.update_match_state(&next).await?;
        expire_pending_requests(uow.as_mut(), &next.id, now).await?;
        archive_conversation(uow.as_mut(), initiator, other, ArchiveReason::Unmatch, now).await?;

        uow.commit().await?;
        info!("Match {} unmatched by {}", next.id, initiator);
        Ok(next)
    }

    /// Block `blocked` for `blocker`. Safe to repeat; works with or without a match.
    ///
    /// The blocker loses access to the conversation. The blocked user's
    /// access flag is left as it was.
    pub async fn block(
        &self,
        blocker: UserId,
        blocked: UserId,
    ) -> Result<Option<Match>, EngineError> {
        if blocker == blocked {
            return Err(EngineError::InvalidRequest(
                "users cannot block themselves".to_string(),
            ));
        }

        let _pair = self.locks.acquire_pair(blocker, blocked).await?;
        let now = self.clock.now();
        let mut uow = self.storage.begin().await?;

        let newly_blocked = uow.record_block(blocker, blocked, now).await?;

        let match_id = MatchId::for_pair(blocker, blocked);
        let result = match uow.get_match(&match_id).await? {
            Some(current) => match apply_transition(
                &current,
                MatchState::Blocked,
                blocker,
                Some(ArchiveReason::Block),
                now,
            ) {
                Ok(TransitionOutcome::Changed(next)) => {
                    uow.update_match_state(&next).await?;
                    Some(next)
                }
                // an ended match keeps its state; only the conversation changes
                _ => Some(current),
            },
            None => None,
        };
        if result.is_some() {
            expire_pending_requests(uow.as_mut(), &match_id, now).await?;
        }

        let convo_id = ConversationId::for_pair(blocker, blocked);
        let convo = match uow.get_conversation(&convo_id).await? {
            Some(convo) => Some(convo),
            None if result.is_some() => {
                Some(uow.get_or_create_by_users(blocker, blocked, now).await?)
            }
            None => None,
        };
        if let Some(convo) = convo {
            if !convo.is_archived() {
                uow.archive(&convo.id, ArchiveReason::Block, now).await?;
            }
            uow.set_visibility(&convo.id, blocker, false).await?;
        }

        uow.commit().await?;
        if newly_blocked {
            info!("User {} blocked {}", blocker, blocked);
        }
        Ok(result)
    }

    /// Lift a block. The relationship stays in whatever state the block left it.
    ///
    /// Returns false when `blocker` had not blocked `blocked`.
    pub async fn unblock(&self, blocker: UserId, blocked: UserId) -> Result<bool, EngineError> {
        if blocker == blocked {
            return Err(EngineError::InvalidRequest(
                "users cannot unblock themselves".to_string(),
            ));
        }

        let _pair = self.locks.acquire_pair(blocker, blocked).await?;
        let mut uow = self.storage.begin().await?;
        let removed = uow.remove_block(blocker, blocked).await?;
        uow.commit().await?;

        if removed {
            info!("User {} unblocked {}", blocker, blocked);
        } else {
            debug!("No block from {} on {}", blocker, blocked);
        }
        Ok(removed)
    }

    pub async fn blocked_by(&self, blocker: UserId) -> Result<Vec<Block>, EngineError> {
        let mut uow = self.storage.begin().await?;
        Ok(uow.blocked_by(blocker).await?)
    }

    pub async fn matches_for(&self, user: UserId) -> Result<Vec<Match>, EngineError> {
        let mut uow = self.storage.begin().await?;
        Ok(uow.matches_for(user).await?)
    }

    pub async fn pending_requests_for(&self, user: UserId) -> Result<Vec<FriendRequest>, EngineError> {
        let mut uow = self.storage.begin().await?;
        Ok(uow.pending_requests_for(user).await?)
    }

    pub async fn notifications_for(&self, user: UserId) -> Result<Vec<Notification>, EngineError> {
        let mut uow = self.storage.begin().await?;
        Ok(uow.notifications_for(user).await?)
    }

    pub async fn get_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<Conversation>, EngineError> {
        let mut uow = self.storage.begin().await?;
        Ok(uow.get_conversation(&ConversationId::for_pair(a, b)).await?)
    }

    /// True when `from` may send a message to `to` right now
    pub async fn can_message(&self, from: UserId, to: UserId) -> Result<bool, EngineError> {
        let mut uow = self.storage.begin().await?;
        let Some(m) = uow.get_match(&MatchId::for_pair(from, to)).await? else {
            return Ok(false);
        };
        if !m.can_message() || !m.involves(from) {
            return Ok(false);
        }
        let convo = uow
            .get_conversation(&ConversationId::for_pair(from, to))
            .await?;
        Ok(convo.is_some_and(|c| !c.is_archived() && c.is_accessible_to(from)))
    }
}

async fn existing_match(
    uow: &mut dyn UnitOfWork,
    a: UserId,
    b: UserId,
) -> Result<Match, EngineError> {
    uow.get_match(&MatchId::for_pair(a, b))
        .await?
        .ok_or(EngineError::MatchNotFound)
}

/// Close every request still pending on a match that is leaving ACTIVE
async fn expire_pending_requests(
    uow: &mut dyn UnitOfWork,
    match_id: &MatchId,
    at: DateTime<Utc>,
) -> Result<(), EngineError> {
    for request in uow.pending_requests_on_match(match_id).await? {
        uow.update_friend_request_status(request.id, FriendRequestStatus::Expired, at)
            .await?;
        debug!("Expired friend request {} on match {}", request.id, match_id);
    }
    Ok(())
}

async fn archive_conversation(
    uow: &mut dyn UnitOfWork,
    a: UserId,
    b: UserId,
    reason: ArchiveReason,
    at: DateTime<Utc>,
) -> Result<(), EngineError> {
    let convo = uow.get_or_create_by_users(a, b, at).await?;
    if !convo.is_archived() {
        uow.archive(&convo.id, reason, at).await?;
    }
    Ok(())
}

async fn notify(
    uow: &mut dyn UnitOfWork,
    recipient: UserId,
    payload: NotificationPayload,
    at: DateTime<Utc>,
) -> Result<Notification, EngineError> {
    let kind = payload.notification_type();
    Ok(uow.create(recipient, kind, payload, at).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::services::MemoryStorage;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        storage: MemoryStorage,
        coordinator: RelationshipTransitionCoordinator,
        clock: Arc<ManualClock>,
    }

    async fn matched_pair(a: UserId, b: UserId) -> Fixture {
        let storage = MemoryStorage::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ));
        let mut uow = storage.begin().await.unwrap();
        uow.create_match_if_absent(&MatchId::for_pair(a, b), a, b, clock.now())
            .await
            .unwrap();
        uow.get_or_create_by_users(a, b, clock.now()).await.unwrap();
        uow.commit().await.unwrap();

        let coordinator = RelationshipTransitionCoordinator::new(
            Arc::new(storage.clone()),
            UserLockRegistry::new(std::time::Duration::from_secs(5)),
            RelationshipSettings::default(),
        )
        .with_clock(clock.clone());
        Fixture {
            storage,
            coordinator,
            clock,
        }
    }

    fn users() -> (UserId, UserId) {
        (UserId::from_u128(1), UserId::from_u128(2))
    }

    #[tokio::test]
    async fn test_message_length_counts_trimmed_chars() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        let err = fx
            .coordinator
            .propose_friend_zone(a, b, "   hi there   ")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MessageTooShort { min: 10 }));

        let request = fx
            .coordinator
            .propose_friend_zone(a, b, "  ten chars!  ")
            .await
            .unwrap();
        assert_eq!(request.message, "ten chars!");
    }

    #[tokio::test]
    async fn test_duplicate_pending_request() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        fx.coordinator
            .propose_friend_zone(a, b, "let's be friends")
            .await
            .unwrap();
        let err = fx
            .coordinator
            .propose_friend_zone(a, b, "let's be friends please")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RequestPending));
    }

    #[tokio::test]
    async fn test_only_recipient_may_respond() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        let request = fx
            .coordinator
            .propose_friend_zone(a, b, "let's be friends")
            .await
            .unwrap();
        let err = fx
            .coordinator
            .respond_to_friend_request(request.id, a, true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotAuthorized));

        let accepted = fx
            .coordinator
            .respond_to_friend_request(request.id, b, true)
            .await
            .unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);

        let err = fx
            .coordinator
            .respond_to_friend_request(request.id, b, false)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyResponded));

        let matches = fx.coordinator.matches_for(a).await.unwrap();
        assert_eq!(matches[0].state, MatchState::Friends);
        assert!(fx.coordinator.can_message(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;
        let err = fx
            .coordinator
            .respond_to_friend_request(Uuid::new_v4(), b, true)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RequestNotFound));
    }

    #[tokio::test]
    async fn test_unmatch_after_graceful_exit_is_terminal() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        fx.coordinator.graceful_exit(a, b).await.unwrap();
        let err = fx.coordinator.unmatch(b, a).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::AlreadyTerminal {
                state: MatchState::GracefulExit
            }
        ));
    }

    #[tokio::test]
    async fn test_unmatch_archives_without_notification() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        let ended = fx.coordinator.unmatch(a, b).await.unwrap();
        assert_eq!(ended.state, MatchState::Unmatched);
        assert_eq!(ended.ended_by, Some(a));

        let convo = fx.coordinator.get_conversation(a, b).await.unwrap().unwrap();
        assert_eq!(convo.archive_reason, Some(ArchiveReason::Unmatch));
        assert!(fx.coordinator.notifications_for(b).await.unwrap().is_empty());
        assert!(!fx.coordinator.can_message(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_block_without_match_is_recorded() {
        let (a, b) = users();
        let fx = matched_pair(UserId::from_u128(8), UserId::from_u128(9)).await;

        let result = fx.coordinator.block(a, b).await.unwrap();
        assert!(result.is_none());
        assert!(fx.coordinator.get_conversation(a, b).await.unwrap().is_none());

        let mut uow = fx.storage.begin().await.unwrap();
        assert!(uow.is_blocked(b, a).await.unwrap());
    }

    #[tokio::test]
    async fn test_block_after_unmatch_keeps_state() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        fx.coordinator.unmatch(a, b).await.unwrap();
        fx.clock.advance(Duration::minutes(1));

        let kept = fx.coordinator.block(b, a).await.unwrap().unwrap();
        assert_eq!(kept.state, MatchState::Unmatched);

        let convo = fx.coordinator.get_conversation(a, b).await.unwrap().unwrap();
        assert_eq!(convo.archive_reason, Some(ArchiveReason::Unmatch));
        assert!(!convo.is_accessible_to(b));
        assert!(convo.is_accessible_to(a));
    }

    #[tokio::test]
    async fn test_rate_limit_resets_at_midnight() {
        let storage = MemoryStorage::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 22, 0, 0).unwrap(),
        ));
        let sender = UserId::from_u128(100);

        let mut uow = storage.begin().await.unwrap();
        for n in 0..7u128 {
            let other = UserId::from_u128(200 + n);
            uow.create_match_if_absent(&MatchId::for_pair(sender, other), sender, other, clock.now())
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();

        let coordinator = RelationshipTransitionCoordinator::new(
            Arc::new(storage.clone()),
            UserLockRegistry::new(std::time::Duration::from_secs(5)),
            RelationshipSettings::default(),
        )
        .with_clock(clock.clone());

        for n in 0..5u128 {
            coordinator
                .propose_friend_zone(sender, UserId::from_u128(200 + n), "let's be friends")
                .await
                .unwrap();
        }
        let err = coordinator
            .propose_friend_zone(sender, UserId::from_u128(205), "let's be friends")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RateLimited { limit: 5 }));

        clock.advance(Duration::hours(3));
        coordinator
            .propose_friend_zone(sender, UserId::from_u128(205), "let's be friends")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_accept_expires_the_crossing_request() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        let from_a = fx
            .coordinator
            .propose_friend_zone(a, b, "let's be friends")
            .await
            .unwrap();
        let from_b = fx
            .coordinator
            .propose_friend_zone(b, a, "friends instead?")
            .await
            .unwrap();

        fx.coordinator
            .respond_to_friend_request(from_a.id, b, true)
            .await
            .unwrap();
        assert!(fx.coordinator.pending_requests_for(a).await.unwrap().is_empty());

        let err = fx
            .coordinator
            .respond_to_friend_request(from_b.id, a, false)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyResponded));

        let m = &fx.coordinator.matches_for(a).await.unwrap()[0];
        assert_eq!(m.state, MatchState::Friends);
        let convo = fx.coordinator.get_conversation(a, b).await.unwrap().unwrap();
        assert!(!convo.is_archived());

        let mut uow = fx.storage.begin().await.unwrap();
        let stale = uow.get_friend_request(from_b.id).await.unwrap().unwrap();
        assert_eq!(stale.status, FriendRequestStatus::Expired);
    }

    #[tokio::test]
    async fn test_respond_requires_active_match() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        let first = fx
            .coordinator
            .propose_friend_zone(a, b, "let's be friends")
            .await
            .unwrap();
        fx.coordinator
            .respond_to_friend_request(first.id, b, true)
            .await
            .unwrap();

        // a request left pending on a match that has already moved on
        let stray = FriendRequest::new(b, a, "friends instead?".to_string(), fx.clock.now());
        let mut uow = fx.storage.begin().await.unwrap();
        uow.insert_friend_request(&stray).await.unwrap();
        uow.commit().await.unwrap();

        let err = fx
            .coordinator
            .respond_to_friend_request(stray.id, a, false)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoActiveMatch));
        assert_eq!(
            fx.coordinator.matches_for(a).await.unwrap()[0].state,
            MatchState::Friends
        );
    }

    #[derive(Debug, Clone, Copy)]
    enum Ending {
        GracefulExit,
        Unmatch,
        Block,
    }

    #[tokio::test]
    async fn test_ending_a_match_expires_pending_requests() {
        let (a, b) = users();

        for ending in [Ending::GracefulExit, Ending::Unmatch, Ending::Block] {
            let fx = matched_pair(a, b).await;
            let request = fx
                .coordinator
                .propose_friend_zone(a, b, "let's be friends")
                .await
                .unwrap();
            fx.clock.advance(Duration::minutes(1));

            match ending {
                Ending::GracefulExit => {
                    fx.coordinator.graceful_exit(b, a).await.unwrap();
                }
                Ending::Unmatch => {
                    fx.coordinator.unmatch(b, a).await.unwrap();
                }
                Ending::Block => {
                    fx.coordinator.block(b, a).await.unwrap();
                }
            }

            assert!(
                fx.coordinator.pending_requests_for(b).await.unwrap().is_empty(),
                "{:?}",
                ending
            );
            let err = fx
                .coordinator
                .respond_to_friend_request(request.id, b, true)
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::AlreadyResponded), "{:?}", ending);

            let mut uow = fx.storage.begin().await.unwrap();
            let stored = uow.get_friend_request(request.id).await.unwrap().unwrap();
            assert_eq!(stored.status, FriendRequestStatus::Expired);
            assert_eq!(stored.responded_at, Some(fx.clock.now()));
        }
    }

    #[tokio::test]
    async fn test_unblock_keeps_relationship_blocked() {
        let (a, b) = users();
        let fx = matched_pair(a, b).await;

        fx.coordinator.block(a, b).await.unwrap();
        let blocks = fx.coordinator.blocked_by(a).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].blocked, b);
        assert!(fx.coordinator.blocked_by(b).await.unwrap().is_empty());

        assert!(fx.coordinator.unblock(a, b).await.unwrap());
        assert!(!fx.coordinator.unblock(a, b).await.unwrap());
        assert!(fx.coordinator.blocked_by(a).await.unwrap().is_empty());

        let m = &fx.coordinator.matches_for(a).await.unwrap()[0];
        assert_eq!(m.state, MatchState::Blocked);
        assert!(!fx.coordinator.can_message(a, b).await.unwrap());
        assert!(!fx.coordinator.can_message(b, a).await.unwrap());
    }
}
