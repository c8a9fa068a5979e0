use super::store::{
    ConversationArchivist, FriendRequestStore, InteractionStore, NotificationSink, Storage,
    StorageError, UnitOfWork,
};
use crate::models::{
    ordered_pair, ArchiveReason, Block, Conversation, ConversationId, Direction, FriendRequest,
    FriendRequestStatus, Like, Match, MatchId, Notification, NotificationPayload,
    NotificationType, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    likes: HashMap<(UserId, UserId), Like>,
    matches: HashMap<MatchId, Match>,
    blocks: HashMap<(UserId, UserId), Block>,
    friend_requests: HashMap<Uuid, FriendRequest>,
    conversations: HashMap<ConversationId, Conversation>,
    notifications: Vec<Notification>,
}

/// Prior value of every key a unit wrote, keyed per table
#[derive(Debug, Default)]
struct UndoLog {
    likes: HashMap<(UserId, UserId), Option<Like>>,
    matches: HashMap<MatchId, Option<Match>>,
    blocks: HashMap<(UserId, UserId), Option<Block>>,
    friend_requests: HashMap<Uuid, Option<FriendRequest>>,
    conversations: HashMap<ConversationId, Option<Conversation>>,
    notifications: usize,
}

impl UndoLog {
    fn new(tables: &Tables) -> Self {
        Self {
            notifications: tables.notifications.len(),
            ..Self::default()
        }
    }

    fn replay(self, tables: &mut Tables) {
        restore(&mut tables.likes, self.likes);
        restore(&mut tables.matches, self.matches);
        restore(&mut tables.blocks, self.blocks);
        restore(&mut tables.friend_requests, self.friend_requests);
        restore(&mut tables.conversations, self.conversations);
        // notifications are append-only
        tables.notifications.truncate(self.notifications);
    }
}

/// Record the value `key` had before this unit first wrote it
fn remember<K, V>(log: &mut HashMap<K, Option<V>>, table: &HashMap<K, V>, key: &K)
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    log.entry(key.clone())
        .or_insert_with(|| table.get(key).cloned());
}

fn restore<K: Eq + Hash, V>(table: &mut HashMap<K, V>, log: HashMap<K, Option<V>>) {
    for (key, prior) in log {
        match prior {
            Some(value) => {
                table.insert(key, value);
            }
            None => {
                table.remove(&key);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    reject_notifications: AtomicBool,
    commit_conflicts: AtomicUsize,
}

/// Process-local storage, used by tests and when no database is configured
///
/// A unit of work holds the table mutex for its whole lifetime and writes in
/// place, logging the prior value of every key it touches. Commit keeps the
/// writes; dropping the unit replays the log.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make notification writes fail, simulating an outage of the sink.
    pub fn reject_notifications(&self, reject: bool) {
        self.faults
            .reject_notifications
            .store(reject, Ordering::SeqCst);
    }

    /// Make the next `count` commits fail with a write conflict.
    pub fn inject_commit_conflicts(&self, count: usize) {
        self.faults.commit_conflicts.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StorageError> {
        let tables = Arc::clone(&self.tables).lock_owned().await;
        let undo = UndoLog::new(&tables);
        Ok(Box::new(MemoryUnitOfWork {
            tables,
            undo,
            committed: false,
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryUnitOfWork {
    tables: OwnedMutexGuard<Tables>,
    undo: UndoLog,
    committed: bool,
    faults: Arc<Faults>,
}

impl MemoryUnitOfWork {
    fn conversation_mut(&mut self, id: &ConversationId) -> Result<&mut Conversation, StorageError> {
        remember(&mut self.undo.conversations, &self.tables.conversations, id);
        self.tables
            .conversations
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("conversation {}", id)))
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.committed {
            let undo = std::mem::take(&mut self.undo);
            undo.replay(&mut self.tables);
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let mut unit = self;
        let pending = unit.faults.commit_conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            unit.faults
                .commit_conflicts
                .store(pending - 1, Ordering::SeqCst);
            return Err(StorageError::Conflict("simulated commit conflict".to_string()));
        }

        unit.committed = true;
        Ok(())
    }
}

#[async_trait]
impl InteractionStore for MemoryUnitOfWork {
    async fn upsert_like(
        &mut self,
        from: UserId,
        to: UserId,
        direction: Direction,
        at: DateTime<Utc>,
    ) -> Result<Like, StorageError> {
        remember(&mut self.undo.likes, &self.tables.likes, &(from, to));
        let like = self
            .tables
            .likes
            .entry((from, to))
            .and_modify(|existing| {
                existing.direction = direction;
                existing.created_at = at;
                existing.deleted_at = None;
            })
            .or_insert_with(|| Like::new(from, to, direction, at));
        Ok(like.clone())
    }

    async fn get_like(&mut self, from: UserId, to: UserId) -> Result<Option<Like>, StorageError> {
        Ok(self.tables.likes.get(&(from, to)).cloned())
    }

    async fn find_mutual_like(&mut self, a: UserId, b: UserId) -> Result<bool, StorageError> {
        let live = |key: (UserId, UserId)| self.tables.likes.get(&key).is_some_and(Like::is_live_like);
        Ok(live((a, b)) && live((b, a)))
    }

    async fn latest_like_by(&mut self, user: UserId) -> Result<Option<Like>, StorageError> {
        Ok(self
            .tables
            .likes
            .values()
            .filter(|like| like.from_user == user && !like.is_deleted())
            .max_by_key(|like| like.created_at)
            .cloned())
    }

    async fn soft_delete_like(
        &mut self,
        from: UserId,
        to: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        remember(&mut self.undo.likes, &self.tables.likes, &(from, to));
        match self.tables.likes.get_mut(&(from, to)) {
            Some(like) if !like.is_deleted() => {
                like.deleted_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_match_if_absent(
        &mut self,
        id: &MatchId,
        a: UserId,
        b: UserId,
        at: DateTime<Utc>,
    ) -> Result<(Match, bool), StorageError> {
        if let Some(existing) = self.tables.matches.get(id) {
            return Ok((existing.clone(), false));
        }
        remember(&mut self.undo.matches, &self.tables.matches, id);
        let created = Match::new(a, b, at);
        self.tables.matches.insert(id.clone(), created.clone());
        Ok((created, true))
    }

    async fn get_match(&mut self, id: &MatchId) -> Result<Option<Match>, StorageError> {
        Ok(self.tables.matches.get(id).cloned())
    }

    async fn update_match_state(&mut self, updated: &Match) -> Result<(), StorageError> {
        remember(&mut self.undo.matches, &self.tables.matches, &updated.id);
        let current = self
            .tables
            .matches
            .get_mut(&updated.id)
            .ok_or_else(|| StorageError::NotFound(format!("match {}", updated.id)))?;
        current.state = updated.state;
        current.end_reason = updated.end_reason;
        current.ended_by = updated.ended_by;
        current.state_changed_at = updated.state_changed_at;
        Ok(())
    }

    async fn matches_for(&mut self, user: UserId) -> Result<Vec<Match>, StorageError> {
        let mut matches: Vec<Match> = self
            .tables
            .matches
            .values()
            .filter(|m| m.involves(user))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn record_block(
        &mut self,
        blocker: UserId,
        blocked: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        if self.tables.blocks.contains_key(&(blocker, blocked)) {
            return Ok(false);
        }
        remember(&mut self.undo.blocks, &self.tables.blocks, &(blocker, blocked));
        self.tables.blocks.insert(
            (blocker, blocked),
            Block {
                blocker,
                blocked,
                created_at: at,
            },
        );
        Ok(true)
    }

    async fn remove_block(&mut self, blocker: UserId, blocked: UserId) -> Result<bool, StorageError> {
        remember(&mut self.undo.blocks, &self.tables.blocks, &(blocker, blocked));
        Ok(self.tables.blocks.remove(&(blocker, blocked)).is_some())
    }

    async fn is_blocked(&mut self, a: UserId, b: UserId) -> Result<bool, StorageError> {
        Ok(self.tables.blocks.contains_key(&(a, b)) || self.tables.blocks.contains_key(&(b, a)))
    }

    async fn blocked_by(&mut self, blocker: UserId) -> Result<Vec<Block>, StorageError> {
        let mut blocks: Vec<Block> = self
            .tables
            .blocks
            .values()
            .filter(|block| block.blocker == blocker)
            .cloned()
            .collect();
        blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(blocks)
    }
}

#[async_trait]
impl FriendRequestStore for MemoryUnitOfWork {
    async fn insert_friend_request(&mut self, request: &FriendRequest) -> Result<(), StorageError> {
        if self.tables.friend_requests.contains_key(&request.id) {
            return Err(StorageError::Conflict(format!("friend request {}", request.id)));
        }
        remember(
            &mut self.undo.friend_requests,
            &self.tables.friend_requests,
            &request.id,
        );
        self.tables
            .friend_requests
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn get_friend_request(&mut self, id: Uuid) -> Result<Option<FriendRequest>, StorageError> {
        Ok(self.tables.friend_requests.get(&id).cloned())
    }

    async fn find_pending_request(
        &mut self,
        from: UserId,
        to: UserId,
        match_id: &MatchId,
    ) -> Result<Option<FriendRequest>, StorageError> {
        Ok(self
            .tables
            .friend_requests
            .values()
            .find(|r| {
                r.is_pending() && r.from_user == from && r.to_user == to && &r.match_id == match_id
            })
            .cloned())
    }

    async fn update_friend_request_status(
        &mut self,
        id: Uuid,
        status: FriendRequestStatus,
        responded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        remember(&mut self.undo.friend_requests, &self.tables.friend_requests, &id);
        let request = self
            .tables
            .friend_requests
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("friend request {}", id)))?;
        request.status = status;
        request.responded_at = Some(responded_at);
        Ok(())
    }

    async fn count_requests_since(
        &mut self,
        from: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError> {
        let count = self
            .tables
            .friend_requests
            .values()
            .filter(|r| r.from_user == from && r.created_at >= since)
            .count();
        Ok(count as u32)
    }

    async fn pending_requests_on_match(
        &mut self,
        match_id: &MatchId,
    ) -> Result<Vec<FriendRequest>, StorageError> {
        let mut pending: Vec<FriendRequest> = self
            .tables
            .friend_requests
            .values()
            .filter(|r| r.is_pending() && &r.match_id == match_id)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn pending_requests_for(
        &mut self,
        user: UserId,
    ) -> Result<Vec<FriendRequest>, StorageError> {
        let mut pending: Vec<FriendRequest> = self
            .tables
            .friend_requests
            .values()
            .filter(|r| r.to_user == user && r.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }
}

#[async_trait]
impl ConversationArchivist for MemoryUnitOfWork {
    async fn get_or_create_by_users(
        &mut self,
        a: UserId,
        b: UserId,
        at: DateTime<Utc>,
    ) -> Result<Conversation, StorageError> {
        let (low, high) = ordered_pair(a, b);
        let id = ConversationId::for_pair(low, high);
        remember(&mut self.undo.conversations, &self.tables.conversations, &id);
        let convo = self
            .tables
            .conversations
            .entry(id)
            .or_insert_with(|| Conversation::new(low, high, at));
        Ok(convo.clone())
    }

    async fn get_conversation(
        &mut self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StorageError> {
        Ok(self.tables.conversations.get(id).cloned())
    }

    async fn archive(
        &mut self,
        id: &ConversationId,
        reason: ArchiveReason,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.conversation_mut(id)?.archive(reason, at);
        Ok(())
    }

    async fn set_visibility(
        &mut self,
        id: &ConversationId,
        user: UserId,
        visible: bool,
    ) -> Result<(), StorageError> {
        let convo = self.conversation_mut(id)?;
        if !convo.set_visibility(user, visible) {
            return Err(StorageError::NotFound(format!(
                "user {} in conversation {}",
                user, id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for MemoryUnitOfWork {
    async fn create(
        &mut self,
        recipient: UserId,
        notification_type: NotificationType,
        payload: NotificationPayload,
        at: DateTime<Utc>,
    ) -> Result<Notification, StorageError> {
        if self.faults.reject_notifications.load(Ordering::SeqCst) {
            return Err(StorageError::Corrupt("notification sink rejected write".to_string()));
        }
        let notification = Notification::new(recipient, notification_type, payload, at);
        self.tables.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn notifications_for(&mut self, user: UserId) -> Result<Vec<Notification>, StorageError> {
        let mut found: Vec<Notification> = self
            .tables
            .notifications
            .iter()
            .filter(|n| n.recipient == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
