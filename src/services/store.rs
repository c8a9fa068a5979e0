use crate::models::{
    ArchiveReason, Block, Conversation, ConversationId, Direction, FriendRequest, FriendRequestStatus,
    Like, Match, MatchId, Notification, NotificationPayload, NotificationType, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl StorageError {
    /// Unique violations, serialization failures and deadlocks
    pub fn is_conflict(&self) -> bool {
        match self {
            StorageError::Conflict(_) => true,
            StorageError::SqlxError(sqlx::Error::Database(db)) => {
                matches!(db.code().as_deref(), Some("23505" | "40001" | "40P01"))
            }
            _ => false,
        }
    }
}

/// Likes, matches and blocks
#[async_trait]
pub trait InteractionStore: Send {
    /// Insert or overwrite the swipe for (from, to); clears any soft-delete.
    async fn upsert_like(
        &mut self,
        from: UserId,
        to: UserId,
        direction: Direction,
        at: DateTime<Utc>,
    ) -> Result<Like, StorageError>;

    async fn get_like(&mut self, from: UserId, to: UserId) -> Result<Option<Like>, StorageError>;

    /// True when both users hold a live LIKE toward each other
    async fn find_mutual_like(&mut self, a: UserId, b: UserId) -> Result<bool, StorageError>;

    /// Most recent swipe by `user` that has not been undone
    async fn latest_like_by(&mut self, user: UserId) -> Result<Option<Like>, StorageError>;

    /// Returns false when there was no live swipe to delete.
    async fn soft_delete_like(
        &mut self,
        from: UserId,
        to: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Insert-or-fetch. The flag is true when this call created the row.
    async fn create_match_if_absent(
        &mut self,
        id: &MatchId,
        a: UserId,
        b: UserId,
        at: DateTime<Utc>,
    ) -> Result<(Match, bool), StorageError>;

    async fn get_match(&mut self, id: &MatchId) -> Result<Option<Match>, StorageError>;

    /// Persist state, end reason, ended-by and state-change time of `updated`.
    async fn update_match_state(&mut self, updated: &Match) -> Result<(), StorageError>;

    async fn matches_for(&mut self, user: UserId) -> Result<Vec<Match>, StorageError>;

    /// Returns false when the block already existed.
    async fn record_block(
        &mut self,
        blocker: UserId,
        blocked: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// True when either user has blocked the other
    async fn is_blocked(&mut self, a: UserId, b: UserId) -> Result<bool, StorageError>;

    /// Returns false when there was no such block.
    async fn remove_block(&mut self, blocker: UserId, blocked: UserId) -> Result<bool, StorageError>;

    /// Blocks created by `blocker`, newest first
    async fn blocked_by(&mut self, blocker: UserId) -> Result<Vec<Block>, StorageError>;
}

/// Friend-zone requests
#[async_trait]
pub trait FriendRequestStore: Send {
    async fn insert_friend_request(&mut self, request: &FriendRequest) -> Result<(), StorageError>;

    async fn get_friend_request(&mut self, id: Uuid) -> Result<Option<FriendRequest>, StorageError>;

    async fn find_pending_request(
        &mut self,
        from: UserId,
        to: UserId,
        match_id: &MatchId,
    ) -> Result<Option<FriendRequest>, StorageError>;

    async fn update_friend_request_status(
        &mut self,
        id: Uuid,
        status: FriendRequestStatus,
        responded_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Requests sent by `from` at or after `since`
    async fn count_requests_since(
        &mut self,
        from: UserId,
        since: DateTime<Utc>,
    ) -> Result<u32, StorageError>;

    /// Pending requests on one match in either direction, oldest first
    async fn pending_requests_on_match(
        &mut self,
        match_id: &MatchId,
    ) -> Result<Vec<FriendRequest>, StorageError>;

    /// Pending requests addressed to `user`, oldest first
    async fn pending_requests_for(&mut self, user: UserId)
        -> Result<Vec<FriendRequest>, StorageError>;
}

/// Conversation archive and visibility
#[async_trait]
pub trait ConversationArchivist: Send {
    async fn get_or_create_by_users(
        &mut self,
        a: UserId,
        b: UserId,
        at: DateTime<Utc>,
    ) -> Result<Conversation, StorageError>;

    async fn get_conversation(
        &mut self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, StorageError>;

    async fn archive(
        &mut self,
        id: &ConversationId,
        reason: ArchiveReason,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    async fn set_visibility(
        &mut self,
        id: &ConversationId,
        user: UserId,
        visible: bool,
    ) -> Result<(), StorageError>;
}

/// Notification creation
#[async_trait]
pub trait NotificationSink: Send {
    async fn create(
        &mut self,
        recipient: UserId,
        notification_type: NotificationType,
        payload: NotificationPayload,
        at: DateTime<Utc>,
    ) -> Result<Notification, StorageError>;

    /// Newest first
    async fn notifications_for(&mut self, user: UserId) -> Result<Vec<Notification>, StorageError>;
}

/// One all-or-nothing storage transaction
///
/// Dropping a unit without calling [`UnitOfWork::commit`] rolls it back. That
/// covers error paths and futures cancelled mid-operation.
#[async_trait]
pub trait UnitOfWork:
    InteractionStore + FriendRequestStore + ConversationArchivist + NotificationSink
{
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;
}

/// A storage backend able to open units of work
#[async_trait]
pub trait Storage: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StorageError>;

    async fn health_check(&self) -> Result<bool, StorageError>;

    fn backend_name(&self) -> &'static str;
}
