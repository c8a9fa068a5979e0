use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a user, as issued by the profile service
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Returns the two users smallest first.
pub fn ordered_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Deterministic identifier for an unordered pair of users.
///
/// Matches and conversations are keyed by the pair, so finding the match
/// between two users is a lookup rather than a scan, and the same id comes
/// out regardless of argument order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PairId(pub String);

pub type MatchId = PairId;
pub type ConversationId = PairId;

impl PairId {
    pub fn for_pair(a: UserId, b: UserId) -> Self {
        let (low, high) = ordered_pair(a, b);
        Self(format!("{}_{}", low, high))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Swipe direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "swipe_direction", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Like,
    Pass,
}

/// A directional swipe from one user toward another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub from_user: UserId,
    pub to_user: UserId,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
    /// Set when the swipe was undone; the row itself is kept
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Like {
    pub fn new(from_user: UserId, to_user: UserId, direction: Direction, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_user,
            to_user,
            direction,
            created_at: at,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// A LIKE that has not been undone
    pub fn is_live_like(&self) -> bool {
        self.direction == Direction::Like && !self.is_deleted()
    }
}

/// Lifecycle state of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "match_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    Active,
    Friends,
    GracefulExit,
    Unmatched,
    Blocked,
}

impl MatchState {
    pub const ALL: [MatchState; 5] = [
        MatchState::Active,
        MatchState::Friends,
        MatchState::GracefulExit,
        MatchState::Unmatched,
        MatchState::Blocked,
    ];
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchState::Active => "ACTIVE",
            MatchState::Friends => "FRIENDS",
            MatchState::GracefulExit => "GRACEFUL_EXIT",
            MatchState::Unmatched => "UNMATCHED",
            MatchState::Blocked => "BLOCKED",
        };
        f.write_str(name)
    }
}

/// Why a match ended or a conversation was archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "archive_reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveReason {
    FriendZoneDeclined,
    GracefulExit,
    Unmatch,
    Block,
}

/// Mutual-like relationship between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// The smaller of the two user ids
    pub user_a: UserId,
    pub user_b: UserId,
    pub state: MatchState,
    pub end_reason: Option<ArchiveReason>,
    pub ended_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub state_changed_at: DateTime<Utc>,
}

impl Match {
    /// New ACTIVE match with canonical user ordering
    pub fn new(a: UserId, b: UserId, at: DateTime<Utc>) -> Self {
        debug_assert_ne!(a, b, "a user cannot match with themselves");
        let (user_a, user_b) = ordered_pair(a, b);
        Self {
            id: MatchId::for_pair(user_a, user_b),
            user_a,
            user_b,
            state: MatchState::Active,
            end_reason: None,
            ended_by: None,
            created_at: at,
            state_changed_at: at,
        }
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    pub fn can_message(&self) -> bool {
        crate::core::state_machine::can_message(self.state)
    }
}

/// Status of a friend-zone request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "friend_request_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Declined,
    /// Closed without an answer because the match moved on
    Expired,
}

/// Proposal to move an active match to the FRIENDS state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub match_id: MatchId,
    pub from_user: UserId,
    pub to_user: UserId,
    pub message: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    pub fn new(from_user: UserId, to_user: UserId, message: String, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id: MatchId::for_pair(from_user, to_user),
            from_user,
            to_user,
            message,
            status: FriendRequestStatus::Pending,
            created_at: at,
            responded_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }
}

/// Message thread between two matched users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_a: UserId,
    pub user_b: UserId,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub archive_reason: Option<ArchiveReason>,
    pub accessible_to_user_a: bool,
    pub accessible_to_user_b: bool,
}

impl Conversation {
    pub fn new(a: UserId, b: UserId, at: DateTime<Utc>) -> Self {
        let (user_a, user_b) = ordered_pair(a, b);
        Self {
            id: ConversationId::for_pair(user_a, user_b),
            user_a,
            user_b,
            created_at: at,
            archived_at: None,
            archive_reason: None,
            accessible_to_user_a: true,
            accessible_to_user_b: true,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some() && self.archive_reason.is_some()
    }

    /// Timestamp and reason are only ever set together.
    pub fn archive(&mut self, reason: ArchiveReason, at: DateTime<Utc>) {
        self.archived_at = Some(at);
        self.archive_reason = Some(reason);
    }

    pub fn is_accessible_to(&self, user: UserId) -> bool {
        if user == self.user_a {
            self.accessible_to_user_a
        } else {
            user == self.user_b && self.accessible_to_user_b
        }
    }

    /// Returns false when `user` is not part of the conversation.
    pub fn set_visibility(&mut self, user: UserId, visible: bool) -> bool {
        if user == self.user_a {
            self.accessible_to_user_a = visible;
            true
        } else if user == self.user_b {
            self.accessible_to_user_b = visible;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    FriendRequest,
    FriendRequestAccepted,
    FriendRequestDeclined,
    GracefulExit,
}

/// Structured notification body, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    FriendRequest {
        request_id: Uuid,
        match_id: MatchId,
        from_user: UserId,
        message: String,
    },
    FriendRequestAccepted {
        request_id: Uuid,
        match_id: MatchId,
        responder: UserId,
    },
    FriendRequestDeclined {
        request_id: Uuid,
        match_id: MatchId,
        responder: UserId,
    },
    GracefulExit {
        match_id: MatchId,
        initiator: UserId,
    },
}

impl NotificationPayload {
    pub fn notification_type(&self) -> NotificationType {
        match self {
            NotificationPayload::FriendRequest { .. } => NotificationType::FriendRequest,
            NotificationPayload::FriendRequestAccepted { .. } => {
                NotificationType::FriendRequestAccepted
            }
            NotificationPayload::FriendRequestDeclined { .. } => {
                NotificationType::FriendRequestDeclined
            }
            NotificationPayload::GracefulExit { .. } => NotificationType::GracefulExit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient: UserId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub payload: NotificationPayload,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(
        recipient: UserId,
        notification_type: NotificationType,
        payload: NotificationPayload,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            notification_type,
            payload,
            created_at: at,
            read_at: None,
            dismissed_at: None,
        }
    }
}

/// One user blocking another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub blocker: UserId,
    pub blocked: UserId,
    pub created_at: DateTime<Utc>,
}
