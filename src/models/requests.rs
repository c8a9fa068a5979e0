use crate::models::domain::Direction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Record a swipe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: Uuid,
    pub direction: Direction,
}

/// Undo the caller's last swipe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UndoSwipeRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
}

/// Propose moving a match into the friend zone
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FriendRequestBody {
    #[serde(alias = "from_user_id", rename = "fromUserId")]
    pub from_user_id: Uuid,
    #[serde(alias = "to_user_id", rename = "toUserId")]
    pub to_user_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RespondFriendRequestBody {
    #[serde(alias = "responder_id", rename = "responderId")]
    pub responder_id: Uuid,
    pub accept: bool,
}

/// Graceful exit, unmatch and block all name the acting user and the other party
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelationshipActionRequest {
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: Uuid,
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: Uuid,
}
