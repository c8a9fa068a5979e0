// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ordered_pair, ArchiveReason, Block, Conversation, ConversationId, Direction, FriendRequest,
    FriendRequestStatus, Like, Match, MatchId, MatchState, Notification, NotificationPayload,
    NotificationType, PairId, UserId,
};
pub use requests::{
    FriendRequestBody, RelationshipActionRequest, RespondFriendRequestBody, SwipeRequest,
    UndoSwipeRequest,
};
pub use responses::{
    BlocksResponse, ErrorResponse, FriendRequestsResponse, HealthResponse, MatchesResponse,
    NotificationsResponse, RelationshipResponse, UnblockResponse,
};
