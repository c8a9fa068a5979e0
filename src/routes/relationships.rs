use super::{engine_error, validation_error, AppState};
use crate::models::{
    BlocksResponse, FriendRequestBody, FriendRequestsResponse, NotificationsResponse,
    RelationshipActionRequest, RelationshipResponse, RespondFriendRequestBody, UnblockResponse,
    UserId,
};
use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Configure friend-zone and relationship lifecycle routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/friend-requests", web::post().to(propose_friend_zone))
        .route("/friend-requests/{id}/respond", web::post().to(respond_to_friend_request))
        .route("/users/{id}/friend-requests", web::get().to(pending_requests))
        .route("/users/{id}/notifications", web::get().to(list_notifications))
        .route("/relationships/graceful-exit", web::post().to(graceful_exit))
        .route("/relationships/unmatch", web::post().to(unmatch))
        .route("/relationships/block", web::post().to(block))
        .route("/relationships/unblock", web::post().to(unblock))
        .route("/users/{id}/blocks", web::get().to(list_blocks));
}

/// Propose moving a match to the friend zone
///
/// POST /api/v1/friend-requests
///
/// Request body:
/// ```json
/// {
///   "fromUserId": "uuid",
///   "toUserId": "uuid",
///   "message": "let's be friends"
/// }
/// ```
async fn propose_friend_zone(
    state: web::Data<AppState>,
    req: web::Json<FriendRequestBody>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let from = UserId(req.from_user_id);
    let to = UserId(req.to_user_id);

    match state
        .coordinator
        .propose_friend_zone(from, to, &req.message)
        .await
    {
        Ok(request) => HttpResponse::Created().json(request),
        Err(e) => engine_error(e),
    }
}

/// POST /api/v1/friend-requests/{id}/respond
async fn respond_to_friend_request(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<RespondFriendRequestBody>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let request_id = path.into_inner();
    match state
        .coordinator
        .respond_to_friend_request(request_id, UserId(req.responder_id), req.accept)
        .await
    {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(e) => engine_error(e),
    }
}

/// GET /api/v1/users/{id}/friend-requests
async fn pending_requests(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state
        .coordinator
        .pending_requests_for(UserId(path.into_inner()))
        .await
    {
        Ok(requests) => HttpResponse::Ok().json(FriendRequestsResponse { requests }),
        Err(e) => engine_error(e),
    }
}

/// GET /api/v1/users/{id}/notifications
async fn list_notifications(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state
        .coordinator
        .notifications_for(UserId(path.into_inner()))
        .await
    {
        Ok(notifications) => {
            let unread = notifications.iter().filter(|n| n.read_at.is_none()).count();
            HttpResponse::Ok().json(NotificationsResponse {
                notifications,
                unread,
            })
        }
        Err(e) => engine_error(e),
    }
}

/// POST /api/v1/relationships/graceful-exit
async fn graceful_exit(
    state: web::Data<AppState>,
    req: web::Json<RelationshipActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let result = state
        .coordinator
        .graceful_exit(UserId(req.user_id), UserId(req.target_user_id))
        .await
        .map(Some);
    relationship_response(result)
}

/// POST /api/v1/relationships/unmatch
async fn unmatch(
    state: web::Data<AppState>,
    req: web::Json<RelationshipActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let result = state
        .coordinator
        .unmatch(UserId(req.user_id), UserId(req.target_user_id))
        .await
        .map(Some);
    relationship_response(result)
}

/// POST /api/v1/relationships/block
async fn block(
    state: web::Data<AppState>,
    req: web::Json<RelationshipActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let result = state
        .coordinator
        .block(UserId(req.user_id), UserId(req.target_user_id))
        .await;
    relationship_response(result)
}

/// POST /api/v1/relationships/unblock
async fn unblock(
    state: web::Data<AppState>,
    req: web::Json<RelationshipActionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state
        .coordinator
        .unblock(UserId(req.user_id), UserId(req.target_user_id))
        .await
    {
        Ok(unblocked) => HttpResponse::Ok().json(UnblockResponse { unblocked }),
        Err(e) => engine_error(e),
    }
}

/// GET /api/v1/users/{id}/blocks
async fn list_blocks(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state.coordinator.blocked_by(UserId(path.into_inner())).await {
        Ok(blocks) => HttpResponse::Ok().json(BlocksResponse { blocks }),
        Err(e) => engine_error(e),
    }
}

fn relationship_response(
    result: Result<Option<crate::models::Match>, crate::core::EngineError>,
) -> HttpResponse {
    match result {
        Ok(m) => HttpResponse::Ok().json(RelationshipResponse {
            success: true,
            r#match: m,
        }),
        Err(e) => engine_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::{FriendRequest, MatchState, NotificationType};
    use crate::services::MemoryStorage;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_friend_zone_over_http() {
        let state = AppState::new(Arc::new(MemoryStorage::new()), &Settings::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let (a, b) = (Uuid::from_u128(1), Uuid::from_u128(2));
        for (from, to) in [(a, b), (b, a)] {
            let req = test::TestRequest::post()
                .uri("/api/v1/swipes")
                .set_json(serde_json::json!({"userId": from, "targetUserId": to, "direction": "LIKE"}))
                .to_request();
            assert!(test::call_service(&app, req).await.status().is_success());
        }

        let req = test::TestRequest::post()
            .uri("/api/v1/friend-requests")
            .set_json(serde_json::json!({"fromUserId": a, "toUserId": b, "message": "short"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::post()
            .uri("/api/v1/friend-requests")
            .set_json(serde_json::json!({"fromUserId": a, "toUserId": b, "message": "let's be friends"}))
            .to_request();
        let request: FriendRequest = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/users/{}/notifications", b))
            .to_request();
        let body: NotificationsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.unread, 1);
        assert_eq!(body.notifications[0].notification_type, NotificationType::FriendRequest);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/friend-requests/{}/respond", request.id))
            .set_json(serde_json::json!({"responderId": b, "accept": true}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/v1/relationships/block")
            .set_json(serde_json::json!({"userId": b, "targetUserId": a}))
            .to_request();
        let body: RelationshipResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.r#match.map(|m| m.state), Some(MatchState::Blocked));

        let req = test::TestRequest::post()
            .uri("/api/v1/swipes")
            .set_json(serde_json::json!({"userId": a, "targetUserId": b, "direction": "LIKE"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_graceful_exit_without_match() {
        let state = AppState::new(Arc::new(MemoryStorage::new()), &Settings::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/relationships/graceful-exit")
            .set_json(serde_json::json!({"userId": Uuid::from_u128(3), "targetUserId": Uuid::from_u128(4)}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_unblock_over_http() {
        let state = AppState::new(Arc::new(MemoryStorage::new()), &Settings::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let (a, b) = (Uuid::from_u128(5), Uuid::from_u128(6));
        let req = test::TestRequest::post()
            .uri("/api/v1/relationships/block")
            .set_json(serde_json::json!({"userId": a, "targetUserId": b}))
            .to_request();
        let body: RelationshipResponse = test::call_and_read_body_json(&app, req).await;
        assert!(body.r#match.is_none());

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/users/{}/blocks", a))
            .to_request();
        let body: BlocksResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.blocks.len(), 1);
        assert_eq!(body.blocks[0].blocked, UserId(b));

        for expected in [true, false] {
            let req = test::TestRequest::post()
                .uri("/api/v1/relationships/unblock")
                .set_json(serde_json::json!({"userId": a, "targetUserId": b}))
                .to_request();
            let body: UnblockResponse = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body.unblocked, expected);
        }

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/users/{}/blocks", a))
            .to_request();
        let body: BlocksResponse = test::call_and_read_body_json(&app, req).await;
        assert!(body.blocks.is_empty());
    }
}
