use super::{engine_error, validation_error, AppState};
use crate::models::{HealthResponse, MatchesResponse, SwipeRequest, UndoSwipeRequest, UserId};
use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Configure swipe and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/swipes", web::post().to(record_swipe))
        .route("/swipes/undo", web::post().to(undo_swipe))
        .route("/users/{id}/matches", web::get().to(list_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.storage.health_check().await.unwrap_or(false);

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage.backend_name().to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Record a swipe
///
/// POST /api/v1/swipes
///
/// Request body:
/// ```json
/// {
///   "userId": "uuid",
///   "targetUserId": "uuid",
///   "direction": "LIKE"
/// }
/// ```
async fn record_swipe(state: web::Data<AppState>, req: web::Json<SwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let from = UserId(req.user_id);
    let to = UserId(req.target_user_id);

    tracing::info!("Swipe {:?} from {} to {}", req.direction, from, to);

    match state.engine.record_swipe(from, to, req.direction).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => engine_error(e),
    }
}

/// POST /api/v1/swipes/undo
async fn undo_swipe(state: web::Data<AppState>, req: web::Json<UndoSwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.engine.undo_last_swipe(UserId(req.user_id)).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => engine_error(e),
    }
}

/// GET /api/v1/users/{id}/matches
async fn list_matches(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let user = UserId(path.into_inner());

    match state.coordinator.matches_for(user).await {
        Ok(matches) => HttpResponse::Ok().json(MatchesResponse {
            total: matches.len(),
            matches,
        }),
        Err(e) => engine_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::MemoryStorage;
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStorage::new()), &Settings::default())
    }

    #[actix_web::test]
    async fn test_health_reports_backend() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.storage, "memory");
    }

    #[actix_web::test]
    async fn test_self_swipe_is_unprocessable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let user = Uuid::from_u128(1);
        let req = test::TestRequest::post()
            .uri("/api/v1/swipes")
            .set_json(serde_json::json!({
                "userId": user,
                "targetUserId": user,
                "direction": "LIKE",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
