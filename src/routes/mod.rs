// Route exports
pub mod relationships;
pub mod swipes;

use crate::config::Settings;
use crate::core::{EngineError, MatchingEngine, RelationshipTransitionCoordinator, UserLockRegistry};
use crate::models::ErrorResponse;
use crate::services::Storage;
use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;
use validator::ValidationErrors;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub engine: MatchingEngine,
    pub coordinator: RelationshipTransitionCoordinator,
}

impl AppState {
    /// Engine and coordinator share one lock registry
    pub fn new(storage: Arc<dyn Storage>, settings: &Settings) -> Self {
        let locks = UserLockRegistry::new(settings.matching.lock_timeout());
        Self {
            engine: MatchingEngine::new(
                Arc::clone(&storage),
                locks.clone(),
                settings.matching.clone(),
            ),
            coordinator: RelationshipTransitionCoordinator::new(
                Arc::clone(&storage),
                locks,
                settings.relationships.clone(),
            ),
            storage,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(swipes::configure)
            .configure(relationships::configure),
    );
}

pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotAuthorized => StatusCode::FORBIDDEN,
        EngineError::MatchNotFound
        | EngineError::NoActiveMatch
        | EngineError::RequestNotFound
        | EngineError::NothingToUndo => StatusCode::NOT_FOUND,
        EngineError::InvalidTransition { .. }
        | EngineError::AlreadyTerminal { .. }
        | EngineError::RelationshipTerminated { .. }
        | EngineError::Blocked
        | EngineError::RequestPending
        | EngineError::AlreadyResponded
        | EngineError::StorageConflict(_) => StatusCode::CONFLICT,
        EngineError::MessageTooShort { .. }
        | EngineError::InvalidRequest(_)
        | EngineError::UndoWindowExpired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        EngineError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn engine_error(err: EngineError) -> HttpResponse {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!("Request failed: {} ({:?})", err, err);
    } else {
        tracing::info!("Request rejected: {}", err);
    }

    HttpResponse::build(status).json(ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn validation_error(errors: ValidationErrors) -> HttpResponse {
    tracing::info!("Validation failed: field_errors={:?}", errors);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
