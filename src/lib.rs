//! Lume Bond - matching and relationship lifecycle engine for the Lume dating app
//!
//! Records swipes, turns mutual likes into matches and moves each match
//! through its lifecycle (friend zone, graceful exit, unmatch, block). All
//! writes of one operation commit together, and operations touching the same
//! users are serialized by a per-user lock registry.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{EngineError, MatchingEngine, RelationshipTransitionCoordinator, UserLockRegistry};
pub use models::{Direction, Match, MatchId, MatchState, UserId};
pub use services::{MemoryStorage, PostgresStorage, Storage};
