// Engine exports
pub mod clock;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod locks;
pub mod state_machine;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::RelationshipTransitionCoordinator;
pub use engine::{MatchingEngine, SwipeResult, UndoResult};
pub use error::{EngineError, TransitionError};
pub use locks::{LockTimeout, PairLockGuard, UserLockGuard, UserLockRegistry};
pub use state_machine::{apply_transition, can_message, can_transition, is_terminal, TransitionOutcome};
