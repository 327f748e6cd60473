//! Move coordination: per-game exclusivity layered over versioned writes.

mod coordinator;
mod error;
mod locks;

pub use coordinator::{MoveCoordinator, Operation, Transition};
pub use error::{EngineError, ErrorKind};
pub use locks::{GameLease, GameLocks, LockTimeout};
