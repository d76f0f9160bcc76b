// ============================================================================
// Optimistic Store Library
// ============================================================================

pub mod core;
pub mod collection;
pub mod config;
pub mod controller;
pub mod mock;
pub mod pending;
pub mod prelude;
pub mod remote;

// Re-export main types for convenience
pub use crate::core::{Item, ItemId, OperationKind, Payload, Result, StoreError};
pub use collection::ItemCollection;
pub use config::{ConflictPolicy, ControllerConfig};
pub use controller::{
    ControllerBuilder, ControllerSnapshot, OptimisticController, PendingSummary, UpdateOutcome,
};
pub use mock::{MockCall, MockRemote};
pub use pending::{PendingOperation, PendingRecord};
pub use remote::{FnOperation, OperationError, OperationResult, UpdateOperation};
