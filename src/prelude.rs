//! Everything an application needs to drive an optimistic collection.

pub use crate::{
    ConflictPolicy, ControllerConfig, FnOperation, Item, ItemId, OperationError, OperationKind,
    OptimisticController, Payload, StoreError, UpdateOperation, UpdateOutcome,
};
