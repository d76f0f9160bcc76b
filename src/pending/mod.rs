// ============================================================================
// Pending Operation Tracking
// ============================================================================
//
// Every optimistic mutation is recorded as a reversible change so it can be
// reconciled with the authoritative result or undone on failure/revert.
// Records are keyed by item identifier; at most one exists per identifier.
//
// ============================================================================

pub mod operation;
pub mod table;

pub use operation::{PendingOperation, PendingRecord};
pub use table::PendingTable;
