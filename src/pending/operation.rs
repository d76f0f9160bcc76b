use crate::collection::ItemCollection;
use crate::core::{Item, ItemId, OperationKind};
use chrono::{DateTime, Utc};
use log::debug;

/// A single reversible optimistic mutation.
///
/// Every variant that displaced an existing item stores the index it had when
/// the optimistic phase ran, so rollback and revert restore the same position.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOperation {
    /// Item was prepended under a temporary (or caller supplied) id.
    Create { item: Item },

    /// Item at `index` was replaced by `applied`.
    Update {
        index: usize,
        previous: Item,
        applied: Item,
    },

    /// Item at `index` was removed.
    Delete { index: usize, previous: Item },
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingOperation::Create { .. } => OperationKind::Create,
            PendingOperation::Update { .. } => OperationKind::Update,
            PendingOperation::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        match self {
            PendingOperation::Create { item } => &item.id,
            PendingOperation::Update { previous, .. } => &previous.id,
            PendingOperation::Delete { previous, .. } => &previous.id,
        }
    }

    /// Undoes this mutation against `collection`.
    ///
    /// Shared by failure rollback and explicit revert.
    pub fn undo(&self, collection: &mut ItemCollection) {
        match self {
            PendingOperation::Create { item } => {
                if collection.remove(&item.id).is_none() {
                    debug!("undo create: item {} already gone", item.id);
                }
            }
            PendingOperation::Update {
                index, previous, ..
            } => {
                collection.remove(&previous.id);
                let used = collection.insert_clamped(*index, previous.clone().confirmed());
                if used != *index {
                    debug!(
                        "undo update: item {} restored at {} instead of {}",
                        previous.id, used, index
                    );
                }
            }
            PendingOperation::Delete { index, previous } => {
                if collection.contains(&previous.id) {
                    debug!(
                        "undo delete: item {} was re-added meanwhile, leaving it",
                        previous.id
                    );
                    return;
                }
                collection.insert_clamped(*index, previous.clone().confirmed());
            }
        }
    }
}

/// Bookkeeping entry for an in-flight optimistic mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    /// Ticket identifying this particular operation; a resolution only
    /// applies while the record with its ticket is still registered.
    pub seq: u64,
    pub operation: PendingOperation,
    pub started_at: DateTime<Utc>,
}

impl PendingRecord {
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}
