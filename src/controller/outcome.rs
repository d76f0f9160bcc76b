use crate::core::{Item, ItemId, OperationKind};
use serde::{Deserialize, Serialize};

/// Result of a call to [`super::OptimisticController::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The collaborator confirmed a create or update; carries the authoritative item.
    Confirmed(Item),
    /// The collaborator confirmed a delete.
    Deleted,
    /// No collaborator is configured; the optimistic result is final.
    /// `None` for deletes.
    Local(Option<Item>),
    /// The target of an update or delete is not in the collection.
    /// Nothing was mutated and the collaborator was not called.
    NotFound(ItemId),
}

impl UpdateOutcome {
    pub fn item(&self) -> Option<&Item> {
        match self {
            UpdateOutcome::Confirmed(item) => Some(item),
            UpdateOutcome::Local(item) => item.as_ref(),
            UpdateOutcome::Deleted | UpdateOutcome::NotFound(_) => None,
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            UpdateOutcome::Confirmed(item) => Some(item),
            UpdateOutcome::Local(item) => item,
            UpdateOutcome::Deleted | UpdateOutcome::NotFound(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpdateOutcome::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSummary {
    pub id: ItemId,
    pub kind: OperationKind,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Point-in-time view of the controller state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub version: u64,
    pub items: Vec<Item>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub pending: Vec<PendingSummary>,
}
