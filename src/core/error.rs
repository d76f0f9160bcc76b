use super::{ItemId, OperationKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("{message}")]
    OperationFailed {
        kind: OperationKind,
        id: ItemId,
        message: String,
    },

    #[error("Operation already in flight for item {0}")]
    OperationInFlight(ItemId),

    #[error("Item {0} already exists")]
    DuplicateId(ItemId),

    #[error("{0} requires an item id")]
    MissingId(OperationKind),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Message surfaced through the controller's last-error field.
    pub fn message(&self) -> String {
        match self {
            StoreError::OperationFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_displays_raw_message() {
        let err = StoreError::OperationFailed {
            kind: OperationKind::Update,
            id: ItemId::from(1),
            message: "500 Internal Server Error".to_string(),
        };
        assert_eq!(err.to_string(), "500 Internal Server Error");
        assert_eq!(err.message(), "500 Internal Server Error");
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::ItemNotFound(ItemId::from(99));
        assert_eq!(err.message(), "Item not found: 99");
    }
}
