// ============================================================================
// External Update Operation
// ============================================================================
//
// The controller's only collaborator: whatever performs the authoritative
// mutation (an HTTP client, a mock handler, a database). It may suspend and
// it may fail with a human-readable message.
//
// ============================================================================

use crate::core::{Item, ItemId, OperationKind, Payload};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an [`UpdateOperation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationError {
    pub message: String,
    /// Transport status code, when the collaborator has one.
    pub status: Option<u16>,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

pub type OperationResult = std::result::Result<Option<Item>, OperationError>;

/// Authoritative mutation behind the optimistic controller.
///
/// - `create` must return the created item with its server-assigned id.
/// - `update` must return the updated item.
/// - `delete` may return anything; only success matters.
#[async_trait]
pub trait UpdateOperation: Send + Sync {
    async fn apply(&self, id: &ItemId, payload: &Payload, kind: OperationKind) -> OperationResult;
}

#[async_trait]
impl<T: UpdateOperation + ?Sized> UpdateOperation for Arc<T> {
    async fn apply(&self, id: &ItemId, payload: &Payload, kind: OperationKind) -> OperationResult {
        (**self).apply(id, payload, kind).await
    }
}

/// Adapts an async closure into an [`UpdateOperation`].
pub struct FnOperation<F> {
    f: F,
}

impl<F> FnOperation<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> UpdateOperation for FnOperation<F>
where
    F: Fn(ItemId, Payload, OperationKind) -> Fut + Send + Sync,
    Fut: Future<Output = OperationResult> + Send,
{
    async fn apply(&self, id: &ItemId, payload: &Payload, kind: OperationKind) -> OperationResult {
        (self.f)(id.clone(), payload.clone(), kind).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_operation_forwards_arguments() {
        let op = FnOperation::new(|id: ItemId, payload: Payload, kind: OperationKind| async move {
            assert_eq!(kind, OperationKind::Update);
            let result: OperationResult = match Item::from_payload(id, &payload) {
                Ok(mut item) => {
                    item.fields.insert("seen".to_string(), json!(true));
                    Ok(Some(item))
                }
                Err(err) => Err(OperationError::new(err.to_string())),
            };
            result
        });

        let result = op
            .apply(&ItemId::from(1), &json!({"name": "B"}), OperationKind::Update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.field("name"), Some(&json!("B")));
        assert_eq!(result.field("seen"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_arc_operation_delegates() {
        let op: Arc<dyn UpdateOperation> = Arc::new(FnOperation::new(
            |_id: ItemId, _payload: Payload, _kind: OperationKind| async move {
                Err::<Option<Item>, _>(OperationError::with_status(503, "unavailable"))
            },
        ));

        let err = op
            .apply(&ItemId::from(1), &Payload::Null, OperationKind::Delete)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(503));
        assert_eq!(err.to_string(), "unavailable");
    }
}
