// ============================================================================
// Mock Remote
// ============================================================================
//
// In-memory stand-in for the storefront's mock HTTP handlers. Holds the
// "server side" collection, assigns `srv-<n>` identifiers, and lets local
// development and tests inject failures, latency, and explicit gating.
//
// ============================================================================

use crate::core::{Item, ItemId, OperationKind, Payload, merge_payload};
use crate::remote::{OperationError, OperationResult, UpdateOperation};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};

/// One call received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub id: ItemId,
    pub payload: Payload,
    pub kind: OperationKind,
}

#[derive(Debug, Clone, PartialEq)]
enum FailureMode {
    Off,
    Next { remaining: usize, message: String },
    Always { message: String },
}

#[derive(Debug)]
struct MockState {
    items: Vec<Item>,
    next_id: u64,
    calls: Vec<MockCall>,
    failure: FailureMode,
}

#[derive(Debug)]
pub struct MockRemote {
    state: RwLock<MockState>,
    latency: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemote {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Mock seeded with server-side items.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            state: RwLock::new(MockState {
                items: items.into_iter().map(Item::confirmed).collect(),
                next_id: 1,
                calls: Vec::new(),
                failure: FailureMode::Off,
            }),
            latency: None,
            gate: None,
        }
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Holds every call until a matching [`MockRemote::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Lets `count` held calls proceed.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Fails the next `count` calls with a 500 carrying `message`.
    pub async fn fail_next(&self, count: usize, message: &str) {
        self.state.write().await.failure = FailureMode::Next {
            remaining: count,
            message: message.to_string(),
        };
    }

    /// Fails every call until [`MockRemote::recover`].
    pub async fn fail_always(&self, message: &str) {
        self.state.write().await.failure = FailureMode::Always {
            message: message.to_string(),
        };
    }

    pub async fn recover(&self) {
        self.state.write().await.failure = FailureMode::Off;
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls.len()
    }

    /// Server-side collection.
    pub async fn items(&self) -> Vec<Item> {
        self.state.read().await.items.clone()
    }

    fn take_failure(state: &mut MockState) -> Option<String> {
        let (message, exhausted) = match &mut state.failure {
            FailureMode::Off => return None,
            FailureMode::Always { message } => return Some(message.clone()),
            FailureMode::Next { remaining, message } => {
                *remaining = remaining.saturating_sub(1);
                (message.clone(), *remaining == 0)
            }
        };
        if exhausted {
            state.failure = FailureMode::Off;
        }
        Some(message)
    }
}

#[async_trait]
impl UpdateOperation for MockRemote {
    async fn apply(&self, id: &ItemId, payload: &Payload, kind: OperationKind) -> OperationResult {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| OperationError::with_status(503, "503 Service Unavailable: gate closed"))?
                .forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;
        state.calls.push(MockCall {
            id: id.clone(),
            payload: payload.clone(),
            kind,
        });

        if let Some(message) = Self::take_failure(&mut state) {
            debug!("mock {} of {} failing: {}", kind, id, message);
            return Err(OperationError::with_status(
                500,
                format!("500 Internal Server Error: {}", message),
            ));
        }

        match kind {
            OperationKind::Create => {
                let server_id = ItemId::Str(format!("srv-{}", state.next_id));
                state.next_id += 1;
                let item = Item::from_payload(server_id, payload)
                    .map_err(|err| OperationError::with_status(400, format!("400 Bad Request: {}", err)))?;
                state.items.insert(0, item.clone());
                Ok(Some(item))
            }
            OperationKind::Update => {
                let Some(existing) = state.items.iter_mut().find(|item| &item.id == id) else {
                    return Err(not_found(id));
                };
                merge_payload(existing, payload);
                Ok(Some(existing.clone()))
            }
            OperationKind::Delete => {
                let Some(index) = state.items.iter().position(|item| &item.id == id) else {
                    return Err(not_found(id));
                };
                state.items.remove(index);
                Ok(None)
            }
        }
    }
}

fn not_found(id: &ItemId) -> OperationError {
    OperationError::with_status(404, format!("404 Not Found: item {}", id))
}
