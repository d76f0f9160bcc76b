// ============================================================================
// Optimistic Update Controller
// ============================================================================
//
// Owns a local mirror of a remote collection. Each mutation is applied
// immediately (optimistic phase), then the external update operation is
// awaited and the mirror is reconciled with its result or rolled back.
//
// State transitions are short read-modify-write steps under one lock that is
// never held across the collaborator await, so readers observe the
// optimistic state while an operation is in flight.
//
// ============================================================================

mod in_flight;
mod key_lock;
mod outcome;

pub use outcome::{ControllerSnapshot, PendingSummary, UpdateOutcome};

use crate::collection::ItemCollection;
use crate::config::{ConflictPolicy, ControllerConfig};
use crate::core::{Item, ItemId, OperationKind, Payload, Result, StoreError, merge_payload};
use crate::pending::{PendingOperation, PendingTable};
use crate::remote::{OperationError, UpdateOperation};
use in_flight::{InFlight, InFlightSlot};
use key_lock::KeyLocks;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{Instrument, info_span};

#[derive(Debug, Default)]
struct ControllerState {
    items: ItemCollection,
    pending: PendingTable,
    last_error: Option<String>,
}

/// Outcome of the optimistic phase.
enum Began<'a> {
    Started {
        seq: u64,
        item: Option<Item>,
        slot: InFlightSlot<'a>,
    },
    NotFound,
}

pub struct OptimisticController {
    state: RwLock<ControllerState>,
    operation: Option<Arc<dyn UpdateOperation>>,
    config: ControllerConfig,
    key_locks: KeyLocks,
    in_flight: InFlight,
    version: watch::Sender<u64>,
}

pub struct ControllerBuilder {
    items: Vec<Item>,
    operation: Option<Arc<dyn UpdateOperation>>,
    config: ControllerConfig,
}

impl ControllerBuilder {
    /// Initial collection.
    pub fn items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    pub fn operation(mut self, operation: impl UpdateOperation + 'static) -> Self {
        self.operation = Some(Arc::new(operation));
        self
    }

    pub fn shared_operation(mut self, operation: Arc<dyn UpdateOperation>) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<OptimisticController> {
        self.config.validate_for(self.operation.is_some())?;
        Ok(OptimisticController::assemble(
            self.items,
            self.operation,
            self.config,
        ))
    }
}

impl OptimisticController {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder {
            items: Vec::new(),
            operation: None,
            config: ControllerConfig::default(),
        }
    }

    /// Controller backed by `operation` with default configuration.
    pub fn new(items: Vec<Item>, operation: impl UpdateOperation + 'static) -> Self {
        Self::assemble(items, Some(Arc::new(operation)), ControllerConfig::default())
    }

    /// Controller without a collaborator; every optimistic result is final.
    pub fn local(items: Vec<Item>) -> Self {
        Self::assemble(items, None, ControllerConfig::default())
    }

    fn assemble(
        items: Vec<Item>,
        operation: Option<Arc<dyn UpdateOperation>>,
        config: ControllerConfig,
    ) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: RwLock::new(ControllerState {
                items: confirmed_collection(items),
                ..ControllerState::default()
            }),
            operation,
            config,
            key_locks: KeyLocks::new(),
            in_flight: InFlight::new(),
            version,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Applies `kind` optimistically, then confirms it with the update operation.
    ///
    /// `item_id` may be `None` only for `create`; the id is then taken from the
    /// payload's `id` field or synthesized. On collaborator failure the
    /// mutation is rolled back and the failure is returned after being stored
    /// as the last error.
    pub async fn update(
        &self,
        item_id: Option<ItemId>,
        payload: Payload,
        kind: OperationKind,
    ) -> Result<UpdateOutcome> {
        let id = match item_id {
            Some(id) => id,
            None if kind == OperationKind::Create => payload
                .get("id")
                .and_then(ItemId::from_value)
                .unwrap_or_else(|| ItemId::temporary(&self.config.temp_id_prefix)),
            None => {
                let err = StoreError::MissingId(kind);
                self.record_error(err.message()).await;
                return Err(err);
            }
        };

        let span = info_span!("optimistic.update", item_id = %id, kind = %kind);
        self.run(id, payload, kind).instrument(span).await
    }

    pub async fn create(&self, payload: Payload) -> Result<UpdateOutcome> {
        self.update(None, payload, OperationKind::Create).await
    }

    pub async fn update_item(&self, id: impl Into<ItemId>, payload: Payload) -> Result<UpdateOutcome> {
        self.update(Some(id.into()), payload, OperationKind::Update).await
    }

    pub async fn delete(&self, id: impl Into<ItemId>) -> Result<UpdateOutcome> {
        self.update(Some(id.into()), Payload::Null, OperationKind::Delete)
            .await
    }

    /// Undoes the recorded optimistic mutation for `id`.
    ///
    /// Returns `false` without touching anything when no record exists.
    /// A later resolution of the reverted operation leaves the collection alone.
    pub async fn revert(&self, id: &ItemId) -> bool {
        let mut state = self.state.write().await;
        let Some(record) = state.pending.take(id) else {
            return false;
        };
        record.operation.undo(&mut state.items);
        drop(state);

        debug!("reverted optimistic {} of item {}", record.kind(), id);
        self.bump();
        true
    }

    /// Re-synchronizes the mirror from an externally supplied collection.
    ///
    /// Pending records are discarded; resolutions still in flight become stale.
    pub async fn sync(&self, items: Vec<Item>) {
        let mut state = self.state.write().await;
        state.items = confirmed_collection(items);
        let dropped = state.pending.clear();
        let len = state.items.len();
        drop(state);

        if dropped > 0 {
            warn!(
                "sync discarded {} pending optimistic operation(s); their results will be ignored",
                dropped
            );
        }
        debug!("synchronized mirror with {} item(s)", len);
        self.bump();
    }

    // ------------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------------

    pub async fn items(&self) -> Vec<Item> {
        self.state.read().await.items.items().to_vec()
    }

    pub async fn get(&self, id: &ItemId) -> Option<Item> {
        self.state.read().await.items.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    pub async fn is_loading(&self) -> bool {
        self.in_flight.is_active()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
        self.bump();
    }

    pub async fn is_pending(&self, id: &ItemId) -> bool {
        self.state.read().await.pending.contains(id)
    }

    pub async fn pending_kind(&self, id: &ItemId) -> Option<OperationKind> {
        self.state.read().await.pending.get(id).map(|record| record.kind())
    }

    pub async fn pending_ids(&self) -> Vec<ItemId> {
        self.state.read().await.pending.ids()
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.read().await;
        let pending = state
            .pending
            .ids()
            .into_iter()
            .filter_map(|id| {
                state.pending.get(&id).map(|record| PendingSummary {
                    kind: record.kind(),
                    started_at: record.started_at,
                    id,
                })
            })
            .collect();

        ControllerSnapshot {
            version: *self.version.borrow(),
            items: state.items.items().to_vec(),
            loading: self.in_flight.is_active(),
            last_error: state.last_error.clone(),
            pending,
        }
    }

    /// Receiver of a counter bumped on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn run(&self, id: ItemId, payload: Payload, kind: OperationKind) -> Result<UpdateOutcome> {
        let _key_guard = match self.config.conflict_policy {
            ConflictPolicy::Queue => Some(self.key_locks.acquire(&id).await),
            ConflictPolicy::Reject => None,
        };

        let (seq, optimistic, slot) = match self.begin(&id, &payload, kind).await? {
            Began::Started { seq, item, slot } => (seq, item, slot),
            Began::NotFound => return Ok(UpdateOutcome::NotFound(id)),
        };

        let Some(operation) = self.operation.clone() else {
            return Ok(self.finish_local(&id, seq, optimistic, slot).await);
        };

        match operation.apply(&id, &payload, kind).await {
            Ok(Some(server_item)) => {
                self.resolve_success(&id, seq, kind, Some(server_item), slot)
                    .await
            }
            Ok(None) if kind == OperationKind::Delete => {
                self.resolve_success(&id, seq, kind, None, slot).await
            }
            Ok(None) => {
                let err = OperationError::new("Operation returned no item");
                self.resolve_failure(&id, seq, kind, err, slot).await
            }
            Err(err) => self.resolve_failure(&id, seq, kind, err, slot).await,
        }
    }

    /// Optimistic phase: validate, mutate the mirror, register the pending record.
    ///
    /// The returned slot keeps the loading flag raised until it is dropped.
    async fn begin(
        &self,
        id: &ItemId,
        payload: &Payload,
        kind: OperationKind,
    ) -> Result<Began<'_>> {
        let mut state = self.state.write().await;
        state.last_error = None;

        if self.config.conflict_policy == ConflictPolicy::Reject && state.pending.contains(id) {
            let err = StoreError::OperationInFlight(id.clone());
            state.last_error = Some(err.message());
            drop(state);
            self.bump();
            return Err(err);
        }

        let (operation, item) = match kind {
            OperationKind::Create => {
                if state.items.contains(id) {
                    let err = StoreError::DuplicateId(id.clone());
                    state.last_error = Some(err.message());
                    drop(state);
                    self.bump();
                    return Err(err);
                }
                let item = match Item::from_payload(id.clone(), payload) {
                    Ok(item) => item.mark_optimistic(),
                    Err(err) => {
                        state.last_error = Some(err.message());
                        drop(state);
                        self.bump();
                        return Err(err);
                    }
                };
                state.items.prepend(item.clone());
                (PendingOperation::Create { item: item.clone() }, Some(item))
            }
            OperationKind::Update => {
                let Some(index) = state.items.position(id) else {
                    return Ok(self.not_found(state, id));
                };
                let previous = state.items.items()[index].clone();
                let mut applied = previous.clone();
                merge_payload(&mut applied, payload);
                let applied = applied.mark_optimistic();
                state.items.replace(id, applied.clone());
                (
                    PendingOperation::Update {
                        index,
                        previous,
                        applied: applied.clone(),
                    },
                    Some(applied),
                )
            }
            OperationKind::Delete => {
                let Some((index, previous)) = state.items.remove(id) else {
                    return Ok(self.not_found(state, id));
                };
                (PendingOperation::Delete { index, previous }, None)
            }
        };

        let (seq, replaced) = state.pending.begin(operation);
        if let Some(replaced) = replaced {
            warn!(
                "optimistic {} on item {} replaced an unresolved {}",
                kind,
                id,
                replaced.kind()
            );
        }
        let slot = self.in_flight.enter();
        drop(state);

        debug!("optimistic {} applied to item {} (seq {})", kind, id, seq);
        self.bump();
        Ok(Began::Started { seq, item, slot })
    }

    fn not_found(
        &self,
        mut state: tokio::sync::RwLockWriteGuard<'_, ControllerState>,
        id: &ItemId,
    ) -> Began<'_> {
        state.last_error = Some(StoreError::ItemNotFound(id.clone()).message());
        drop(state);
        debug!("item {} not found; nothing applied", id);
        self.bump();
        Began::NotFound
    }

    async fn finish_local(
        &self,
        id: &ItemId,
        seq: u64,
        optimistic: Option<Item>,
        slot: InFlightSlot<'_>,
    ) -> UpdateOutcome {
        let mut state = self.state.write().await;
        drop(slot);
        let current = state.pending.take_if_current(id, seq).is_some();

        let item = optimistic.map(Item::confirmed);
        if current {
            if let Some(item) = &item {
                state.items.replace(id, item.clone());
            }
        }
        drop(state);

        self.bump();
        UpdateOutcome::Local(item)
    }

    async fn resolve_success(
        &self,
        id: &ItemId,
        seq: u64,
        kind: OperationKind,
        server_item: Option<Item>,
        slot: InFlightSlot<'_>,
    ) -> Result<UpdateOutcome> {
        let server_item = server_item.map(Item::confirmed);
        let mut state = self.state.write().await;
        drop(slot);

        match state.pending.take_if_current(id, seq) {
            Some(record) => match (&record.operation, &server_item) {
                (PendingOperation::Create { .. }, Some(server)) => {
                    if &server.id != id && state.items.contains(&server.id) {
                        state.items.remove(id);
                        state.items.replace(&server.id, server.clone());
                    } else if !state.items.replace(id, server.clone()) {
                        state.items.prepend(server.clone());
                    }
                }
                (PendingOperation::Update { index, .. }, Some(server)) => {
                    // The answer may carry a different id; never keep both entries.
                    let at = state.items.remove(id).map_or(*index, |(at, _)| at);
                    if !state.items.replace(&server.id, server.clone()) {
                        state.items.insert_clamped(at, server.clone());
                    }
                }
                _ => {}
            },
            None => {
                warn!(
                    "{} of item {} confirmed after its optimistic state was discarded; leaving mirror unchanged",
                    kind, id
                );
            }
        }
        drop(state);

        debug!("{} of item {} confirmed", kind, id);
        self.bump();
        Ok(match server_item {
            Some(item) if kind != OperationKind::Delete => UpdateOutcome::Confirmed(item),
            _ => UpdateOutcome::Deleted,
        })
    }

    async fn resolve_failure(
        &self,
        id: &ItemId,
        seq: u64,
        kind: OperationKind,
        err: OperationError,
        slot: InFlightSlot<'_>,
    ) -> Result<UpdateOutcome> {
        let message = if err.message.trim().is_empty() {
            self.config.default_error_message.clone()
        } else {
            err.message
        };

        let mut state = self.state.write().await;
        drop(slot);
        state.last_error = Some(message.clone());
        match state.pending.take_if_current(id, seq) {
            Some(record) => {
                record.operation.undo(&mut state.items);
                warn!("{} of item {} failed, rolled back: {}", kind, id, message);
            }
            None => {
                warn!(
                    "{} of item {} failed after its optimistic state was discarded: {}",
                    kind, id, message
                );
            }
        }
        drop(state);

        self.bump();
        Err(StoreError::OperationFailed {
            kind,
            id: id.clone(),
            message,
        })
    }

    async fn record_error(&self, message: String) {
        self.state.write().await.last_error = Some(message);
        self.bump();
    }

    fn bump(&self) {
        self.version.send_modify(|version| *version += 1);
    }
}

fn confirmed_collection(items: Vec<Item>) -> ItemCollection {
    ItemCollection::from_items(items.into_iter().map(Item::confirmed).collect())
}
