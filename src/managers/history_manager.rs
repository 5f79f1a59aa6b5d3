//! History Manager for Tabio.
//!
//! Two bounded stacks of [`TabSnapshot`]s give undo/redo over the window's
//! grouping. Both stacks are persisted together after every change and
//! reloaded verbatim at start-up. A failed restore leaves both stacks exactly
//! as they were before the call.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::database::KeyValueStore;
use crate::managers::group_mutator::RestoreReport;
use crate::types::errors::{HistoryError, MutationError};
use crate::types::tab::TabSnapshot;

/// Maximum number of snapshots kept per stack.
pub const HISTORY_CAPACITY: usize = 20;

/// Store key of the undo stack.
pub const UNDO_KEY: &str = "undoStack";

/// Store key of the redo stack.
pub const REDO_KEY: &str = "redoStack";

/// Captures and restores window snapshots on behalf of the history.
#[async_trait]
pub trait SnapshotHost: Send + Sync {
    /// `None` when the window could not be read.
    async fn capture_state(&self) -> Option<TabSnapshot>;

    async fn restore_state(&self, snapshot: &TabSnapshot) -> Result<RestoreReport, MutationError>;
}

/// LIFO stack that drops its oldest entry when pushed past capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedStack {
    entries: VecDeque<TabSnapshot>,
    capacity: usize,
}

impl BoundedStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Builds a stack from oldest-first entries, keeping the newest `capacity`.
    pub fn from_vec(entries: Vec<TabSnapshot>, capacity: usize) -> Self {
        let mut entries = VecDeque::from(entries);
        while entries.len() > capacity {
            entries.pop_front();
        }
        Self { entries, capacity }
    }

    /// Pushes on top; returns the evicted oldest entry, if any.
    pub fn push(&mut self, snapshot: TabSnapshot) -> Option<TabSnapshot> {
        self.entries.push_back(snapshot);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<TabSnapshot> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&TabSnapshot> {
        self.entries.back()
    }

    /// Puts a previously evicted entry back at the bottom.
    fn restore_oldest(&mut self, snapshot: TabSnapshot) {
        self.entries.push_front(snapshot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TabSnapshot> {
        self.entries.iter()
    }

    /// Entries oldest first, the persisted order.
    pub fn to_vec(&self) -> Vec<TabSnapshot> {
        self.entries.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

/// Undo/redo history backed by a key-value store.
pub struct HistoryManager {
    undo: BoundedStack,
    redo: BoundedStack,
    store: Arc<dyn KeyValueStore>,
}

impl HistoryManager {
    /// Creates an empty history; nothing is read from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            undo: BoundedStack::new(HISTORY_CAPACITY),
            redo: BoundedStack::new(HISTORY_CAPACITY),
            store,
        }
    }

    /// Loads both stacks from `store`. Missing or unreadable stacks start empty.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let undo = Self::read_stack(store.as_ref(), UNDO_KEY);
        let redo = Self::read_stack(store.as_ref(), REDO_KEY);
        info!(undo = undo.len(), redo = redo.len(), "loaded history");
        Self { undo, redo, store }
    }

    fn read_stack(store: &dyn KeyValueStore, key: &str) -> BoundedStack {
        let value = match store.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return BoundedStack::new(HISTORY_CAPACITY),
            Err(e) => {
                warn!(key, error = %e, "failed to read history");
                return BoundedStack::new(HISTORY_CAPACITY);
            }
        };
        match serde_json::from_value::<Vec<TabSnapshot>>(value) {
            Ok(entries) => BoundedStack::from_vec(entries, HISTORY_CAPACITY),
            Err(e) => {
                warn!(key, error = %e, "discarding malformed history");
                BoundedStack::new(HISTORY_CAPACITY)
            }
        }
    }

    /// Records the current window state before a mutating action.
    ///
    /// Returns false when the state could not be captured; the action then
    /// proceeds without undo data and the redo stack is left alone.
    pub async fn record_checkpoint(&mut self, host: &dyn SnapshotHost) -> bool {
        let Some(snapshot) = host.capture_state().await else {
            warn!("skipping history checkpoint, window state unavailable");
            return false;
        };
        if self.undo.push(snapshot).is_some() {
            debug!("evicted oldest undo entry");
        }
        self.redo.clear();
        self.persist();
        true
    }

    /// Restores the most recent undo snapshot.
    pub async fn undo(&mut self, host: &dyn SnapshotHost) -> Result<RestoreReport, HistoryError> {
        self.step(Direction::Undo, host).await
    }

    /// Restores the most recent redo snapshot.
    pub async fn redo(&mut self, host: &dyn SnapshotHost) -> Result<RestoreReport, HistoryError> {
        self.step(Direction::Redo, host).await
    }

    async fn step(&mut self, direction: Direction, host: &dyn SnapshotHost) -> Result<RestoreReport, HistoryError> {
        let (from, to) = match direction {
            Direction::Undo => (&mut self.undo, &mut self.redo),
            Direction::Redo => (&mut self.redo, &mut self.undo),
        };
        let Some(target) = from.pop() else {
            return Err(HistoryError::EmptyHistory);
        };

        let current = host.capture_state().await;
        let pushed = current.is_some();
        let evicted = current.and_then(|snapshot| to.push(snapshot));

        let restored = host.restore_state(&target).await;
        match restored {
            Ok(report) => {
                if report.groups_failed > 0 {
                    warn!(
                        restored = report.groups_restored,
                        failed = report.groups_failed,
                        "snapshot partially restored"
                    );
                }
                self.persist();
                Ok(report)
            }
            Err(e) => {
                error!(?direction, error = %e, "failed to restore snapshot, rolling back history");
                from.push(target);
                if pushed {
                    to.pop();
                    if let Some(oldest) = evicted {
                        to.restore_oldest(oldest);
                    }
                }
                Err(HistoryError::RestoreFailed(e.to_string()))
            }
        }
    }

    /// Writes both stacks in one store call. Failures are logged only.
    fn persist(&self) {
        let stacks = serde_json::to_value(self.undo.to_vec())
            .and_then(|undo| serde_json::to_value(self.redo.to_vec()).map(|redo| (undo, redo)));
        let (undo, redo) = match stacks {
            Ok(stacks) => stacks,
            Err(e) => {
                warn!(error = %e, "failed to serialize history");
                return;
            }
        };
        if let Err(e) = self.store.set_many(&[(UNDO_KEY, undo), (REDO_KEY, redo)]) {
            warn!(error = %e, "failed to persist history");
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_stack(&self) -> &BoundedStack {
        &self.undo
    }

    pub fn redo_stack(&self) -> &BoundedStack {
        &self.redo
    }
}
