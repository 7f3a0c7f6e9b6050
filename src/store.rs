//! The item record store: single source of truth for tracked items and the
//! active wizard step.
//!
//! Every mutation is an atomic replace-on-write over the full item
//! collection behind one mutex, so concurrent per-item updates from the
//! orchestrator are last-writer-wins at item granularity and can never
//! interleave half-applied patches. All store operations are total: updating
//! or removing an absent id is a no-op, never an error.
//!
//! Two side effects accompany every mutation:
//!
//! * **Persistence** — the full state is snapshotted as JSON and written
//!   with a temp-file + rename so a crash can never leave a torn snapshot.
//!   Persistence failures are logged at `warn` and do not fail the
//!   mutation; the in-memory state remains authoritative.
//! * **Notification** — registered [`StoreObserver`]s receive the event.
//!   Observers run synchronously under no lock, with a clone of the
//!   affected item, so they may call back into the store.

use crate::error::ConvertError;
use crate::item::{Item, ItemPatch};
use crate::wizard::WizardStep;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Receives store events. All methods default to no-ops so observers only
/// override what they care about.
///
/// Implementations must be `Send + Sync`: the orchestrator mutates the
/// store from concurrently running item tasks.
pub trait StoreObserver: Send + Sync {
    fn on_item_added(&self, item: &Item) {
        let _ = item;
    }

    /// Called after a patch was merged into the item (the clone reflects
    /// the post-merge state).
    fn on_item_updated(&self, item: &Item) {
        let _ = item;
    }

    fn on_item_removed(&self, id: &str) {
        let _ = id;
    }

    fn on_step_changed(&self, step: WizardStep) {
        let _ = step;
    }

    /// Called on [`ItemStore::reset`], after items were cleared and the
    /// step returned to [`WizardStep::Upload`].
    fn on_reset(&self) {}
}

/// Serialized snapshot of the store: the full item collection plus the
/// active wizard step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    items: Vec<Item>,
    #[serde(default)]
    step: WizardStep,
}

struct Inner {
    state: Mutex<Snapshot>,
    observers: Mutex<Vec<Arc<dyn StoreObserver>>>,
    snapshot_path: Option<PathBuf>,
}

/// Handle to the shared item store. Cloning is cheap; all clones see the
/// same state.
#[derive(Clone)]
pub struct ItemStore {
    inner: Arc<Inner>,
}

impl ItemStore {
    /// An in-memory store with no persistence.
    pub fn in_memory() -> Self {
        ItemStore {
            inner: Arc::new(Inner {
                state: Mutex::new(Snapshot::default()),
                observers: Mutex::new(Vec::new()),
                snapshot_path: None,
            }),
        }
    }

    /// Open a store persisted at `path`, loading the existing snapshot when
    /// one is present.
    ///
    /// A missing file yields an empty store; an unreadable or corrupt file
    /// is a fatal error so stale wizard state is never silently discarded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes).map_err(|e| {
                ConvertError::CorruptSnapshot {
                    path: path.clone(),
                    detail: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                return Err(ConvertError::SnapshotReadFailed { path, source: e });
            }
        };
        debug!(
            items = snapshot.items.len(),
            step = %snapshot.step,
            "Opened store snapshot: {}",
            path.display()
        );
        Ok(ItemStore {
            inner: Arc::new(Inner {
                state: Mutex::new(snapshot),
                observers: Mutex::new(Vec::new()),
                snapshot_path: Some(path),
            }),
        })
    }

    /// Register an observer for all subsequent mutations.
    pub fn subscribe(&self, observer: Arc<dyn StoreObserver>) {
        self.inner.observers.lock().unwrap().push(observer);
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Snapshot of all tracked items, in insertion order.
    pub fn items(&self) -> Vec<Item> {
        self.inner.state.lock().unwrap().items.clone()
    }

    /// Clone of the item with the given id, if tracked.
    pub fn get(&self, id: &str) -> Option<Item> {
        self.inner
            .state
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// The active wizard step.
    pub fn step(&self) -> WizardStep {
        self.inner.state.lock().unwrap().step
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.inner.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Append an item. No de-duplication by id is enforced; that is the
    /// caller's responsibility.
    pub fn add(&self, item: Item) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.items.push(item.clone());
            self.persist(&state);
        }
        self.notify(|o| o.on_item_added(&item));
    }

    /// Shallow-merge `patch` into the matching item. A no-op when `id` is
    /// not tracked — the orchestrator relies on this to tolerate items
    /// removed mid-conversion.
    pub fn update(&self, id: &str, patch: ItemPatch) {
        let updated = {
            let mut state = self.inner.state.lock().unwrap();
            let updated = state.items.iter_mut().find(|i| i.id == id).map(|item| {
                patch.apply(item);
                item.clone()
            });
            if updated.is_some() {
                self.persist(&state);
            }
            updated
        };
        match updated {
            Some(item) => self.notify(|o| o.on_item_updated(&item)),
            None => debug!("update for untracked item '{id}' ignored"),
        }
    }

    /// Remove the item. Has no effect on an in-flight operation; the
    /// orchestrator's eventual `update` becomes a harmless no-op.
    pub fn remove(&self, id: &str) {
        let removed = {
            let mut state = self.inner.state.lock().unwrap();
            let before = state.items.len();
            state.items.retain(|i| i.id != id);
            let removed = state.items.len() != before;
            if removed {
                self.persist(&state);
            }
            removed
        };
        if removed {
            self.notify(|o| o.on_item_removed(id));
        }
    }

    /// Set the active wizard step.
    pub fn set_step(&self, step: WizardStep) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.step = step;
            self.persist(&state);
        }
        self.notify(|o| o.on_step_changed(step));
    }

    /// Clear all items and return the wizard to [`WizardStep::Upload`].
    pub fn reset(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.items.clear();
            state.step = WizardStep::Upload;
            self.persist(&state);
        }
        self.notify(|o| o.on_reset());
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Write the snapshot atomically: temp file in the same directory, then
    /// rename over the target. Failures are logged, never propagated —
    /// store operations stay total.
    fn persist(&self, state: &Snapshot) {
        let Some(ref path) = self.inner.snapshot_path else {
            return;
        };
        if let Err(e) = write_snapshot(path, state) {
            warn!("Failed to persist store snapshot to {}: {e}", path.display());
        }
    }

    fn notify(&self, f: impl Fn(&dyn StoreObserver)) {
        let observers = self.inner.observers.lock().unwrap().clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }
}

fn write_snapshot(path: &Path, state: &Snapshot) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
