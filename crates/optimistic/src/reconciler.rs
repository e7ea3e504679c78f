//! Optimistic list state

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use homeboard_core::{display_order, now, ListItem, ListPayload};

use crate::mutations::{ListMutations, MutationResult};
use crate::pending::{NextSnapshotWins, PendingCreate, PendingMutations, SettlementPolicy};

/// Latest confirmed server state
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot<P> {
    /// No server answer yet, distinct from an empty list
    Loading,
    Loaded(Vec<ListItem<P>>),
}

impl<P> Snapshot<P> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Snapshot::Loaded(_))
    }

    pub fn items(&self) -> &[ListItem<P>] {
        match self {
            Snapshot::Loading => &[],
            Snapshot::Loaded(items) => items,
        }
    }
}

/// A row ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedItem<P> {
    #[serde(flatten)]
    pub item: ListItem<P>,
    /// Not yet confirmed; callers should disable interaction with the row
    pub is_pending: bool,
}

/// Overlay pending mutations on a snapshot.
///
/// Deleted ids are hidden, toggled ids show their optimistic flag, pending
/// creates are appended, and the result is sorted for display.
pub fn merge<P: ListPayload>(
    snapshot: &Snapshot<P>,
    pending: &PendingMutations<P>,
) -> Vec<RenderedItem<P>> {
    let mut rows: Vec<RenderedItem<P>> = snapshot
        .items()
        .iter()
        .filter(|item| !pending.deletes.contains(&item.id))
        .map(|item| {
            let mut item = item.clone();
            let toggled = pending.toggles.get(&item.id).copied();
            if let Some(completed) = toggled {
                item.completed = completed;
            }
            RenderedItem {
                item,
                is_pending: toggled.is_some(),
            }
        })
        .collect();

    rows.extend(pending.creates.values().map(|create| RenderedItem {
        item: ListItem::new(create.temp_id.clone(), create.payload.clone(), create.created_at),
        is_pending: true,
    }));

    rows.sort_by(|a, b| display_order(&a.item, &b.item));
    rows
}

struct ListState<P> {
    snapshot: Snapshot<P>,
    pending: PendingMutations<P>,
}

/// A list whose mutations show up immediately and settle against the backend.
///
/// State is only touched between awaits, so the lock is never held while a
/// backend call is in flight. Mutations of different items are independent;
/// two quick toggles of the same item race and the last settlement clears
/// the pending flag.
pub struct OptimisticList<P, B, S = NextSnapshotWins> {
    backend: B,
    policy: S,
    state: Mutex<ListState<P>>,
}

impl<P, B> OptimisticList<P, B, NextSnapshotWins>
where
    P: ListPayload + Send + 'static,
    B: ListMutations<P>,
{
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, NextSnapshotWins)
    }
}

impl<P, B, S> OptimisticList<P, B, S>
where
    P: ListPayload + Send + 'static,
    B: ListMutations<P>,
    S: SettlementPolicy<P>,
{
    pub fn with_policy(backend: B, policy: S) -> Self {
        Self {
            backend,
            policy,
            state: Mutex::new(ListState {
                snapshot: Snapshot::Loading,
                pending: PendingMutations::default(),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the confirmed server state
    pub fn set_snapshot(&self, items: Vec<ListItem<P>>) {
        let mut state = self.state.lock();
        self.policy.snapshot_received(&mut state.pending, &items);
        state.snapshot = Snapshot::Loaded(items);
    }

    pub fn mark_loading(&self) {
        self.state.lock().snapshot = Snapshot::Loading;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().snapshot.is_loaded()
    }

    /// Show `payload` at once under a temporary id, then create it for real.
    ///
    /// The placeholder goes away when the call settles. On success the next
    /// snapshot carries the real item; a failed create is only reported
    /// through the returned error and is not retried.
    pub async fn create(&self, payload: P) -> MutationResult<String> {
        let temp_id = format!("temp-{}", Uuid::new_v4());
        {
            let mut state = self.state.lock();
            state.pending.creates.insert(
                temp_id.clone(),
                PendingCreate {
                    temp_id: temp_id.clone(),
                    payload: payload.clone(),
                    created_at: now(),
                },
            );
        }

        let outcome = self.backend.create(payload).await;

        let mut state = self.state.lock();
        self.policy
            .create_settled(&mut state.pending, &temp_id, outcome.as_deref());
        match &outcome {
            Ok(id) => debug!("Created {} (was {})", id, temp_id),
            Err(e) => warn!("Create failed, dropping {}: {}", temp_id, e),
        }
        outcome
    }

    /// Flip `id` at once, then persist `!current_completed`
    pub async fn toggle(&self, id: &str, current_completed: bool) -> MutationResult<()> {
        let target = !current_completed;
        self.state
            .lock()
            .pending
            .toggles
            .insert(id.to_string(), target);

        let outcome = self.backend.set_completed(id, target).await;

        let mut state = self.state.lock();
        self.policy
            .toggle_settled(&mut state.pending, id, outcome.as_ref().map(|_| ()));
        if let Err(e) = &outcome {
            warn!("Toggle of {} failed: {}", id, e);
        }
        outcome
    }

    /// Hide `id` at once, then delete it; it reappears if the delete fails
    pub async fn remove(&self, id: &str) -> MutationResult<()> {
        self.state.lock().pending.deletes.insert(id.to_string());

        let outcome = self.backend.delete(id).await;

        let mut state = self.state.lock();
        self.policy
            .delete_settled(&mut state.pending, id, outcome.as_ref().map(|_| ()));
        if let Err(e) = &outcome {
            warn!("Delete of {} failed, restoring: {}", id, e);
        }
        outcome
    }

    /// Current display list
    pub fn render(&self) -> Vec<RenderedItem<P>> {
        let state = self.state.lock();
        merge(&state.snapshot, &state.pending)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.state.lock().pending.contains(id)
    }

    pub fn has_pending(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    pub fn incomplete_count(&self) -> usize {
        self.render().iter().filter(|r| !r.item.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.render().iter().filter(|r| r.item.completed).count()
    }
}
