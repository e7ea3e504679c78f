//! Pending mutation bookkeeping and settlement policy

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

use homeboard_core::ListItem;

use crate::MutationError;

/// A create that has not been confirmed yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCreate<P> {
    pub temp_id: String,
    pub payload: P,
    pub created_at: DateTime<Utc>,
}

/// The three in-flight mutation sets
#[derive(Debug, Clone)]
pub struct PendingMutations<P> {
    /// Keyed by temporary id
    pub creates: BTreeMap<String, PendingCreate<P>>,
    /// Item id to optimistic completed flag
    pub toggles: HashMap<String, bool>,
    /// Item ids hidden from view
    pub deletes: HashSet<String>,
}

impl<P> Default for PendingMutations<P> {
    fn default() -> Self {
        Self {
            creates: BTreeMap::new(),
            toggles: HashMap::new(),
            deletes: HashSet::new(),
        }
    }
}

impl<P> PendingMutations<P> {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.toggles.is_empty() && self.deletes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.creates.contains_key(id) || self.toggles.contains_key(id) || self.deletes.contains(id)
    }
}

/// Decides what happens to pending entries once their round-trip settles.
///
/// Rendering only reads `PendingMutations`, so a stricter strategy (for
/// example acknowledging against snapshot sequence numbers) can replace
/// the default without touching the merge.
pub trait SettlementPolicy<P>: Send + Sync {
    fn create_settled(
        &self,
        pending: &mut PendingMutations<P>,
        temp_id: &str,
        outcome: Result<&str, &MutationError>,
    );

    fn toggle_settled(
        &self,
        pending: &mut PendingMutations<P>,
        item_id: &str,
        outcome: Result<(), &MutationError>,
    );

    fn delete_settled(
        &self,
        pending: &mut PendingMutations<P>,
        item_id: &str,
        outcome: Result<(), &MutationError>,
    );

    /// A new snapshot replaced the old one. Delete markers for ids the
    /// server no longer reports have done their job and are dropped.
    fn snapshot_received(&self, pending: &mut PendingMutations<P>, items: &[ListItem<P>]) {
        if pending.deletes.is_empty() {
            return;
        }
        let present: HashSet<&str> = items.iter().map(|item| item.id.as_str()).collect();
        pending.deletes.retain(|id| present.contains(id.as_str()));
    }
}

/// Drop pending state as soon as a call settles and let the next server
/// snapshot show the truth.
///
/// - creates are discarded either way (a failed create is not retried)
/// - toggles are discarded either way (a failed toggle flickers back)
/// - deletes stay hidden on success and are un-hidden on failure
#[derive(Debug, Clone, Copy, Default)]
pub struct NextSnapshotWins;

impl<P> SettlementPolicy<P> for NextSnapshotWins {
    fn create_settled(
        &self,
        pending: &mut PendingMutations<P>,
        temp_id: &str,
        _outcome: Result<&str, &MutationError>,
    ) {
        pending.creates.remove(temp_id);
    }

    fn toggle_settled(
        &self,
        pending: &mut PendingMutations<P>,
        item_id: &str,
        _outcome: Result<(), &MutationError>,
    ) {
        pending.toggles.remove(item_id);
    }

    fn delete_settled(
        &self,
        pending: &mut PendingMutations<P>,
        item_id: &str,
        outcome: Result<(), &MutationError>,
    ) {
        if outcome.is_err() {
            pending.deletes.remove(item_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_everything() -> PendingMutations<&'static str> {
        let mut pending = PendingMutations::default();
        pending.creates.insert(
            "temp-1".to_string(),
            PendingCreate {
                temp_id: "temp-1".to_string(),
                payload: "bread",
                created_at: Utc::now(),
            },
        );
        pending.toggles.insert("a".to_string(), true);
        pending.deletes.insert("b".to_string());
        pending
    }

    #[test]
    fn test_next_snapshot_wins_discards_creates_and_toggles() {
        let policy = NextSnapshotWins;
        let mut pending = with_everything();
        let err = MutationError::Transport("offline".into());

        policy.create_settled(&mut pending, "temp-1", Err(&err));
        policy.toggle_settled(&mut pending, "a", Ok(()));

        assert!(pending.creates.is_empty());
        assert!(pending.toggles.is_empty());
        assert!(pending.contains("b"));
    }

    #[test]
    fn test_delete_marker_kept_on_success_reverted_on_failure() {
        let policy = NextSnapshotWins;
        let mut pending = with_everything();

        policy.delete_settled(&mut pending, "b", Ok(()));
        assert!(pending.deletes.contains("b"));

        let err = MutationError::Rejected("nope".into());
        policy.delete_settled(&mut pending, "b", Err(&err));
        assert!(!pending.deletes.contains("b"));
    }

    #[test]
    fn test_snapshot_drops_markers_of_vanished_items() {
        let policy = NextSnapshotWins;
        let mut pending = with_everything();
        pending.deletes.insert("c".to_string());

        let items = vec![ListItem::new("c", "soap", Utc::now())];
        policy.snapshot_received(&mut pending, &items);

        assert!(!pending.deletes.contains("b"));
        assert!(pending.deletes.contains("c"));
        // creates and toggles are untouched
        assert_eq!(pending.creates.len(), 1);
        assert_eq!(pending.toggles.len(), 1);
    }
}
