//! Generic list items and their display ordering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Payload carried by a list item
pub trait ListPayload: Clone {
    /// Secondary sort key between the completed flag and creation time.
    /// Lower ranks sort first; payloads without a notion of priority keep
    /// the default so only completion and age matter.
    fn display_rank(&self) -> u8 {
        0
    }
}

/// A server-owned list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem<P> {
    pub id: String,
    #[serde(flatten)]
    pub payload: P,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl<P> ListItem<P> {
    pub fn new(id: impl Into<String>, payload: P, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            payload,
            completed: false,
            created_at,
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

/// Display order: incomplete before complete, then payload rank, then
/// newest first. Ties fall back to id so the order is total.
pub fn display_order<P: ListPayload>(a: &ListItem<P>, b: &ListItem<P>) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| a.payload.display_rank().cmp(&b.payload.display_rank()))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort items in place for display
pub fn sort_for_display<P: ListPayload>(items: &mut [ListItem<P>]) {
    items.sort_by(display_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Note(&'static str);

    impl ListPayload for Note {}

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_incomplete_first_then_newest() {
        let mut items = vec![
            ListItem::new("a", Note("old"), at(100)),
            ListItem::new("b", Note("done"), at(300)).with_completed(true),
            ListItem::new("c", Note("new"), at(200)),
        ];

        sort_for_display(&mut items);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_ties_break_on_id() {
        let mut items = vec![
            ListItem::new("y", Note("same"), at(100)),
            ListItem::new("x", Note("same"), at(100)),
        ];
        sort_for_display(&mut items);
        assert_eq!(items[0].id, "x");
    }
}
