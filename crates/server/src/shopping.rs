//! In-memory shopping list store

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use homeboard_core::{
    display_order, CoreError, CoreResult, ListItem, ShoppingItem, ShoppingItemDraft,
    ShoppingItemPatch,
};
use homeboard_optimistic::{ListMutations, MutationError, MutationResult};

#[derive(Debug, Default)]
pub struct ShoppingListStore {
    items: DashMap<String, ShoppingItem>,
}

impl ShoppingListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items in display order
    pub fn list(&self) -> Vec<ShoppingItem> {
        let mut items: Vec<ShoppingItem> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by(|a, b| display_order(&a.to_list_item(), &b.to_list_item()));
        items
    }

    /// Current state as generic list items
    pub fn snapshot(&self) -> Vec<ListItem<ShoppingItemDraft>> {
        self.items.iter().map(|e| e.value().to_list_item()).collect()
    }

    pub fn get(&self, id: &str) -> Option<ShoppingItem> {
        self.items.get(id).map(|e| e.value().clone())
    }

    pub fn add(&self, draft: ShoppingItemDraft) -> CoreResult<ShoppingItem> {
        draft.validate()?;
        let item = ShoppingItem::new(Uuid::new_v4().to_string(), draft, Utc::now());
        debug!("Adding shopping item {} ({})", item.id, item.draft.item);
        self.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    pub fn update(&self, id: &str, patch: &ShoppingItemPatch) -> CoreResult<ShoppingItem> {
        let mut entry = self
            .items
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        // apply to a copy so a rejected patch leaves the item untouched
        let mut updated = entry.value().clone();
        patch.apply(&mut updated, Utc::now())?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    pub fn toggle(&self, id: &str, completed: bool) -> CoreResult<ShoppingItem> {
        self.update(id, &ShoppingItemPatch::completed(completed))
    }

    pub fn remove(&self, id: &str) -> CoreResult<ShoppingItem> {
        self.items
            .remove(id)
            .map(|(_, item)| item)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Remove completed items, returning how many were removed
    pub fn clear_completed(&self) -> usize {
        let before = self.items.len();
        self.items.retain(|_, item| !item.completed);
        before - self.items.len()
    }

    pub fn clear_all(&self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    pub fn incomplete_count(&self) -> usize {
        self.items.iter().filter(|e| !e.value().completed).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn to_mutation_error(err: CoreError) -> MutationError {
    match err {
        CoreError::NotFound(id) => MutationError::NotFound(id),
        other => MutationError::Rejected(other.to_string()),
    }
}

#[async_trait]
impl ListMutations<ShoppingItemDraft> for ShoppingListStore {
    async fn create(&self, payload: ShoppingItemDraft) -> MutationResult<String> {
        self.add(payload).map(|item| item.id).map_err(to_mutation_error)
    }

    async fn set_completed(&self, id: &str, completed: bool) -> MutationResult<()> {
        self.toggle(id, completed)
            .map(|_| ())
            .map_err(to_mutation_error)
    }

    async fn delete(&self, id: &str) -> MutationResult<()> {
        self.remove(id).map(|_| ()).map_err(to_mutation_error)
    }
}
