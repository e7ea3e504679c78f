//! Shopping list model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, ListItem, ListPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingCategory {
    Groceries,
    Household,
    Personal,
    #[default]
    Other,
}

impl ShoppingCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ShoppingCategory::Groceries => "Groceries",
            ShoppingCategory::Household => "Household",
            ShoppingCategory::Personal => "Personal",
            ShoppingCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingPriority {
    Urgent,
    #[default]
    Normal,
    Low,
}

impl ShoppingPriority {
    /// Sort rank, urgent first
    pub fn rank(&self) -> u8 {
        match self {
            ShoppingPriority::Urgent => 0,
            ShoppingPriority::Normal => 1,
            ShoppingPriority::Low => 2,
        }
    }
}

/// User-submitted fields of a shopping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItemDraft {
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default)]
    pub category: ShoppingCategory,
    #[serde(default)]
    pub priority: ShoppingPriority,
}

impl ShoppingItemDraft {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            quantity: None,
            category: ShoppingCategory::default(),
            priority: ShoppingPriority::default(),
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    pub fn with_category(mut self, category: ShoppingCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: ShoppingPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.item.trim().is_empty() {
            return Err(CoreError::InvalidValue {
                field: "item",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl ListPayload for ShoppingItemDraft {
    fn display_rank(&self) -> u8 {
        self.priority.rank()
    }
}

/// A stored shopping entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    #[serde(flatten)]
    pub draft: ShoppingItemDraft,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ShoppingItem {
    pub fn new(id: impl Into<String>, draft: ShoppingItemDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            draft,
            completed: false,
            created_at,
            completed_at: None,
        }
    }

    pub fn to_list_item(&self) -> ListItem<ShoppingItemDraft> {
        ListItem {
            id: self.id.clone(),
            payload: self.draft.clone(),
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

/// Partial update of a shopping entry. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItemPatch {
    #[serde(default)]
    pub item: Option<String>,
    /// `Some(None)` clears the quantity
    #[serde(default, with = "double_option")]
    pub quantity: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<ShoppingCategory>,
    #[serde(default)]
    pub priority: Option<ShoppingPriority>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl ShoppingItemPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply present fields. Completing stamps `completed_at`, un-completing clears it.
    pub fn apply(&self, target: &mut ShoppingItem, now: DateTime<Utc>) -> CoreResult<()> {
        if let Some(item) = &self.item {
            if item.trim().is_empty() {
                return Err(CoreError::InvalidValue {
                    field: "item",
                    reason: "must not be empty".to_string(),
                });
            }
            target.draft.item = item.clone();
        }
        if let Some(quantity) = &self.quantity {
            target.draft.quantity = quantity.clone();
        }
        if let Some(category) = self.category {
            target.draft.category = category;
        }
        if let Some(priority) = self.priority {
            target.draft.priority = priority;
        }
        if let Some(completed) = self.completed {
            target.completed = completed;
            target.completed_at = completed.then_some(now);
        }
        Ok(())
    }
}

/// Serde helper distinguishing an absent field from an explicit `null`
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
