use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult};

pub const NAME_REQUIRED: &str = "Name is required";

/// A product category.
///
/// Categories form a forest through `parent_id`. Names are unique across all
/// categories (exact, case-sensitive match). Cycles are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl NewCategory {
    pub fn new(
        name: Option<String>,
        description: Option<String>,
        parent_id: Option<CategoryId>,
    ) -> DomainResult<Self> {
        let name = require_name(name)?;
        Ok(Self {
            name,
            description,
            parent_id,
        })
    }
}

/// Partial update of a category.
///
/// `None` leaves a field alone. For the nullable fields the inner option is
/// the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<CategoryId>>,
}

impl CategoryChanges {
    pub fn validate(&self) -> DomainResult<()> {
        match &self.name {
            Some(name) if name.is_empty() => Err(DomainError::validation(NAME_REQUIRED)),
            _ => Ok(()),
        }
    }

    /// The new name, if this update renames the category to something else.
    pub fn renames(&self, category: &Category) -> Option<&str> {
        self.name.as_deref().filter(|n| *n != category.name)
    }

    /// Apply the present fields and stamp `updated_at`.
    pub fn apply(self, category: &mut Category, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(description) = self.description {
            category.description = description;
        }
        if let Some(parent_id) = self.parent_id {
            category.parent_id = parent_id;
        }
        category.updated_at = now;
    }
}

fn require_name(name: Option<String>) -> DomainResult<String> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(DomainError::validation(NAME_REQUIRED)),
    }
}
