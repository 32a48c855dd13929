//! Item/container store abstraction.
//!
//! The engine never holds persistent state of its own; every read and write of
//! items and containers goes through an [`ItemStore`].

use crate::model::{Container, Item};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Predicate over items. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Only items owned by this container.
    pub container_id: Option<String>,
    /// Only items with (`true`) or without (`false`) a position.
    pub has_position: Option<bool>,
    /// Skip the item with this identifier.
    pub exclude_id: Option<String>,
    /// Only items whose name contains this text, ignoring case.
    pub name_contains: Option<String>,
}

impl ItemFilter {
    /// A filter matching every item.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to one container.
    pub fn in_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Restricts to placed items.
    pub fn placed(mut self) -> Self {
        self.has_position = Some(true);
        self
    }

    /// Excludes one item.
    pub fn excluding(mut self, item_id: impl Into<String>) -> Self {
        self.exclude_id = Some(item_id.into());
        self
    }

    /// Restricts to items whose name contains `text`, ignoring case.
    pub fn name_contains(mut self, text: impl Into<String>) -> Self {
        self.name_contains = Some(text.into());
        self
    }

    /// Evaluates the filter against one item.
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(container_id) = &self.container_id {
            if item.container_id() != container_id {
                return false;
            }
        }
        if let Some(has_position) = self.has_position {
            if item.is_placed() != has_position {
                return false;
            }
        }
        if let Some(exclude_id) = &self.exclude_id {
            if item.id() == exclude_id {
                return false;
            }
        }
        if let Some(text) = &self.name_contains {
            if !item.name().to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Persistence boundary for containers and items.
pub trait ItemStore {
    /// Looks up a container.
    fn get_container(&self, id: &str) -> Result<Option<Container>>;

    /// Lists every container.
    fn containers(&self) -> Result<Vec<Container>>;

    /// Looks up an item.
    fn get_item(&self, id: &str) -> Result<Option<Item>>;

    /// Lists items matching the filter.
    fn get_items(&self, filter: &ItemFilter) -> Result<Vec<Item>>;

    /// Inserts or replaces an item. Returns false if the stored item was already identical.
    fn upsert_item(&mut self, item: Item) -> Result<bool>;

    /// Removes an item, returning it.
    fn delete_item(&mut self, id: &str) -> Result<Item>;

    /// Inserts or replaces a container.
    fn upsert_container(&mut self, container: Container) -> Result<()>;

    /// Looks up a container, failing with `NotFound` if it is absent.
    fn require_container(&self, id: &str) -> Result<Container> {
        self.get_container(id)?
            .ok_or_else(|| Error::container_not_found(id))
    }

    /// Looks up an item, failing with `NotFound` if it is absent.
    fn require_item(&self, id: &str) -> Result<Item> {
        self.get_item(id)?.ok_or_else(|| Error::item_not_found(id))
    }
}

/// In-memory store ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    containers: BTreeMap<String, Container>,
    items: BTreeMap<String, Item>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of stored containers.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }
}

impl ItemStore for MemoryStore {
    fn get_container(&self, id: &str) -> Result<Option<Container>> {
        Ok(self.containers.get(id).cloned())
    }

    fn containers(&self) -> Result<Vec<Container>> {
        Ok(self.containers.values().cloned().collect())
    }

    fn get_item(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items.get(id).cloned())
    }

    fn get_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        Ok(self
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    fn upsert_item(&mut self, item: Item) -> Result<bool> {
        if self.items.get(item.id()) == Some(&item) {
            return Ok(false);
        }
        self.items.insert(item.id().to_string(), item);
        Ok(true)
    }

    fn delete_item(&mut self, id: &str) -> Result<Item> {
        self.items
            .remove(id)
            .ok_or_else(|| Error::item_not_found(id))
    }

    fn upsert_container(&mut self, container: Container) -> Result<()> {
        self.containers
            .insert(container.id().to_string(), container);
        Ok(())
    }
}
