//! Containers and the items stowed in them.

use crate::geometry::{coords, Coordinates, Position};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A fixed-size storage container. Its interior spans from the origin to its extent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Container {
    /// Unique identifier.
    #[cfg_attr(feature = "serde", serde(rename = "containerId"))]
    id: String,

    /// Zone label (e.g. "Crew Quarters").
    zone: String,

    /// Extent (width, depth, height).
    dimensions: Coordinates,
}

impl Container {
    /// Creates a container with the given extent.
    pub fn new(
        id: impl Into<String>,
        zone: impl Into<String>,
        width: i32,
        depth: i32,
        height: i32,
    ) -> Self {
        Self {
            id: id.into(),
            zone: zone.into(),
            dimensions: coords(width, depth, height),
        }
    }

    /// Returns the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the zone label.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Returns the extent (width, depth, height).
    pub fn dimensions(&self) -> &Coordinates {
        &self.dimensions
    }

    /// Returns the width.
    pub fn width(&self) -> i32 {
        self.dimensions.x
    }

    /// Returns the depth.
    pub fn depth(&self) -> i32 {
        self.dimensions.y
    }

    /// Returns the height.
    pub fn height(&self) -> i32 {
        self.dimensions.z
    }

    /// The box every placed item must lie within.
    pub fn bounds(&self) -> Position {
        Position::container_box(self.dimensions)
    }

    /// Interior volume.
    pub fn volume(&self) -> i64 {
        self.bounds().volume()
    }

    /// Checks that the container is usable.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidContainer("Container ID must not be empty".into()));
        }
        if self.dimensions.iter().any(|&d| d <= 0) {
            return Err(Error::InvalidContainer(format!(
                "All dimensions for '{}' must be positive",
                self.id
            )));
        }
        Ok(())
    }
}

/// An item that can be stowed in a container.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Item {
    /// Unique identifier.
    #[cfg_attr(feature = "serde", serde(rename = "itemId"))]
    id: String,

    /// Human-readable name.
    name: String,

    /// Container currently holding the item.
    container_id: String,

    /// Size (width, depth, height). Items are never rotated.
    dimensions: Coordinates,

    /// Point in time after which the item is expired.
    expiry_date: Option<DateTime<Utc>>,

    /// Number of uses before the item is depleted.
    usage_limit: Option<u32>,

    /// Uses recorded so far.
    #[cfg_attr(feature = "serde", serde(default))]
    usage_count: u32,

    /// Mass in kilograms.
    mass: Option<f64>,

    /// Zone the item should preferably be stowed in.
    preferred_zone: Option<String>,

    /// Base placement priority; higher is more urgent.
    #[cfg_attr(feature = "serde", serde(default = "default_priority"))]
    priority: i32,

    /// Where the item sits inside its container, if placed.
    position: Option<Position>,
}

#[cfg(feature = "serde")]
fn default_priority() -> i32 {
    1
}

impl Item {
    /// Creates an unplaced item with default priority and no expiry or usage limit.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        container_id: impl Into<String>,
        width: i32,
        depth: i32,
        height: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            container_id: container_id.into(),
            dimensions: coords(width, depth, height),
            expiry_date: None,
            usage_limit: None,
            usage_count: 0,
            mass: None,
            preferred_zone: None,
            priority: 1,
            position: None,
        }
    }

    /// Sets the expiry date.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    /// Sets the usage limit.
    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Sets the recorded usage count.
    pub fn with_usage_count(mut self, count: u32) -> Self {
        self.usage_count = count;
        self
    }

    /// Sets the mass.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Sets the preferred zone.
    pub fn with_preferred_zone(mut self, zone: impl Into<String>) -> Self {
        self.preferred_zone = Some(zone.into());
        self
    }

    /// Sets the base priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Places the item at the given position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Places the item with its minimum corner at `origin`.
    pub fn placed_at(self, width: i32, depth: i32, height: i32) -> Self {
        let position = Position::from_origin(coords(width, depth, height), self.dimensions);
        self.with_position(position)
    }

    /// Returns the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning container's identifier.
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Returns the size (width, depth, height).
    pub fn dimensions(&self) -> &Coordinates {
        &self.dimensions
    }

    /// Returns the width.
    pub fn width(&self) -> i32 {
        self.dimensions.x
    }

    /// Returns the depth.
    pub fn depth(&self) -> i32 {
        self.dimensions.y
    }

    /// Returns the height.
    pub fn height(&self) -> i32 {
        self.dimensions.z
    }

    /// Returns the expiry date.
    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
    }

    /// Returns the usage limit.
    pub fn usage_limit(&self) -> Option<u32> {
        self.usage_limit
    }

    /// Returns the recorded usage count.
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// Returns the mass.
    pub fn mass(&self) -> Option<f64> {
        self.mass
    }

    /// Returns the preferred zone.
    pub fn preferred_zone(&self) -> Option<&str> {
        self.preferred_zone.as_deref()
    }

    /// Returns the base priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the current position.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns true if the item has been assigned a position.
    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    /// Uses left before depletion, if the item has a limit.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.usage_limit
            .map(|limit| limit.saturating_sub(self.usage_count))
    }

    /// Returns true if every dimension fits inside the container's extent.
    pub fn fits_within(&self, container: &Container) -> bool {
        self.dimensions
            .iter()
            .zip(container.dimensions().iter())
            .all(|(item, bound)| item <= bound)
    }

    /// Replaces the position.
    pub fn set_position(&mut self, position: Option<Position>) {
        self.position = position;
    }

    /// Moves the item to another container.
    pub fn set_container_id(&mut self, container_id: impl Into<String>) {
        self.container_id = container_id.into();
    }

    /// Overwrites the recorded usage count.
    pub fn set_usage_count(&mut self, count: u32) {
        self.usage_count = count;
    }

    /// Checks that dimensions and mass are usable.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.iter().any(|&d| d <= 0) {
            return Err(Error::InvalidGeometry(format!(
                "All dimensions for '{}' must be positive",
                self.id
            )));
        }

        if let Some(mass) = self.mass {
            if mass < 0.0 {
                return Err(Error::InvalidGeometry(format!(
                    "Mass for '{}' cannot be negative",
                    self.id
                )));
            }
        }

        Ok(())
    }
}
