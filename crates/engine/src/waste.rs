//! Waste identification, return planning and undocking.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use stowage_core::{
    Container, EngineConfig, Error, Item, ItemFilter, ItemStore, LogEntry, LogKind, LogSink,
    Result,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Actor recorded for automatic removals.
pub const SYSTEM_ACTOR: &str = "system";

/// Expiry state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExpiryStatus {
    /// Expiry is at or before the reference instant.
    Expired,
    /// Expiry is within the configured window.
    ExpiringSoon,
}

/// Usage state of an item with a usage limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UsageStatus {
    /// Usage count has reached the limit.
    Depleted,
    /// Usage count is at or above the configured share of the limit.
    DepletingSoon,
}

/// Why an item counts as waste. At least one status is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WasteClassification {
    /// Expiry state, if relevant.
    pub expiry: Option<ExpiryStatus>,
    /// Usage state, if relevant.
    pub usage: Option<UsageStatus>,
}

impl WasteClassification {
    /// Returns true if the item is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expiry == Some(ExpiryStatus::Expired)
    }

    /// Returns true if the item has no uses left.
    pub fn is_depleted(&self) -> bool {
        self.usage == Some(UsageStatus::Depleted)
    }
}

/// Classifies an item at `as_of`. Returns `None` if it is not waste.
pub fn classify(
    item: &Item,
    as_of: DateTime<Utc>,
    config: &EngineConfig,
) -> Option<WasteClassification> {
    let expiry = item.expiry_date().and_then(|expiry| {
        if expiry <= as_of {
            Some(ExpiryStatus::Expired)
        } else if (expiry - as_of).num_days() <= config.expiring_soon_days {
            Some(ExpiryStatus::ExpiringSoon)
        } else {
            None
        }
    });

    let usage = item.usage_limit().and_then(|limit| {
        let count = item.usage_count();
        if count >= limit {
            Some(UsageStatus::Depleted)
        } else if limit > 0 && f64::from(count) >= f64::from(limit) * config.depleting_ratio {
            Some(UsageStatus::DepletingSoon)
        } else {
            None
        }
    });

    (expiry.is_some() || usage.is_some()).then_some(WasteClassification { expiry, usage })
}

/// An item flagged as waste.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WasteItem {
    /// The item as stored.
    pub item: Item,
    /// Why it was flagged.
    pub classification: WasteClassification,
}

/// Flags every waste item, once per identifier, in input order.
pub fn identify_waste(items: &[Item], as_of: DateTime<Utc>, config: &EngineConfig) -> Vec<WasteItem> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| {
            classify(item, as_of, config).map(|classification| (item, classification))
        })
        .filter(|(item, _)| seen.insert(item.id().to_string()))
        .map(|(item, classification)| WasteItem {
            item: item.clone(),
            classification,
        })
        .collect()
}

/// Item reference listed in a return step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ItemSummary {
    /// Item identifier.
    pub item_id: String,
    /// Item name.
    pub name: String,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            item_id: item.id().to_string(),
            name: item.name().to_string(),
        }
    }
}

/// One instruction in a return plan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReturnStep {
    /// 1-based, contiguous.
    pub step: usize,
    /// Human-readable instruction.
    pub description: String,
    /// Items handled in this step.
    pub items: Vec<ItemSummary>,
}

/// Ordered plan for moving waste to an undocking container.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ReturnPlan {
    /// Destination container.
    #[cfg_attr(feature = "serde", serde(rename = "containerForUndocking"))]
    pub undocking_container_id: String,
    /// Mass budget supplied by the caller. Reported, not enforced.
    pub max_weight: f64,
    /// Number of items in the plan.
    pub total_items: usize,
    /// Summed mass, missing masses counted as zero.
    pub total_mass: f64,
    /// Items in return order.
    pub items: Vec<Item>,
    /// Step-by-step instructions.
    #[cfg_attr(feature = "serde", serde(rename = "retrievalInstructions"))]
    pub instructions: Vec<ReturnStep>,
}

impl ReturnPlan {
    /// Returns true if the plan's total mass is over the budget.
    pub fn exceeds_max_weight(&self) -> bool {
        self.total_mass > self.max_weight
    }
}

/// Orders `items` for return and generates the instruction sequence.
///
/// Expired items come first, then depleted ones, then heavier before lighter. The
/// sort is stable.
pub fn build_return_plan(
    items: Vec<Item>,
    max_weight: f64,
    undocking: &Container,
    as_of: DateTime<Utc>,
    config: &EngineConfig,
) -> ReturnPlan {
    let mut keyed: Vec<(bool, bool, f64, Item)> = items
        .into_iter()
        .map(|item| {
            let status = classify(&item, as_of, config);
            let expired = status.is_some_and(|s| s.is_expired());
            let depleted = status.is_some_and(|s| s.is_depleted());
            (!expired, !depleted, item.mass().unwrap_or(0.0), item)
        })
        .collect();
    keyed.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(b.2.total_cmp(&a.2))
    });
    let items: Vec<Item> = keyed.into_iter().map(|(_, _, _, item)| item).collect();

    ReturnPlan {
        undocking_container_id: undocking.id().to_string(),
        max_weight,
        total_items: items.len(),
        total_mass: items.iter().filter_map(Item::mass).sum(),
        instructions: return_instructions(&items),
        items,
    }
}

fn return_instructions(items: &[Item]) -> Vec<ReturnStep> {
    let mut groups: Vec<(&str, Vec<ItemSummary>)> = Vec::new();
    for item in items.iter().filter(|item| !item.container_id().is_empty()) {
        match groups.iter_mut().find(|(id, _)| *id == item.container_id()) {
            Some((_, members)) => members.push(item.into()),
            None => groups.push((item.container_id(), vec![item.into()])),
        }
    }

    let mut steps = Vec::with_capacity(groups.len() * 2 + 1);
    for (container_id, members) in groups {
        steps.push(ReturnStep {
            step: steps.len() + 1,
            description: format!("Go to container {}", container_id),
            items: Vec::new(),
        });
        steps.push(ReturnStep {
            step: steps.len() + 1,
            description: format!(
                "Retrieve {} items from container {}",
                members.len(),
                container_id
            ),
            items: members,
        });
    }
    steps.push(ReturnStep {
        step: steps.len() + 1,
        description: "Move all items to undocking container".to_string(),
        items: Vec::new(),
    });
    steps
}

/// Resolves `item_ids` through the store and builds a return plan.
///
/// Fails with `NotFound` if the undocking container does not exist. Identifiers
/// that do not resolve are skipped.
pub fn plan_return<S: ItemStore + ?Sized>(
    store: &S,
    item_ids: &[String],
    max_weight: f64,
    undocking_container_id: &str,
    as_of: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<ReturnPlan> {
    let undocking = store.require_container(undocking_container_id)?;

    let mut items = Vec::with_capacity(item_ids.len());
    for id in item_ids {
        match store.get_item(id)? {
            Some(item) => items.push(item),
            None => debug!("Skipping unknown item '{}' in return plan", id),
        }
    }

    Ok(build_return_plan(items, max_weight, &undocking, as_of, config))
}

/// An item that could not be removed during undocking.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UndockingFailure {
    /// Item identifier.
    pub item_id: String,
    /// Store error text.
    pub error: String,
}

/// Outcome of [`complete_undocking`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UndockingReport {
    /// Container that was undocked.
    pub container_id: String,
    /// Items deleted from the store.
    pub items_removed: usize,
    /// Items that could not be deleted.
    pub failures: Vec<UndockingFailure>,
}

impl UndockingReport {
    /// Returns true if every item was removed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deletes every item in `container_id`, logging one removal entry per item.
///
/// Each deletion is independent; a failed deletion is reported and the rest
/// continue.
pub fn complete_undocking<S, L>(
    store: &mut S,
    log: &mut L,
    container_id: &str,
    at: DateTime<Utc>,
) -> Result<UndockingReport>
where
    S: ItemStore + ?Sized,
    L: LogSink + ?Sized,
{
    store.require_container(container_id)?;
    let items = store.get_items(&ItemFilter::all().in_container(container_id))?;

    let mut report = UndockingReport {
        container_id: container_id.to_string(),
        items_removed: 0,
        failures: Vec::new(),
    };

    for item in items {
        match store.delete_item(item.id()) {
            Ok(removed) => {
                report.items_removed += 1;
                log.append(
                    LogEntry::new(
                        LogKind::Removed,
                        removed.id(),
                        SYSTEM_ACTOR,
                        at,
                        container_id,
                        format!("Removed {} during undocking", removed.name()),
                    )
                    .with_description("Item was undocked with container"),
                );
            }
            Err(err) => {
                warn!("Failed to remove '{}' during undocking: {}", item.id(), err);
                report.failures.push(UndockingFailure {
                    item_id: item.id().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        "Undocked container '{}' with {} items",
        container_id, report.items_removed
    );
    Ok(report)
}

/// A waste return booked for a later date.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ScheduledReturn {
    /// Identifier assigned by [`ReturnSchedule::schedule`].
    pub id: u64,
    /// Items to return. Not checked against the store when booked.
    pub item_ids: Vec<String>,
    /// When the return should happen.
    pub scheduled_for: DateTime<Utc>,
    /// Free-form notes; empty if none.
    pub notes: String,
    /// When the booking was made.
    pub created_at: DateTime<Utc>,
}

/// Stored item details for a scheduled return.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ScheduledItem {
    /// Item identifier.
    pub item_id: String,
    /// Item name.
    pub name: String,
    /// Mass, 0 when unknown.
    pub mass: f64,
}

/// A scheduled return with its items looked up.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ScheduledReturnDetails {
    /// The booking.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub schedule: ScheduledReturn,
    /// Booked items still in the store, in booking order.
    pub items: Vec<ScheduledItem>,
}

/// Booked waste returns.
#[derive(Debug, Clone, Default)]
pub struct ReturnSchedule {
    next_id: u64,
    returns: Vec<ScheduledReturn>,
}

impl ReturnSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bookings.
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Returns true if nothing is booked.
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Books a return and returns its identifier.
    ///
    /// Fails with `StateConflict` if no items are given.
    pub fn schedule<I, T>(
        &mut self,
        item_ids: I,
        scheduled_for: DateTime<Utc>,
        notes: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let item_ids: Vec<String> = item_ids.into_iter().map(Into::into).collect();
        if item_ids.is_empty() {
            return Err(Error::StateConflict(
                "a waste return needs at least one item".to_string(),
            ));
        }

        self.next_id += 1;
        let id = self.next_id;
        debug!("Scheduled return {} of {} items for {}", id, item_ids.len(), scheduled_for);
        self.returns.push(ScheduledReturn {
            id,
            item_ids,
            scheduled_for,
            notes: notes.into(),
            created_at,
        });
        Ok(id)
    }

    /// Bookings ordered by scheduled date. Equal dates keep booking order.
    pub fn upcoming(&self) -> Vec<&ScheduledReturn> {
        let mut returns: Vec<&ScheduledReturn> = self.returns.iter().collect();
        returns.sort_by_key(|r| r.scheduled_for);
        returns
    }

    /// Bookings in date order with their items looked up in `store`.
    ///
    /// Ids that no longer resolve are left out of `items`.
    pub fn details<S: ItemStore + ?Sized>(&self, store: &S) -> Result<Vec<ScheduledReturnDetails>> {
        self.upcoming()
            .into_iter()
            .map(|schedule| {
                let mut items = Vec::with_capacity(schedule.item_ids.len());
                for id in &schedule.item_ids {
                    if let Some(item) = store.get_item(id)? {
                        items.push(ScheduledItem {
                            item_id: item.id().to_string(),
                            name: item.name().to_string(),
                            mass: item.mass().unwrap_or(0.0),
                        });
                    }
                }
                Ok(ScheduledReturnDetails {
                    schedule: schedule.clone(),
                    items,
                })
            })
            .collect()
    }
}
