//! Simulated mission clock.
//!
//! The clock never runs on its own. Time moves only through [`Simulation::advance`],
//! which applies per-day usage and detects expiry crossings against the store.

use crate::waste::ItemSummary;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use stowage_core::{Error, ItemFilter, ItemStore, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clock state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SimulationSettings {
    /// Set by [`Simulation::start`], cleared by [`Simulation::pause`].
    pub is_running: bool,
    /// Display speed multiplier.
    pub speed: u32,
    /// Hours advanced since the last reset.
    pub elapsed_hours: i64,
    /// Whether advancing detects expiry crossings.
    pub auto_expiry: bool,
    /// Expiry crossings detected since the last reset.
    pub expired_items: u32,
    /// Simulated current instant. Never moves backwards.
    pub current_date: DateTime<Utc>,
}

impl SimulationSettings {
    /// Default settings with the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_running: false,
            speed: 1,
            elapsed_hours: 0,
            auto_expiry: true,
            expired_items: 0,
            current_date: now,
        }
    }
}

/// Partial settings update. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    /// New running flag.
    pub is_running: Option<bool>,
    /// New speed.
    pub speed: Option<u32>,
    /// New auto-expiry flag.
    pub auto_expiry: Option<bool>,
    /// New current date; must not be earlier than the current one.
    pub current_date: Option<DateTime<Utc>>,
}

/// Entry in the waste side list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WasteRecord {
    /// Item identifier.
    pub item_id: String,
    /// Item name.
    pub name: String,
    /// Always "expired" for clock-detected waste.
    pub reason: String,
    /// The expiry that was crossed.
    pub expiry_date: DateTime<Utc>,
    /// Simulated date of detection.
    pub identified_date: DateTime<Utc>,
}

/// How far to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceSpan {
    /// A number of whole days.
    Days(i64),
    /// Whole days up to a target instant.
    Until(DateTime<Utc>),
}

/// Input to [`Simulation::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceRequest {
    /// How far to advance.
    pub span: AdvanceSpan,
    /// Items used once per elapsed day.
    pub items_used: Vec<String>,
}

impl Default for AdvanceRequest {
    fn default() -> Self {
        Self::days(1)
    }
}

impl AdvanceRequest {
    /// Advances by `days` whole days.
    pub fn days(days: i64) -> Self {
        Self {
            span: AdvanceSpan::Days(days),
            items_used: Vec::new(),
        }
    }

    /// Advances by the whole days between the current date and `target`.
    pub fn until(target: DateTime<Utc>) -> Self {
        Self {
            span: AdvanceSpan::Until(target),
            items_used: Vec::new(),
        }
    }

    /// Sets the items used each day.
    pub fn with_used_items<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.items_used = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Usage applied to an item with a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UsedItem {
    /// Item identifier.
    pub item_id: String,
    /// Item name.
    pub name: String,
    /// Uses left after this advance.
    pub remaining_uses: u32,
}

/// Expiry crossed during an advance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ExpiredItem {
    /// Item identifier.
    pub item_id: String,
    /// Item name.
    pub name: String,
    /// The expiry that was crossed.
    pub expiry_date: DateTime<Utc>,
}

/// Item state changes produced by one advance.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AdvanceChanges {
    /// Limited items whose usage was applied.
    pub items_used: Vec<UsedItem>,
    /// Items whose expiry fell in the advanced window.
    pub items_expired: Vec<ExpiredItem>,
    /// Items that reached their usage limit in this advance.
    pub items_depleted_today: Vec<ItemSummary>,
}

/// Result of [`Simulation::advance`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AdvanceOutcome {
    /// Current date after the advance.
    pub new_date: DateTime<Utc>,
    /// Whole days advanced.
    pub days_passed: i64,
    /// What changed.
    pub changes: AdvanceChanges,
}

/// Clock settings plus the waste side list.
#[derive(Debug, Clone)]
pub struct Simulation {
    settings: SimulationSettings,
    waste_items: Vec<WasteRecord>,
}

impl Simulation {
    /// Creates a stopped clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            settings: SimulationSettings::new(now),
            waste_items: Vec::new(),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Items flagged as expired by the clock, in detection order.
    pub fn waste_items(&self) -> &[WasteRecord] {
        &self.waste_items
    }

    /// Simulated current instant.
    pub fn current_date(&self) -> DateTime<Utc> {
        self.settings.current_date
    }

    /// Marks the clock running. The current date is unchanged.
    pub fn start(&mut self, speed: u32, auto_expiry: bool) {
        self.settings.is_running = true;
        self.settings.speed = speed;
        self.settings.auto_expiry = auto_expiry;
    }

    /// Marks the clock stopped. The current date is unchanged.
    pub fn pause(&mut self) {
        self.settings.is_running = false;
    }

    /// Applies a partial update.
    ///
    /// Fails with `StateConflict`, leaving settings untouched, if the patch would move
    /// the current date backwards.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<&SimulationSettings> {
        if let Some(date) = patch.current_date {
            if date < self.settings.current_date {
                return Err(Error::StateConflict(format!(
                    "current date cannot move back from {} to {}",
                    self.settings.current_date, date
                )));
            }
            self.settings.current_date = date;
        }
        if let Some(is_running) = patch.is_running {
            self.settings.is_running = is_running;
        }
        if let Some(speed) = patch.speed {
            self.settings.speed = speed;
        }
        if let Some(auto_expiry) = patch.auto_expiry {
            self.settings.auto_expiry = auto_expiry;
        }
        Ok(&self.settings)
    }

    /// Advances the clock and applies its effects to the store.
    ///
    /// Each listed item's usage grows by the number of days advanced. Stored usage
    /// is capped at the limit once reached, and reaching it for the first time is
    /// reported as depleted. With auto-expiry on, every expiry in
    /// (previous date, new date] is reported and added to the waste side list once.
    ///
    /// Fails with `StateConflict`, before touching the store, if the span is negative
    /// or would carry the date out of range.
    pub fn advance<S: ItemStore + ?Sized>(
        &mut self,
        store: &mut S,
        request: &AdvanceRequest,
    ) -> Result<AdvanceOutcome> {
        let previous = self.settings.current_date;
        let days = match request.span {
            AdvanceSpan::Days(days) if days < 0 => {
                return Err(Error::StateConflict(format!(
                    "cannot advance by a negative number of days ({})",
                    days
                )))
            }
            AdvanceSpan::Days(days) => days,
            AdvanceSpan::Until(target) if target < previous => {
                return Err(Error::StateConflict(format!(
                    "target {} is before the current date {}",
                    target, previous
                )))
            }
            AdvanceSpan::Until(target) => (target - previous).num_days(),
        };
        let out_of_range = || {
            Error::StateConflict(format!(
                "advancing {} days from {} leaves the supported date range",
                days, previous
            ))
        };
        let new_date = Duration::try_days(days)
            .and_then(|span| previous.checked_add_signed(span))
            .ok_or_else(out_of_range)?;
        let elapsed_hours = days
            .checked_mul(24)
            .and_then(|hours| self.settings.elapsed_hours.checked_add(hours))
            .ok_or_else(out_of_range)?;

        let mut changes = AdvanceChanges::default();
        let delta = u32::try_from(days).unwrap_or(u32::MAX);

        for id in &request.items_used {
            let Some(mut item) = store.get_item(id)? else {
                debug!("Skipping usage for unknown item '{}'", id);
                continue;
            };

            let before = item.usage_count();
            let after = before.saturating_add(delta);

            match item.usage_limit() {
                Some(limit) => {
                    if before < limit && after >= limit {
                        changes.items_depleted_today.push((&item).into());
                    }
                    item.set_usage_count(if after > limit { limit.max(before) } else { after });
                    changes.items_used.push(UsedItem {
                        item_id: item.id().to_string(),
                        name: item.name().to_string(),
                        remaining_uses: item.remaining_uses().unwrap_or(0),
                    });
                }
                None => item.set_usage_count(after),
            }
            store.upsert_item(item)?;
        }

        if self.settings.auto_expiry {
            for item in store.get_items(&ItemFilter::all())? {
                let Some(expiry) = item.expiry_date() else {
                    continue;
                };
                if expiry <= previous || expiry > new_date {
                    continue;
                }

                changes.items_expired.push(ExpiredItem {
                    item_id: item.id().to_string(),
                    name: item.name().to_string(),
                    expiry_date: expiry,
                });
                self.settings.expired_items += 1;

                if !self.waste_items.iter().any(|w| w.item_id == item.id()) {
                    self.waste_items.push(WasteRecord {
                        item_id: item.id().to_string(),
                        name: item.name().to_string(),
                        reason: "expired".to_string(),
                        expiry_date: expiry,
                        identified_date: new_date,
                    });
                }
            }
        }

        self.settings.current_date = new_date;
        self.settings.elapsed_hours = elapsed_hours;

        info!(
            "Advanced clock {} days to {} ({} used, {} expired, {} depleted)",
            days,
            new_date,
            changes.items_used.len(),
            changes.items_expired.len(),
            changes.items_depleted_today.len()
        );

        Ok(AdvanceOutcome {
            new_date,
            days_passed: days,
            changes,
        })
    }

    /// Restores default settings at `now`, zeroes every item's usage count and
    /// clears the waste side list. Returns the number of items touched.
    pub fn reset<S: ItemStore + ?Sized>(&mut self, store: &mut S, now: DateTime<Utc>) -> Result<usize> {
        let mut touched = 0;
        for mut item in store.get_items(&ItemFilter::all())? {
            if item.usage_count() != 0 {
                item.set_usage_count(0);
                store.upsert_item(item)?;
                touched += 1;
            }
        }

        self.settings = SimulationSettings::new(now);
        self.waste_items.clear();
        info!("Simulation reset; {} usage counters cleared", touched);
        Ok(touched)
    }
}
