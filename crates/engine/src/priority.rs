//! Item ranking for placement and retrieval.
//!
//! Two unrelated scores live here. [`priority_score`] orders items for placement
//! (and return planning) by urgency; [`retrieval_ease_score`] orders items by how
//! close they sit to a container's opening. They are never interchanged.

use crate::retrieval::blocks;
use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use stowage_core::{EngineConfig, Item};

/// Baseline of [`retrieval_ease_score`].
pub const BASE_EASE_SCORE: f64 = 50.0;

/// Penalty per blocking item in [`obstruction_penalty`].
pub const OBSTRUCTION_PENALTY_PER_BLOCKER: u32 = 10;

/// Urgency score used to order batch placement, highest first.
///
/// Starts at the item's stored priority. Adds +2 if expiry is under
/// `urgent_expiry_days` away, else +1 if under `soon_expiry_days` away (nothing if
/// the item has no expiry or is already past due). Adds +2 if mass exceeds
/// `heavy_mass`, else +1 if it exceeds `medium_mass`.
pub fn priority_score(item: &Item, as_of: DateTime<Utc>, config: &EngineConfig) -> i32 {
    let mut score = item.priority();

    if let Some(expiry) = item.expiry_date() {
        if expiry > as_of {
            let days_left = (expiry - as_of).num_days();
            if days_left < config.urgent_expiry_days {
                score += 2;
            } else if days_left < config.soon_expiry_days {
                score += 1;
            }
        }
    }

    if let Some(mass) = item.mass() {
        if mass > config.heavy_mass {
            score += 2;
        } else if mass > config.medium_mass {
            score += 1;
        }
    }

    score
}

/// Orders items by descending [`priority_score`]. Ties keep their input order.
pub fn rank_for_placement<'a>(
    items: &'a [Item],
    as_of: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<&'a Item> {
    let mut scored: Vec<(i32, &Item)> = items
        .iter()
        .map(|item| (priority_score(item, as_of, config), item))
        .collect();
    scored.sort_by_key(|(score, _)| Reverse(*score));
    scored.into_iter().map(|(_, item)| item).collect()
}

/// How easy an item is to reach, higher is easier.
///
/// Unplaced items score the 50-point baseline. Placed items gain up to 50 points
/// from their start height (weight 0.5), up to 30 from their start depth (0.3) and up
/// to 20 from their start width (0.2), each axis capped at 100.
pub fn retrieval_ease_score(item: &Item) -> f64 {
    let Some(position) = item.position() else {
        return BASE_EASE_SCORE;
    };

    let headroom = |coordinate: i32| 100.0 - f64::from(coordinate.min(100));
    BASE_EASE_SCORE
        + headroom(position.start.z) * 0.5
        + headroom(position.start.y) * 0.3
        + headroom(position.start.x) * 0.2
}

/// Ten points for every other item blocking access to `item`.
pub fn obstruction_penalty(item: &Item, others: &[Item]) -> u32 {
    let Some(target) = item.position() else {
        return 0;
    };

    let blockers = others
        .iter()
        .filter(|other| other.id() != item.id())
        .filter_map(|other| other.position())
        .filter(|other| blocks(other, target))
        .count() as u32;

    blockers * OBSTRUCTION_PENALTY_PER_BLOCKER
}

/// Retrieval order: items with an expiry first (soonest first), then the rest by
/// descending [`retrieval_ease_score`].
pub fn prioritize_for_retrieval(items: &[Item]) -> Vec<&Item> {
    let (mut dated, mut undated): (Vec<&Item>, Vec<&Item>) =
        items.iter().partition(|item| item.expiry_date().is_some());

    dated.sort_by_key(|item| item.expiry_date());
    undated.sort_by(|a, b| {
        retrieval_ease_score(b)
            .partial_cmp(&retrieval_ease_score(a))
            .unwrap_or(Ordering::Equal)
    });

    dated.extend(undated);
    dated
}
