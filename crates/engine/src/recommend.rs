//! Batch placement recommendation.

use crate::collision::OccupiedSpace;
use crate::priority::rank_for_placement;
use crate::search::{PlacementSearch, ScanOrder};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use stowage_core::geometry::Position;
use stowage_core::{Container, Error, Item};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why an item in a batch was not placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureReason {
    /// A dimension is zero or negative.
    InvalidDimensions,
    /// A dimension exceeds the container's extent.
    TooLarge,
    /// Every lattice position collides.
    NoSuitablePosition,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FailureReason::InvalidDimensions => "invalid dimensions",
            FailureReason::TooLarge => "item too large for container",
            FailureReason::NoSuitablePosition => "no suitable position found",
        })
    }
}

/// Result of placing one batch item.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlacementOutcome {
    /// Free box committed to the batch snapshot.
    Placed(Position),
    /// Item left unplaced.
    Failed(FailureReason),
}

/// One entry of a batch result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Recommendation {
    /// Item the entry is about.
    pub item_id: String,
    /// Where it goes, or why it does not.
    pub outcome: PlacementOutcome,
}

impl Recommendation {
    /// Returns true if a position was found.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PlacementOutcome::Placed(_))
    }

    /// The recommended position, if any.
    pub fn position(&self) -> Option<&Position> {
        match &self.outcome {
            PlacementOutcome::Placed(position) => Some(position),
            PlacementOutcome::Failed(_) => None,
        }
    }

    /// The failure reason, if any.
    pub fn failure(&self) -> Option<FailureReason> {
        match self.outcome {
            PlacementOutcome::Placed(_) => None,
            PlacementOutcome::Failed(reason) => Some(reason),
        }
    }
}

impl PlacementSearch {
    /// Places a batch of items into one container.
    ///
    /// Items are processed in descending priority order (stable on ties), each
    /// against a snapshot of `existing` extended with the positions committed earlier
    /// in the same batch. A failed item never aborts the batch. The result has one
    /// entry per input item, in processing order. Nothing is written back to any store.
    pub fn place_batch(
        &self,
        items: &[Item],
        container: &Container,
        existing: &OccupiedSpace,
        as_of: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let mut working = existing.snapshot();
        let mut recommendations = Vec::with_capacity(items.len());

        for item in rank_for_placement(items, as_of, self.config()) {
            let outcome = match self.place_one(item, container, &working) {
                Ok(position) => {
                    working.insert(position);
                    PlacementOutcome::Placed(position)
                }
                Err(reason) => PlacementOutcome::Failed(reason),
            };
            recommendations.push(Recommendation {
                item_id: item.id().to_string(),
                outcome,
            });
        }

        debug!(
            "Batch of {} for '{}': {} placed",
            items.len(),
            container.id(),
            recommendations.iter().filter(|r| r.is_success()).count()
        );
        recommendations
    }

    fn place_one(
        &self,
        item: &Item,
        container: &Container,
        occupied: &OccupiedSpace,
    ) -> std::result::Result<Position, FailureReason> {
        if item.dimensions().iter().any(|&d| d <= 0) {
            return Err(FailureReason::InvalidDimensions);
        }
        if !item.fits_within(container) {
            return Err(FailureReason::TooLarge);
        }

        match self.find_position_with_order(
            item.dimensions(),
            container,
            occupied,
            ScanOrder::HeightWidthDepth,
        ) {
            Ok(position) => Ok(position),
            Err(Error::SearchBudgetExceeded(checked)) => {
                warn!(
                    "Search budget exhausted for '{}' after {} candidates",
                    item.id(),
                    checked
                );
                Err(FailureReason::NoSuitablePosition)
            }
            Err(_) => Err(FailureReason::NoSuitablePosition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stowage_core::geometry::{contains, coords, overlaps};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_batch_uses_height_outer_order() {
        let container = Container::new("C1", "Lab", 100, 80, 60);
        let items = vec![
            Item::new("A", "a", "C1", 20, 15, 5),
            Item::new("B", "b", "C1", 20, 15, 5),
        ];
        let result = PlacementSearch::default_config().place_batch(
            &items,
            &container,
            &OccupiedSpace::new(),
            now(),
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].position().unwrap().start, coords(0, 0, 0));
        assert_eq!(result[1].position().unwrap().start, coords(0, 15, 0));
    }

    #[test]
    fn test_batch_orders_by_priority() {
        let container = Container::new("C1", "Lab", 10, 10, 10);
        let items = vec![
            Item::new("low", "l", "C1", 10, 10, 10),
            Item::new("high", "h", "C1", 10, 10, 10).with_priority(5),
        ];
        let result = PlacementSearch::default_config().place_batch(
            &items,
            &container,
            &OccupiedSpace::new(),
            now(),
        );

        assert_eq!(result[0].item_id, "high");
        assert!(result[0].is_success());
        assert_eq!(result[1].item_id, "low");
        assert_eq!(result[1].failure(), Some(FailureReason::NoSuitablePosition));
    }

    #[test]
    fn test_batch_failure_reasons() {
        let container = Container::new("C1", "Lab", 10, 10, 10);
        let items = vec![
            Item::new("flat", "f", "C1", 5, 0, 5),
            Item::new("huge", "h", "C1", 50, 5, 5),
            Item::new("ok", "o", "C1", 5, 5, 5),
        ];
        let result = PlacementSearch::default_config().place_batch(
            &items,
            &container,
            &OccupiedSpace::new(),
            now(),
        );

        assert_eq!(result[0].failure(), Some(FailureReason::InvalidDimensions));
        assert_eq!(result[1].failure(), Some(FailureReason::TooLarge));
        assert!(result[2].is_success());
        assert_eq!(
            FailureReason::TooLarge.to_string(),
            "item too large for container"
        );
    }

    #[test]
    fn test_batch_respects_existing_and_own_placements() {
        let container = Container::new("C1", "Lab", 30, 30, 30);
        let existing =
            OccupiedSpace::from_positions([Position::from_origin(coords(0, 0, 0), coords(10, 10, 10))]);
        let items: Vec<Item> = (0..6)
            .map(|i| Item::new(format!("I{}", i), "box", "C1", 10, 10, 10))
            .collect();
        let result =
            PlacementSearch::default_config().place_batch(&items, &container, &existing, now());

        let mut placed: Vec<Position> = existing.boxes().to_vec();
        for rec in &result {
            let position = *rec.position().unwrap();
            assert!(contains(&container.bounds(), &position));
            assert!(placed.iter().all(|p| !overlaps(p, &position)));
            placed.push(position);
        }
        // The caller's snapshot is untouched.
        assert_eq!(existing.len(), 1);
    }

    #[test]
    fn test_budget_failure_is_no_suitable_position() {
        let container = Container::new("C1", "Lab", 10, 10, 10);
        let existing = OccupiedSpace::from_positions([container.bounds()]);
        let search = PlacementSearch::new(
            stowage_core::EngineConfig::default().with_max_candidates(2),
        );
        let result = search.place_batch(
            &[Item::new("A", "a", "C1", 1, 1, 1)],
            &container,
            &existing,
            now(),
        );
        assert_eq!(result[0].failure(), Some(FailureReason::NoSuitablePosition));
    }
}
