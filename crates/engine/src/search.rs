//! First-fit placement search.
//!
//! Candidate origins are enumerated on an integer lattice inside the container, in a
//! fixed nesting order, and the first box that does not collide with the occupied
//! space wins. A coarse lattice (step 5 by default) is tried first and a fine lattice
//! (step 1) only if the coarse pass comes up empty. Both passes share the same
//! collision predicate, so the coarse pass can only ever return a box the fine pass
//! would also accept.
//!
//! # Scan order
//!
//! Single-item search nests width (outer), depth, height (inner). Batch search nests
//! height (outer), width, depth (inner). The order decides which free pocket is found
//! first and is part of the observable contract.

use crate::collision::OccupiedSpace;
use log::{debug, trace};
use rayon::prelude::*;
use stowage_core::geometry::{contains, Axis, Coordinates, Position};
use stowage_core::{Container, EngineConfig, Error, Item, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nesting order of the lattice scan, listed outer to inner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanOrder {
    /// Width outer, depth middle, height inner. Used for single-item search.
    #[default]
    WidthDepthHeight,
    /// Height outer, width middle, depth inner. Used for batch search.
    HeightWidthDepth,
}

impl ScanOrder {
    /// Axes from outermost to innermost loop.
    pub fn axes(self) -> [Axis; 3] {
        match self {
            ScanOrder::WidthDepthHeight => [Axis::Width, Axis::Depth, Axis::Height],
            ScanOrder::HeightWidthDepth => [Axis::Height, Axis::Width, Axis::Depth],
        }
    }
}

/// Which pass produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPass {
    /// Coarse lattice.
    Coarse,
    /// Fine lattice.
    Fine,
}

/// A container chosen by [`PlacementSearch::find_in_containers`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerMatch {
    /// Container the item fits in.
    pub container_id: String,
    /// Free box found inside it.
    pub position: Position,
}

/// Counts candidate checks against an optional ceiling.
struct Budget {
    limit: u64,
    checked: u64,
}

impl Budget {
    fn new(limit: u64) -> Self {
        Self { limit, checked: 0 }
    }

    fn tick(&mut self) -> Result<()> {
        if self.limit > 0 && self.checked >= self.limit {
            return Err(Error::SearchBudgetExceeded(self.checked));
        }
        self.checked += 1;
        Ok(())
    }
}

/// Placement search engine.
#[derive(Debug, Clone, Default)]
pub struct PlacementSearch {
    config: EngineConfig,
}

impl PlacementSearch {
    /// Creates a search with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates a search with default configuration.
    pub fn default_config() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Finds the first free box for `dims` using the single-item scan order.
    ///
    /// Fails with `InvalidGeometry` if a dimension is non-positive or exceeds the
    /// container, and with `NoPlacement` if both passes find nothing.
    pub fn find_position(
        &self,
        dims: &Coordinates,
        container: &Container,
        occupied: &OccupiedSpace,
    ) -> Result<Position> {
        self.find_position_with_order(dims, container, occupied, ScanOrder::WidthDepthHeight)
    }

    /// Validates an item and finds the first free box for it.
    pub fn find_position_for(
        &self,
        item: &Item,
        container: &Container,
        occupied: &OccupiedSpace,
    ) -> Result<Position> {
        item.validate()?;
        self.find_position(item.dimensions(), container, occupied)
            .map_err(|err| match err {
                Error::NoPlacement(_) => Error::NoPlacement(item.id().to_string()),
                other => other,
            })
    }

    /// Finds the first free box for `dims` using an explicit scan order.
    pub fn find_position_with_order(
        &self,
        dims: &Coordinates,
        container: &Container,
        occupied: &OccupiedSpace,
        order: ScanOrder,
    ) -> Result<Position> {
        check_fit(dims, container)?;

        let mut budget = Budget::new(self.config.max_candidates);

        if let Some(position) =
            scan(dims, container, occupied, order, self.config.coarse_step, &mut budget)?
        {
            debug!(
                "Coarse pass placed {:?} in '{}' at {}",
                dims.as_slice(),
                container.id(),
                position
            );
            return Ok(position);
        }

        if self.config.fine_step != self.config.coarse_step {
            if let Some(position) =
                scan(dims, container, occupied, order, self.config.fine_step, &mut budget)?
            {
                debug!(
                    "Fine pass placed {:?} in '{}' at {}",
                    dims.as_slice(),
                    container.id(),
                    position
                );
                return Ok(position);
            }
        }

        debug!(
            "No position for {:?} in '{}' after {} candidates",
            dims.as_slice(),
            container.id(),
            budget.checked
        );
        Err(Error::NoPlacement(format!(
            "{:?} in container {}",
            dims.as_slice(),
            container.id()
        )))
    }

    /// Reports which pass a search would succeed in, without placing anything.
    pub fn winning_pass(
        &self,
        dims: &Coordinates,
        container: &Container,
        occupied: &OccupiedSpace,
        order: ScanOrder,
    ) -> Result<Option<SearchPass>> {
        check_fit(dims, container)?;
        let mut budget = Budget::new(self.config.max_candidates);
        if scan(dims, container, occupied, order, self.config.coarse_step, &mut budget)?.is_some() {
            return Ok(Some(SearchPass::Coarse));
        }
        if self.config.fine_step != self.config.coarse_step
            && scan(dims, container, occupied, order, self.config.fine_step, &mut budget)?.is_some()
        {
            return Ok(Some(SearchPass::Fine));
        }
        Ok(None)
    }

    /// Searches several containers in parallel and returns the first success in
    /// candidate order.
    ///
    /// If the item is too large for every candidate the first `InvalidGeometry` error
    /// is returned; otherwise failure is `NoPlacement`.
    pub fn find_in_containers(
        &self,
        item: &Item,
        candidates: &[(Container, OccupiedSpace)],
    ) -> Result<ContainerMatch> {
        item.validate()?;

        let results: Vec<Result<Position>> = candidates
            .par_iter()
            .map(|(container, occupied)| self.find_position(item.dimensions(), container, occupied))
            .collect();

        let mut first_invalid = None;
        let mut all_invalid = !results.is_empty();
        for ((container, _), result) in candidates.iter().zip(results) {
            match result {
                Ok(position) => {
                    return Ok(ContainerMatch {
                        container_id: container.id().to_string(),
                        position,
                    })
                }
                Err(err @ Error::InvalidGeometry(_)) => {
                    if first_invalid.is_none() {
                        first_invalid = Some(err);
                    }
                }
                Err(err) => {
                    trace!("'{}' rejected by '{}': {}", item.id(), container.id(), err);
                    all_invalid = false;
                }
            }
        }

        match first_invalid {
            Some(err) if all_invalid => Err(err),
            _ => Err(Error::NoPlacement(item.id().to_string())),
        }
    }
}

/// Rejects dimensions that can never produce a legal box in the container.
pub fn check_fit(dims: &Coordinates, container: &Container) -> Result<()> {
    if dims.iter().any(|&d| d <= 0) {
        return Err(Error::InvalidGeometry("invalid dimensions".into()));
    }
    if dims
        .iter()
        .zip(container.dimensions().iter())
        .any(|(item, bound)| item > bound)
    {
        return Err(Error::InvalidGeometry(format!(
            "item too large for container {}",
            container.id()
        )));
    }
    Ok(())
}

/// Checks an explicitly supplied position for an item of size `dims`.
///
/// The box must lie inside the container, match the item's size and not overlap
/// anything in `occupied`.
pub fn validate_position(
    dims: &Coordinates,
    position: &Position,
    container: &Container,
    occupied: &OccupiedSpace,
) -> Result<()> {
    // Containment first: it bounds the corners, so the size subtraction cannot overflow.
    if !contains(&container.bounds(), position) {
        return Err(Error::InvalidGeometry(format!(
            "position {} lies outside container {}",
            position,
            container.id()
        )));
    }
    if position.dimensions() != *dims {
        return Err(Error::InvalidGeometry(format!(
            "position {} does not match item size {:?}",
            position,
            dims.as_slice()
        )));
    }
    if let Some(other) = occupied.first_collision(position) {
        return Err(Error::StateConflict(format!(
            "position {} overlaps occupied space {}",
            position, other
        )));
    }
    Ok(())
}

/// Smallest multiple of `step` that is at least `value` (`value` >= 0).
fn round_up(value: i32, step: i32) -> i32 {
    (value + step - 1) / step * step
}

/// One lattice pass. `Ok(None)` means the pass completed without a free box.
fn scan(
    dims: &Coordinates,
    container: &Container,
    occupied: &OccupiedSpace,
    order: ScanOrder,
    step: i32,
    budget: &mut Budget,
) -> Result<Option<Position>> {
    let [outer, middle, inner] = order.axes();
    let limit = |axis: Axis| container.dimensions()[axis.index()] - dims[axis.index()];

    let mut origin = Coordinates::zeros();
    let mut a = 0;
    while a <= limit(outer) {
        origin[outer.index()] = a;
        let mut b = 0;
        while b <= limit(middle) {
            origin[middle.index()] = b;
            let mut c = 0;
            while c <= limit(inner) {
                origin[inner.index()] = c;
                budget.tick()?;

                let candidate = Position::from_origin(origin, *dims);
                match occupied.first_collision(&candidate) {
                    None => return Ok(Some(candidate)),
                    // Every inner coordinate short of the blocker's far face still
                    // overlaps it, so resume at the next lattice point past that face.
                    Some(blocker) => c = round_up(blocker.end_on(inner), step),
                }
            }
            b += step;
        }
        a += step;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::geometry::{coords, overlaps};

    fn container() -> Container {
        Container::new("C1", "Lab", 100, 80, 60)
    }

    #[test]
    fn test_empty_container_places_at_origin() {
        let search = PlacementSearch::default_config();
        let position = search
            .find_position(&coords(20, 15, 5), &container(), &OccupiedSpace::new())
            .unwrap();
        assert_eq!(position.start, coords(0, 0, 0));
        assert_eq!(position.end, coords(20, 15, 5));
    }

    #[test]
    fn test_single_order_advances_height_first() {
        let occupied = OccupiedSpace::from_positions([Position::from_origin(
            coords(0, 0, 0),
            coords(20, 15, 5),
        )]);
        let search = PlacementSearch::default_config();

        let single = search
            .find_position(&coords(20, 15, 5), &container(), &occupied)
            .unwrap();
        assert_eq!(single.start, coords(0, 0, 5));

        let batch = search
            .find_position_with_order(
                &coords(20, 15, 5),
                &container(),
                &occupied,
                ScanOrder::HeightWidthDepth,
            )
            .unwrap();
        assert_eq!(batch.start, coords(0, 15, 0));
    }

    #[test]
    fn test_too_large_rejected() {
        let search = PlacementSearch::default_config();
        let err = search
            .find_position(&coords(200, 1, 1), &container(), &OccupiedSpace::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(ref msg) if msg.contains("too large")));
    }

    #[test]
    fn test_non_positive_rejected() {
        let search = PlacementSearch::default_config();
        let err = search
            .find_position(&coords(0, 1, 1), &container(), &OccupiedSpace::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }

    #[test]
    fn test_fine_pass_finds_unaligned_gap() {
        // 7-wide container with a 5-wide block at the origin leaves a 2-wide slot at
        // width 5..7. Only offsets 0 and 5 are on the coarse lattice, and 5 is the slot.
        let narrow = Container::new("N", "Lab", 7, 1, 1);
        let occupied =
            OccupiedSpace::from_positions([Position::from_origin(coords(0, 0, 0), coords(5, 1, 1))]);
        let search = PlacementSearch::default_config();
        let position = search
            .find_position(&coords(2, 1, 1), &narrow, &occupied)
            .unwrap();
        assert_eq!(position.start, coords(5, 0, 0));

        // A 3-wide block leaves width 3..7; coarse offsets 0 and 5 both fail for a
        // 4-wide item, so the fine pass must find offset 3.
        let occupied =
            OccupiedSpace::from_positions([Position::from_origin(coords(0, 0, 0), coords(3, 1, 1))]);
        assert_eq!(
            search
                .winning_pass(&coords(4, 1, 1), &narrow, &occupied, ScanOrder::WidthDepthHeight)
                .unwrap(),
            Some(SearchPass::Fine)
        );
        let position = search
            .find_position(&coords(4, 1, 1), &narrow, &occupied)
            .unwrap();
        assert_eq!(position.start, coords(3, 0, 0));
    }

    #[test]
    fn test_full_container_exhausts() {
        let tiny = Container::new("T", "Lab", 10, 10, 10);
        let occupied = OccupiedSpace::from_positions([tiny.bounds()]);
        let search = PlacementSearch::default_config();
        let err = search
            .find_position(&coords(1, 1, 1), &tiny, &occupied)
            .unwrap_err();
        assert!(err.is_search_exhausted());
        assert!(matches!(err, Error::NoPlacement(_)));
    }

    #[test]
    fn test_search_budget() {
        let tiny = Container::new("T", "Lab", 10, 10, 10);
        let occupied = OccupiedSpace::from_positions([tiny.bounds()]);
        let search = PlacementSearch::new(EngineConfig::default().with_max_candidates(3));
        let err = search
            .find_position(&coords(1, 1, 1), &tiny, &occupied)
            .unwrap_err();
        assert!(matches!(err, Error::SearchBudgetExceeded(3)));
    }

    #[test]
    fn test_skip_ahead_matches_exhaustive_scan() {
        let occupied = OccupiedSpace::from_positions([
            Position::from_origin(coords(0, 0, 0), coords(7, 3, 9)),
            Position::from_origin(coords(0, 0, 9), coords(3, 3, 2)),
            Position::from_origin(coords(3, 0, 9), coords(4, 2, 3)),
        ]);
        let bin = Container::new("B", "Lab", 12, 6, 12);
        let dims = coords(3, 2, 3);
        let search = PlacementSearch::new(EngineConfig::default().with_steps(1, 1));

        for order in [ScanOrder::WidthDepthHeight, ScanOrder::HeightWidthDepth] {
            let found = search
                .find_position_with_order(&dims, &bin, &occupied, order)
                .unwrap();

            // Brute-force reference over the same order.
            let [outer, middle, inner] = order.axes();
            let mut expected = None;
            'outer: for a in 0..=bin.dimensions()[outer.index()] - dims[outer.index()] {
                for b in 0..=bin.dimensions()[middle.index()] - dims[middle.index()] {
                    for c in 0..=bin.dimensions()[inner.index()] - dims[inner.index()] {
                        let mut origin = Coordinates::zeros();
                        origin[outer.index()] = a;
                        origin[middle.index()] = b;
                        origin[inner.index()] = c;
                        let candidate = Position::from_origin(origin, dims);
                        if !occupied.boxes().iter().any(|o| overlaps(&candidate, o)) {
                            expected = Some(candidate);
                            break 'outer;
                        }
                    }
                }
            }
            assert_eq!(Some(found), expected, "order {:?}", order);
        }
    }

    #[test]
    fn test_validate_position() {
        let occupied =
            OccupiedSpace::from_positions([Position::from_origin(coords(0, 0, 0), coords(10, 10, 10))]);
        let dims = coords(10, 10, 10);
        let c = container();

        assert!(validate_position(
            &dims,
            &Position::from_origin(coords(10, 0, 0), dims),
            &c,
            &occupied
        )
        .is_ok());
        assert!(matches!(
            validate_position(&dims, &Position::from_origin(coords(5, 0, 0), dims), &c, &occupied),
            Err(Error::StateConflict(_))
        ));
        assert!(matches!(
            validate_position(&dims, &Position::from_origin(coords(95, 0, 0), dims), &c, &occupied),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            validate_position(
                &coords(5, 5, 5),
                &Position::from_origin(coords(20, 0, 0), dims),
                &c,
                &occupied
            ),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_validate_position_extreme_coordinates() {
        let dims = coords(10, 10, 10);
        for position in [
            Position::new(coords(i32::MIN, 0, 0), dims),
            Position::new(coords(0, 0, 0), coords(i32::MAX, 10, 10)),
            Position::new(coords(i32::MIN, i32::MIN, i32::MIN), coords(i32::MAX, i32::MAX, i32::MAX)),
        ] {
            assert!(matches!(
                validate_position(&dims, &position, &container(), &OccupiedSpace::new()),
                Err(Error::InvalidGeometry(_))
            ));
        }
    }

    #[test]
    fn test_winning_pass_equal_steps_scans_once() {
        let tiny = Container::new("T", "Lab", 10, 10, 10);
        let occupied = OccupiedSpace::from_positions([tiny.bounds()]);
        // Skip-ahead leaves one check per (width, depth) pair, so one pass costs 100
        // candidates and a repeated pass would run out of budget.
        let search = PlacementSearch::new(
            EngineConfig::default()
                .with_steps(1, 1)
                .with_max_candidates(150),
        );
        let dims = coords(1, 1, 1);
        assert_eq!(
            search
                .winning_pass(&dims, &tiny, &occupied, ScanOrder::WidthDepthHeight)
                .unwrap(),
            None
        );
        assert!(matches!(
            search.find_position(&dims, &tiny, &occupied),
            Err(Error::NoPlacement(_))
        ));
    }

    #[test]
    fn test_find_in_containers_prefers_candidate_order() {
        let full = Container::new("FULL", "Lab", 10, 10, 10);
        let open = Container::new("OPEN", "Lab", 10, 10, 10);
        let also_open = Container::new("ALSO", "Lab", 10, 10, 10);
        let candidates = vec![
            (full.clone(), OccupiedSpace::from_positions([full.bounds()])),
            (open, OccupiedSpace::new()),
            (also_open, OccupiedSpace::new()),
        ];
        let item = Item::new("I1", "Box", "", 5, 5, 5);
        let search = PlacementSearch::default_config();

        let found = search.find_in_containers(&item, &candidates).unwrap();
        assert_eq!(found.container_id, "OPEN");
        assert_eq!(found.position.start, coords(0, 0, 0));
    }

    #[test]
    fn test_find_in_containers_all_too_small() {
        let candidates = vec![
            (Container::new("A", "Lab", 4, 4, 4), OccupiedSpace::new()),
            (Container::new("B", "Lab", 4, 4, 4), OccupiedSpace::new()),
        ];
        let item = Item::new("I1", "Box", "", 5, 5, 5);
        let err = PlacementSearch::default_config()
            .find_in_containers(&item, &candidates)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }
}
