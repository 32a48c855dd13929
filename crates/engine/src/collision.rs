//! Occupied-space index for a single container.

use stowage_core::geometry::{overlaps, Position};
use stowage_core::Item;

/// The boxes already taken inside one container.
///
/// Built from a store query and never written back; a batch placement works on a
/// [`snapshot`](OccupiedSpace::snapshot) and extends it as it commits positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupiedSpace {
    boxes: Vec<Position>,
}

impl OccupiedSpace {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index from explicit boxes.
    pub fn from_positions(boxes: impl IntoIterator<Item = Position>) -> Self {
        Self {
            boxes: boxes.into_iter().collect(),
        }
    }

    /// Collects the positions of placed items, skipping `exclude_id` if given.
    pub fn from_items<'a>(
        items: impl IntoIterator<Item = &'a Item>,
        exclude_id: Option<&str>,
    ) -> Self {
        let boxes = items
            .into_iter()
            .filter(|item| exclude_id != Some(item.id()))
            .filter_map(|item| item.position().copied())
            .collect();
        Self { boxes }
    }

    /// Returns true if the candidate strictly overlaps any occupied box.
    pub fn collides(&self, candidate: &Position) -> bool {
        self.first_collision(candidate).is_some()
    }

    /// Returns the first occupied box the candidate overlaps.
    pub fn first_collision(&self, candidate: &Position) -> Option<&Position> {
        self.boxes.iter().find(|occupied| overlaps(candidate, occupied))
    }

    /// Independent copy for a multi-item placement pass.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Marks a box as taken.
    pub fn insert(&mut self, position: Position) {
        self.boxes.push(position);
    }

    /// The occupied boxes.
    pub fn boxes(&self) -> &[Position] {
        &self.boxes
    }

    /// Number of occupied boxes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Returns true if nothing is occupied.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Total occupied volume.
    pub fn total_volume(&self) -> i64 {
        self.boxes.iter().map(Position::volume).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::coords;

    #[test]
    fn test_collides() {
        let space = OccupiedSpace::from_positions([Position::from_origin(
            coords(0, 0, 0),
            coords(20, 15, 5),
        )]);

        assert!(space.collides(&Position::from_origin(coords(10, 10, 0), coords(5, 5, 5))));
        assert!(!space.collides(&Position::from_origin(coords(20, 0, 0), coords(5, 5, 5))));
        assert!(!space.collides(&Position::from_origin(coords(0, 0, 5), coords(20, 15, 5))));
    }

    #[test]
    fn test_from_items_skips_unplaced_and_excluded() {
        let items = vec![
            Item::new("A", "a", "C1", 10, 10, 10).placed_at(0, 0, 0),
            Item::new("B", "b", "C1", 10, 10, 10).placed_at(10, 0, 0),
            Item::new("C", "c", "C1", 10, 10, 10),
        ];

        let all = OccupiedSpace::from_items(&items, None);
        assert_eq!(all.len(), 2);

        let without_a = OccupiedSpace::from_items(&items, Some("A"));
        assert_eq!(without_a.len(), 1);
        assert_eq!(without_a.total_volume(), 1000);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let base = OccupiedSpace::new();
        let mut working = base.snapshot();
        working.insert(Position::from_origin(coords(0, 0, 0), coords(1, 1, 1)));

        assert!(base.is_empty());
        assert_eq!(working.len(), 1);
    }
}
