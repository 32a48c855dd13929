//! Retrieval planning.
//!
//! Access to a container is from its low-depth face. An item is reached once
//! everything overlapping its width/height footprint, at or past its front face in
//! depth, has been moved aside.

use stowage_core::geometry::{overlaps_on, Axis, Position};
use stowage_core::{Container, Item};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One instruction in a retrieval plan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RetrievalStep {
    /// 1-based, contiguous.
    pub step: usize,
    /// Human-readable instruction.
    pub instruction: String,
    /// Items moved in this step.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "itemsToMove", skip_serializing_if = "Option::is_none")
    )]
    pub items_to_move: Option<Vec<String>>,
}

impl RetrievalStep {
    fn new(step: usize, instruction: String) -> Self {
        Self {
            step,
            instruction,
            items_to_move: None,
        }
    }

    fn moving(step: usize, instruction: String, items: Vec<String>) -> Self {
        Self {
            step,
            instruction,
            items_to_move: Some(items),
        }
    }
}

/// Returns true if `other` obstructs access to `target`.
///
/// `other` must reach past the target's front face in depth and overlap it strictly
/// on both width and height.
pub fn blocks(other: &Position, target: &Position) -> bool {
    other.end.y > target.start.y
        && overlaps_on(other, target, Axis::Width)
        && overlaps_on(other, target, Axis::Height)
}

/// Identifiers of the placed items in `others` that block `target`, in input order.
///
/// Entries sharing the target's identifier and unplaced entries are ignored.
pub fn find_blockers(target: &Item, others: &[Item]) -> Vec<String> {
    let Some(position) = target.position() else {
        return Vec::new();
    };

    others
        .iter()
        .filter(|other| other.id() != target.id())
        .filter(|other| other.position().is_some_and(|p| blocks(p, position)))
        .map(|other| other.id().to_string())
        .collect()
}

/// Builds the ordered steps to take `item` out of `container`.
pub fn plan_retrieval(item: &Item, container: &Container, others: &[Item]) -> Vec<RetrievalStep> {
    let mut steps = vec![RetrievalStep::new(
        1,
        format!(
            "Locate container {} in the {} zone",
            container.id(),
            container.zone()
        ),
    )];

    let Some(position) = item.position() else {
        steps.push(RetrievalStep::new(
            2,
            format!(
                "Retrieve item {} ({}) from the container",
                item.id(),
                item.name()
            ),
        ));
        return steps;
    };

    steps.push(RetrievalStep::new(
        2,
        format!(
            "Locate item at position ({}, {}, {}) within the container",
            position.start.x, position.start.y, position.start.z
        ),
    ));

    let blockers = find_blockers(item, others);
    if !blockers.is_empty() {
        steps.push(RetrievalStep::moving(
            steps.len() + 1,
            format!(
                "Temporarily move {} items that are blocking access",
                blockers.len()
            ),
            blockers.clone(),
        ));
    }

    steps.push(RetrievalStep::new(
        steps.len() + 1,
        format!("Retrieve item {} ({})", item.id(), item.name()),
    ));

    if !blockers.is_empty() {
        steps.push(RetrievalStep::moving(
            steps.len() + 1,
            "Replace the items that were moved".to_string(),
            blockers,
        ));
    }

    steps
}

/// A retrieval plan together with what it was built for.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RetrievalPlan {
    /// Item to retrieve.
    pub item: Item,
    /// Container holding it.
    pub container: Container,
    /// Ordered steps.
    pub steps: Vec<RetrievalStep>,
}

impl RetrievalPlan {
    /// Plans retrieval of `item` from `container`.
    pub fn build(item: Item, container: Container, others: &[Item]) -> Self {
        let steps = plan_retrieval(&item, &container, others);
        Self {
            item,
            container,
            steps,
        }
    }

    /// Items that must be moved aside first.
    pub fn blockers(&self) -> &[String] {
        self.steps
            .iter()
            .find_map(|s| s.items_to_move.as_deref())
            .unwrap_or(&[])
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the plan has no steps. Built plans always have at least two.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::coords;

    fn container() -> Container {
        Container::new("C1", "Lab", 100, 80, 60)
    }

    fn item(id: &str) -> Item {
        Item::new(id, format!("Item {}", id), "C1", 10, 10, 10)
    }

    #[test]
    fn test_blocks_requires_footprint_overlap() {
        let target = Position::from_origin(coords(0, 0, 0), coords(10, 10, 10));
        let behind = Position::from_origin(coords(0, 10, 0), coords(10, 10, 10));
        let beside = Position::from_origin(coords(10, 10, 0), coords(10, 10, 10));
        let above = Position::from_origin(coords(0, 10, 10), coords(10, 10, 10));
        let partial = Position::from_origin(coords(5, 30, 5), coords(10, 10, 10));

        assert!(blocks(&behind, &target));
        assert!(blocks(&partial, &target));
        assert!(!blocks(&beside, &target));
        assert!(!blocks(&above, &target));
    }

    #[test]
    fn test_blocks_uses_depth_threshold() {
        let target = Position::from_origin(coords(0, 20, 0), coords(10, 10, 10));
        let shallow = Position::from_origin(coords(0, 0, 0), coords(10, 20, 10));
        let straddling = Position::from_origin(coords(0, 0, 0), coords(10, 21, 10));
        assert!(!blocks(&shallow, &target));
        assert!(blocks(&straddling, &target));
    }

    #[test]
    fn test_unplaced_item_plan() {
        let steps = plan_retrieval(&item("A"), &container(), &[]);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].instruction, "Locate container C1 in the Lab zone");
        assert_eq!(steps[1].instruction, "Retrieve item A (Item A) from the container");
    }

    #[test]
    fn test_clear_access_plan() {
        let target = item("A").placed_at(30, 0, 0);
        let others = vec![target.clone(), item("B").placed_at(0, 10, 0)];
        let steps = plan_retrieval(&target, &container(), &others);

        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1].instruction,
            "Locate item at position (30, 0, 0) within the container"
        );
        assert_eq!(steps[2].step, 3);
        assert_eq!(steps[2].instruction, "Retrieve item A (Item A)");
        assert!(steps.iter().all(|s| s.items_to_move.is_none()));
    }

    #[test]
    fn test_blocked_plan() {
        let target = item("T").placed_at(0, 0, 0);
        let others = vec![
            target.clone(),
            item("B1").placed_at(0, 10, 0),
            item("B2").placed_at(0, 20, 0),
            item("loose"),
        ];
        let plan = RetrievalPlan::build(target, container(), &others);

        assert_eq!(plan.len(), 5);
        let numbers: Vec<usize> = plan.steps.iter().map(|s| s.step).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            plan.steps[2].instruction,
            "Temporarily move 2 items that are blocking access"
        );
        assert_eq!(plan.blockers(), ["B1".to_string(), "B2".to_string()]);
        assert_eq!(plan.steps[3].instruction, "Retrieve item T (Item T)");
        assert_eq!(plan.steps[4].instruction, "Replace the items that were moved");
        assert_eq!(plan.steps[4].items_to_move, plan.steps[2].items_to_move);
    }
}
