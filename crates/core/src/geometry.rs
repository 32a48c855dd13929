//! Axis-aligned box primitives.
//!
//! All coordinates are integer triples ordered (width, depth, height). Depth is the
//! access axis: smaller depth is closer to a container's opening.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integer coordinate triple (width, depth, height).
pub type Coordinates = Vector3<i32>;

/// One of the three box axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Side-to-side.
    Width,
    /// Front-to-back; the access axis.
    Depth,
    /// Bottom-to-top.
    Height,
}

impl Axis {
    /// All axes in coordinate order.
    pub const ALL: [Axis; 3] = [Axis::Width, Axis::Depth, Axis::Height];

    /// Index of this axis within a [`Coordinates`] triple.
    pub fn index(self) -> usize {
        match self {
            Axis::Width => 0,
            Axis::Depth => 1,
            Axis::Height => 2,
        }
    }
}

/// Builds a coordinate triple.
pub fn coords(width: i32, depth: i32, height: i32) -> Coordinates {
    Coordinates::new(width, depth, height)
}

/// An axis-aligned box given by its start and end corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Position {
    /// Minimum corner.
    #[cfg_attr(feature = "serde", serde(rename = "startCoordinates"))]
    pub start: Coordinates,
    /// Maximum corner.
    #[cfg_attr(feature = "serde", serde(rename = "endCoordinates"))]
    pub end: Coordinates,
}

impl Position {
    /// Creates a box from explicit corners.
    pub fn new(start: Coordinates, end: Coordinates) -> Self {
        Self { start, end }
    }

    /// Creates the box occupied by something of size `dims` whose minimum corner is `origin`.
    pub fn from_origin(origin: Coordinates, dims: Coordinates) -> Self {
        Self {
            start: origin,
            end: origin + dims,
        }
    }

    /// The full interior of a container with the given extent.
    pub fn container_box(extent: Coordinates) -> Self {
        Self::from_origin(Coordinates::zeros(), extent)
    }

    /// Size of the box along every axis.
    pub fn dimensions(&self) -> Coordinates {
        self.end - self.start
    }

    /// Start coordinate on one axis.
    pub fn start_on(&self, axis: Axis) -> i32 {
        self.start[axis.index()]
    }

    /// End coordinate on one axis.
    pub fn end_on(&self, axis: Axis) -> i32 {
        self.end[axis.index()]
    }

    /// Enclosed volume.
    pub fn volume(&self) -> i64 {
        let d = self.dimensions();
        d.x as i64 * d.y as i64 * d.z as i64
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})-({}, {}, {})",
            self.start.x, self.start.y, self.start.z, self.end.x, self.end.y, self.end.z
        )
    }
}

/// True iff `inner` lies entirely within `outer` on every axis, boundaries included.
pub fn contains(outer: &Position, inner: &Position) -> bool {
    Axis::ALL.iter().all(|&axis| {
        outer.start_on(axis) <= inner.start_on(axis) && inner.end_on(axis) <= outer.end_on(axis)
    })
}

/// Strict interval overlap of two boxes on a single axis.
pub fn overlaps_on(a: &Position, b: &Position, axis: Axis) -> bool {
    a.end_on(axis) > b.start_on(axis) && a.start_on(axis) < b.end_on(axis)
}

/// True iff the boxes share interior volume.
///
/// Boxes that only touch at a face, edge or corner do not overlap.
pub fn overlaps(a: &Position, b: &Position) -> bool {
    Axis::ALL.iter().all(|&axis| overlaps_on(a, b, axis))
}
