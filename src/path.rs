//! This module defines the `Path` returned by every search.
use bevy::math::{IVec3, UVec3};

use crate::neighbor::{MovementCost, Neighborhood, OrdinalNeighborhood3d};

/// The ordered cells of a search result, start and goal included, and the
/// movement cost of walking it.
///
/// World-level queries return `Path<IVec3>` in global coordinates. A chunk's
/// local search returns `Path<UVec3>` in that chunk's local coordinates.
/// An empty path means no route exists.
#[derive(Debug, Clone)]
pub struct Path<P = IVec3> {
    pub(crate) path: Vec<P>,
    cost: MovementCost,
}

impl<P: Copy + PartialEq> Path<P> {
    /// Create a new path from a vector of positions
    /// # Arguments
    /// * `path` - The positions, start first
    /// * `cost` - The total movement cost of the path
    ///
    pub fn new(path: Vec<P>, cost: MovementCost) -> Self {
        Path { path, cost }
    }

    /// The empty path, meaning "no route".
    pub fn empty() -> Self {
        Path {
            path: Vec::new(),
            cost: 0,
        }
    }

    /// Returns true if the path contains the given position
    pub fn is_position_in_path(&self, pos: P) -> bool {
        self.path.contains(&pos)
    }

    /// Returns the path as a slice of positions.
    pub fn path(&self) -> &[P] {
        &self.path
    }

    /// Returns the movement cost of the path
    pub fn cost(&self) -> MovementCost {
        self.cost
    }

    /// Returns the length of the path
    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// Returns true if the path is empty
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn first(&self) -> Option<P> {
        self.path.first().copied()
    }

    pub fn last(&self) -> Option<P> {
        self.path.last().copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, P> {
        self.path.iter()
    }
}

impl Path<UVec3> {
    /// Shifts a local path into global space given the chunk's origin cell.
    pub(crate) fn to_global(&self, origin: IVec3) -> Path<IVec3> {
        Path {
            path: self.path.iter().map(|pos| origin + pos.as_ivec3()).collect(),
            cost: self.cost,
        }
    }
}

impl Path<IVec3> {
    /// Appends `other`. A first cell repeating our last one is dropped,
    /// otherwise the step joining the two paths is added to the cost.
    pub(crate) fn extend(&mut self, other: Path<IVec3>) {
        let mut skip = 0;
        if let (Some(&last), Some(&first)) = (self.path.last(), other.path.first()) {
            if last == first {
                skip = 1;
            } else {
                self.cost += OrdinalNeighborhood3d.step_cost(first - last);
            }
        }

        self.path.extend(other.path.into_iter().skip(skip));
        self.cost += other.cost;
    }

    /// True if every consecutive pair of cells differs by at most one on each axis.
    pub fn is_contiguous(&self) -> bool {
        self.path
            .windows(2)
            .all(|pair| (pair[1] - pair[0]).abs().max_element() <= 1)
    }
}

impl<P: PartialEq> PartialEq for Path<P> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl<P: Eq> Eq for Path<P> {}

impl<P> IntoIterator for Path<P> {
    type Item = P;
    type IntoIter = std::vec::IntoIter<P>;

    fn into_iter(self) -> Self::IntoIter {
        self.path.into_iter()
    }
}

impl<'a, P> IntoIterator for &'a Path<P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.path.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_global() {
        let local = Path::new(vec![UVec3::new(0, 0, 0), UVec3::new(1, 0, 0)], 10);
        let global = local.to_global(IVec3::new(-4, 8, 0));

        assert_eq!(global.path(), &[IVec3::new(-4, 8, 0), IVec3::new(-3, 8, 0)]);
        assert_eq!(global.cost(), 10);
    }

    #[test]
    fn test_extend_skips_shared_cell() {
        let mut path = Path::new(vec![IVec3::ZERO, IVec3::X], 10);
        path.extend(Path::new(vec![IVec3::X, IVec3::new(2, 0, 0)], 10));

        assert_eq!(path.len(), 3);
        assert_eq!(path.cost(), 20);
        assert!(path.is_contiguous());
    }

    #[test]
    fn test_extend_adds_joining_step() {
        let mut path = Path::new(vec![IVec3::ZERO, IVec3::X], 10);
        path.extend(Path::new(vec![IVec3::new(2, 1, 0), IVec3::new(3, 1, 0)], 10));

        assert_eq!(path.len(), 4);
        assert_eq!(path.cost(), 10 + 14 + 10);

        let mut empty = Path::empty();
        empty.extend(Path::new(vec![IVec3::ZERO], 0));
        assert_eq!(empty.cost(), 0);
    }

    #[test]
    fn test_is_contiguous() {
        let path = Path::new(vec![IVec3::ZERO, IVec3::new(1, 1, 1), IVec3::new(2, 1, 0)], 34);
        assert!(path.is_contiguous());

        let path = Path::new(vec![IVec3::ZERO, IVec3::new(2, 0, 0)], 20);
        assert!(!path.is_contiguous());

        assert!(Path::<IVec3>::empty().is_contiguous());
    }
}
