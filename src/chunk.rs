//! This module defines the `Chunk` struct, a fixed-size block of cells.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::{
    log,
    math::{IVec3, UVec3},
};
use ndarray::Array3;

use crate::{
    cell::Cell,
    dir::{Dir, FACES, FACE_COUNT},
    entity::EntityRef,
    error::WorldError,
    graph::LocalPathGraph,
    path::Path,
};

/// A registered chunk. The mutex guards occupancy and local searches together.
pub type SharedChunk = Arc<Mutex<Chunk>>;

/// Locks a shared chunk. A poisoned lock is recovered since no chunk
/// mutation in this crate can panic halfway through.
pub(crate) fn lock(chunk: &SharedChunk) -> MutexGuard<'_, Chunk> {
    chunk.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A chunk owns a dense block of cells, the navigation graph over them, and the
/// list of cells on each of its six faces.
#[derive(Debug)]
pub struct Chunk {
    coord: IVec3,
    size: UVec3,
    cells: Array3<Cell>,
    graph: LocalPathGraph,
    borders: [Vec<UVec3>; FACE_COUNT],
}

impl Chunk {
    /// Builds an empty chunk at a chunk coordinate.
    /// Every component of `size` must be at least 1.
    pub fn new(coord: IVec3, size: UVec3) -> Self {
        let cells = Array3::from_shape_fn(
            (size.x as usize, size.y as usize, size.z as usize),
            |_| Cell::new(),
        );
        let graph = LocalPathGraph::new(size);
        let borders = FACES.map(|dir| border_cells(&graph, size, dir));

        log::debug!("Chunk @ {} was initialised", coord);

        Chunk {
            coord,
            size,
            cells,
            graph,
            borders,
        }
    }

    /// The chunk's coordinate in chunk space.
    pub fn coord(&self) -> IVec3 {
        self.coord
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Global position of local cell `(0, 0, 0)`. Wraps around for chunks
    /// built at coordinates a [`crate::index::WorldIndex`] would refuse.
    pub fn origin(&self) -> IVec3 {
        self.coord.wrapping_mul(self.size.as_ivec3())
    }

    pub fn to_global(&self, local: UVec3) -> IVec3 {
        self.origin().wrapping_add(local.as_ivec3())
    }

    pub fn contains_local(&self, local: UVec3) -> bool {
        local.cmplt(self.size).all()
    }

    pub fn graph(&self) -> &LocalPathGraph {
        &self.graph
    }

    pub fn cell(&self, local: UVec3) -> Result<&Cell, WorldError> {
        if !self.contains_local(local) {
            return Err(self.out_of_bounds(local));
        }

        Ok(&self.cells[[local.x as usize, local.y as usize, local.z as usize]])
    }

    pub fn cell_mut(&mut self, local: UVec3) -> Result<&mut Cell, WorldError> {
        if !self.contains_local(local) {
            return Err(self.out_of_bounds(local));
        }

        Ok(&mut self.cells[[local.x as usize, local.y as usize, local.z as usize]])
    }

    /// Snapshot of the entities occupying a cell.
    pub fn entities(&self, local: UVec3) -> Result<Vec<EntityRef>, WorldError> {
        Ok(self.cell(local)?.occupants().to_vec())
    }

    /// True if the cell exists and nothing in it blocks movement.
    pub fn is_passable(&self, local: UVec3) -> bool {
        self.cell(local).is_ok_and(Cell::is_passable)
    }

    /// Every cell on the given face, whether blocked or not, in node id order.
    pub fn border_cells(&self, dir: Dir) -> &[UVec3] {
        &self.borders[dir.index()]
    }

    /// The cells on the given face that can currently be entered.
    pub fn open_border_cells(&self, dir: Dir) -> impl Iterator<Item = UVec3> + '_ {
        self.border_cells(dir)
            .iter()
            .copied()
            .filter(|&local| self.is_passable(local))
    }

    /// Number of entities across all cells of the chunk.
    pub fn occupant_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.occupants().len()).sum()
    }

    /// Searches this chunk's graph, treating cells that block movement as walls.
    pub fn find_path(&self, start: UVec3, goal: UVec3) -> Option<Path<UVec3>> {
        self.graph
            .find_path(start, goal, |local| self.is_passable(local))
    }

    fn out_of_bounds(&self, local: UVec3) -> WorldError {
        WorldError::OutOfBounds {
            global: self.to_global(local),
            local: local.as_ivec3(),
            size: self.size,
        }
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for Chunk {}

/// The cell on the far side of a face, in the neighbouring chunk's local space.
pub fn mirror_across(size: UVec3, local: UVec3, dir: Dir) -> UVec3 {
    let mut mirrored = local;
    mirrored[dir.fixed_axis()] = if dir.is_positive() {
        0
    } else {
        size[dir.fixed_axis()] - 1
    };
    mirrored
}

fn border_cells(graph: &LocalPathGraph, size: UVec3, dir: Dir) -> Vec<UVec3> {
    let axis = dir.fixed_axis();
    let layer = if dir.is_positive() { size[axis] - 1 } else { 0 };

    (0..graph.node_count())
        .filter_map(|id| graph.node_pos(id))
        .filter(|pos| pos[axis] == layer)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Body, EntityId};

    fn solid(id: usize) -> EntityRef {
        EntityRef::new(EntityId::from_raw(id), Arc::new(Body::solid()))
    }

    #[test]
    fn test_chunk_shape() {
        let chunk = Chunk::new(IVec3::new(-1, 2, 0), UVec3::new(4, 3, 2));

        assert_eq!(chunk.origin(), IVec3::new(-4, 6, 0));
        assert_eq!(chunk.to_global(UVec3::new(3, 2, 1)), IVec3::new(-1, 8, 1));
        assert_eq!(chunk.graph().node_count(), 24);
        assert!(chunk.cell(UVec3::new(3, 2, 1)).is_ok());
    }

    #[test]
    fn test_cell_out_of_bounds() {
        let chunk = Chunk::new(IVec3::new(1, 0, 0), UVec3::new(4, 4, 4));

        assert_eq!(
            chunk.cell(UVec3::new(4, 0, 0)).unwrap_err(),
            WorldError::OutOfBounds {
                global: IVec3::new(8, 0, 0),
                local: IVec3::new(4, 0, 0),
                size: UVec3::new(4, 4, 4),
            }
        );
        assert!(!chunk.is_passable(UVec3::new(0, 9, 0)));
    }

    #[test]
    fn test_border_cells() {
        let chunk = Chunk::new(IVec3::ZERO, UVec3::new(4, 3, 2));

        assert_eq!(chunk.border_cells(Dir::East).len(), 3 * 2);
        assert_eq!(chunk.border_cells(Dir::North).len(), 4 * 2);
        assert_eq!(chunk.border_cells(Dir::Up).len(), 4 * 3);
        assert!(chunk.border_cells(Dir::East).iter().all(|pos| pos.x == 3));
        assert!(chunk.border_cells(Dir::West).iter().all(|pos| pos.x == 0));
        assert!(chunk.border_cells(Dir::Down).iter().all(|pos| pos.z == 0));
        assert_eq!(chunk.border_cells(Dir::South)[0], UVec3::new(0, 0, 0));
    }

    #[test]
    fn test_open_border_cells_skip_blocked() {
        let mut chunk = Chunk::new(IVec3::ZERO, UVec3::new(2, 2, 1));
        chunk.cell_mut(UVec3::new(1, 0, 0)).unwrap().add_occupant(solid(0));

        let open: Vec<_> = chunk.open_border_cells(Dir::East).collect();
        assert_eq!(open, vec![UVec3::new(1, 1, 0)]);
    }

    #[test]
    fn test_occupant_count() {
        let mut chunk = Chunk::new(IVec3::ZERO, UVec3::new(2, 2, 2));
        assert_eq!(chunk.occupant_count(), 0);

        chunk.cell_mut(UVec3::new(0, 0, 0)).unwrap().add_occupant(solid(0));
        chunk.cell_mut(UVec3::new(0, 0, 0)).unwrap().add_occupant(solid(1));
        chunk.cell_mut(UVec3::new(1, 1, 1)).unwrap().add_occupant(solid(2));
        assert_eq!(chunk.occupant_count(), 3);

        chunk.cell_mut(UVec3::new(0, 0, 0)).unwrap().remove_occupant(EntityId::from_raw(1));
        assert_eq!(chunk.occupant_count(), 2);
    }

    #[test]
    fn test_far_chunk_origin_does_not_overflow() {
        let chunk = Chunk::new(IVec3::new(i32::MAX, 0, 0), UVec3::new(2, 1, 1));

        assert_eq!(chunk.origin().x, i32::MAX.wrapping_mul(2));
        assert!(chunk.cell(UVec3::new(2, 0, 0)).is_err());
    }

    #[test]
    fn test_mirror_across() {
        let size = UVec3::new(4, 4, 4);

        assert_eq!(mirror_across(size, UVec3::new(3, 1, 2), Dir::East), UVec3::new(0, 1, 2));
        assert_eq!(mirror_across(size, UVec3::new(0, 1, 2), Dir::West), UVec3::new(3, 1, 2));
        assert_eq!(mirror_across(size, UVec3::new(1, 1, 3), Dir::Up), UVec3::new(1, 1, 0));
    }

    #[test]
    fn test_find_path_routes_around_occupant() {
        let mut chunk = Chunk::new(IVec3::ZERO, UVec3::new(4, 4, 4));
        chunk.cell_mut(UVec3::new(1, 0, 0)).unwrap().add_occupant(solid(0));

        let path = chunk.find_path(UVec3::ZERO, UVec3::new(2, 0, 0)).unwrap();

        assert_eq!(path.len(), 3);
        assert!(!path.is_position_in_path(UVec3::new(1, 0, 0)));

        chunk.cell_mut(UVec3::new(1, 0, 0)).unwrap().remove_occupant(EntityId::from_raw(0));
        let path = chunk.find_path(UVec3::ZERO, UVec3::new(2, 0, 0)).unwrap();
        assert!(path.is_position_in_path(UVec3::new(1, 0, 0)));
    }
}
