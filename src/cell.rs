//! `Cell` holds the entities standing on one grid position.
use smallvec::SmallVec;

use crate::entity::{EntityId, EntityRef};

/// One grid unit of a chunk.
///
/// Occupants keep their arrival order. The blocking flags are derived from the
/// current occupants every time they are read, so they can never drift from
/// the occupant list.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    occupants: SmallVec<[EntityRef; 2]>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entities in the cell, in arrival order.
    pub fn occupants(&self) -> &[EntityRef] {
        &self.occupants
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.occupants.iter().any(|occupant| occupant.id() == id)
    }

    /// Adds an occupant at the end of the list.
    /// Returns false and leaves the cell unchanged if the entity is already here.
    pub fn add_occupant(&mut self, entity: EntityRef) -> bool {
        if self.contains(entity.id()) {
            return false;
        }

        self.occupants.push(entity);
        true
    }

    /// Removes an occupant, keeping the order of the others.
    /// Returns `None` if the entity isn't in this cell.
    pub fn remove_occupant(&mut self, id: EntityId) -> Option<EntityRef> {
        let index = self.occupants.iter().position(|occupant| occupant.id() == id)?;
        Some(self.occupants.remove(index))
    }

    /// True if any occupant blocks movement.
    pub fn blocks_movement(&self) -> bool {
        self.occupants.iter().any(EntityRef::blocks_movement)
    }

    /// True if any occupant blocks sight.
    pub fn blocks_sight(&self) -> bool {
        self.occupants.iter().any(EntityRef::blocks_sight)
    }

    pub fn is_passable(&self) -> bool {
        !self.blocks_movement()
    }

    /// The occupants that block movement, in arrival order.
    pub fn blockers(&self) -> Vec<EntityRef> {
        self.occupants
            .iter()
            .filter(|occupant| occupant.blocks_movement())
            .cloned()
            .collect()
    }
}
