//! The `World` bundles the chunk index and the entity directory behind one API.
use std::sync::Arc;

use bevy::math::IVec3;

use crate::{
    chunk::SharedChunk,
    entity::{Entity, EntityDirectory, EntityId, EntityRef, MoveOutcome},
    error::WorldError,
    index::{WorldIndex, WorldSettings},
    path::Path,
};

/// A chunked world: chunks, the entities standing in them, and pathfinding.
///
/// Every method takes `&self`, so a `World` can be shared between threads
/// behind an `Arc`.
///
/// Example usage:
/// ```
/// use std::sync::Arc;
/// use chunk_nav::prelude::*;
/// use chunk_nav::entity::Body;
///
/// let world = World::new(&WorldSettingsBuilder::cubic(4).build());
/// world.create_chunk(IVec3::new(0, 0, 0)).unwrap();
/// world.create_chunk(IVec3::new(1, 0, 0)).unwrap();
///
/// let id = world.spawn(Arc::new(Body::solid()), IVec3::new(0, 0, 0)).unwrap();
/// let outcome = world.try_move(id, IVec3::new(0, 0, 0), IVec3::new(1, 0, 0)).unwrap();
/// assert!(outcome.moved);
///
/// let path = world.find_path(IVec3::new(1, 0, 0), IVec3::new(5, 0, 0));
/// assert_eq!(path.len(), 5);
/// ```
#[derive(Debug)]
pub struct World {
    index: WorldIndex,
    entities: EntityDirectory,
}

impl World {
    pub fn new(settings: &WorldSettings) -> Self {
        World {
            index: WorldIndex::new(settings),
            entities: EntityDirectory::new(),
        }
    }

    pub fn index(&self) -> &WorldIndex {
        &self.index
    }

    pub fn entities(&self) -> &EntityDirectory {
        &self.entities
    }

    pub fn create_chunk(&self, coord: IVec3) -> Result<SharedChunk, WorldError> {
        self.index.create_chunk(coord)
    }

    /// Creates every chunk in the inclusive box `min..=max`.
    pub fn create_region(&self, min: IVec3, max: IVec3) -> Result<Vec<SharedChunk>, WorldError> {
        self.index.create_region(min, max)
    }

    pub fn get_entities_at(&self, global: IVec3) -> Result<Vec<EntityRef>, WorldError> {
        self.index.entities_at(global)
    }

    pub fn spawn(&self, entity: Arc<dyn Entity>, global: IVec3) -> Result<EntityId, WorldError> {
        self.entities.spawn(&self.index, entity, global)
    }

    pub fn despawn(&self, id: EntityId) -> Result<EntityRef, WorldError> {
        self.entities.despawn(&self.index, id)
    }

    /// See [`EntityDirectory::try_move`].
    pub fn try_move(
        &self,
        id: EntityId,
        from: IVec3,
        offset: IVec3,
    ) -> Result<MoveOutcome, WorldError> {
        self.entities.try_move(&self.index, id, from, offset)
    }

    /// See [`WorldIndex::find_path`]. Empty when there is no path.
    pub fn find_path(&self, from: IVec3, to: IVec3) -> Path {
        self.index.find_path(from, to)
    }
}
