//! Entities and the directory that keeps track of where they stand.
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::{
    log,
    math::{IVec3, UVec3},
};
use slab::Slab;

use crate::{error::WorldError, index::WorldIndex};

/// Anything that can occupy a cell.
pub trait Entity: Send + Sync + Debug {
    fn blocks_movement(&self) -> bool;
    fn blocks_sight(&self) -> bool;
}

/// Handle issued by [`EntityDirectory::spawn`].
///
/// Ids of despawned entities are reused by later spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    pub(crate) fn from_raw(id: usize) -> Self {
        EntityId(id)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// An entity as stored in a cell: its id and the shared entity itself.
/// Two refs are equal when their ids are.
#[derive(Clone, Debug)]
pub struct EntityRef {
    id: EntityId,
    entity: Arc<dyn Entity>,
}

impl EntityRef {
    pub fn new(id: EntityId, entity: Arc<dyn Entity>) -> Self {
        EntityRef { id, entity }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity(&self) -> &Arc<dyn Entity> {
        &self.entity
    }

    pub fn blocks_movement(&self) -> bool {
        self.entity.blocks_movement()
    }

    pub fn blocks_sight(&self) -> bool {
        self.entity.blocks_sight()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityRef {}

/// A plain entity with fixed blocking flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Body {
    pub blocks_movement: bool,
    pub blocks_sight: bool,
}

impl Body {
    pub fn new(blocks_movement: bool, blocks_sight: bool) -> Self {
        Body {
            blocks_movement,
            blocks_sight,
        }
    }

    /// Blocks both movement and sight, like a wall.
    pub fn solid() -> Self {
        Self::new(true, true)
    }

    /// Blocks nothing, like an item on the floor.
    pub fn walkable() -> Self {
        Self::new(false, false)
    }
}

impl Entity for Body {
    fn blocks_movement(&self) -> bool {
        self.blocks_movement
    }

    fn blocks_sight(&self) -> bool {
        self.blocks_sight
    }
}

/// Where something stands, in every coordinate space at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldPosition {
    pub chunk: IVec3,
    pub local: UVec3,
    pub global: IVec3,
}

/// Result of [`EntityDirectory::try_move`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: bool,
    /// The occupants of the destination that block movement, when the move was refused.
    pub blockers: Vec<EntityRef>,
}

impl MoveOutcome {
    fn moved() -> Self {
        MoveOutcome {
            moved: true,
            blockers: Vec::new(),
        }
    }

    fn blocked(blockers: Vec<EntityRef>) -> Self {
        MoveOutcome {
            moved: false,
            blockers,
        }
    }
}

#[derive(Debug)]
struct EntityRecord {
    entity: EntityRef,
    position: WorldPosition,
}

/// Tracks the position of every spawned entity and keeps cell occupancy in
/// step with it.
///
/// Operations hold the directory lock for their whole duration and take chunk
/// locks one at a time underneath it.
#[derive(Debug, Default)]
pub struct EntityDirectory {
    records: Mutex<Slab<EntityRecord>>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places an entity at a global position and starts tracking it.
    ///
    /// Placement is not checked against blockers.
    pub fn spawn(
        &self,
        index: &WorldIndex,
        entity: Arc<dyn Entity>,
        global: IVec3,
    ) -> Result<EntityId, WorldError> {
        let position = index.resolve(global)?;

        let mut records = self.records();
        let slot = records.vacant_entry();
        let entity = EntityRef::new(EntityId(slot.key()), entity);

        index.with_chunk(position.chunk, |chunk| {
            chunk
                .cell_mut(position.local)
                .map(|cell| cell.add_occupant(entity.clone()))
        })??;

        let id = entity.id();
        slot.insert(EntityRecord { entity, position });
        log::debug!("Spawned {:?} at {}", id, global);

        Ok(id)
    }

    /// Removes an entity from its cell and stops tracking it.
    pub fn despawn(&self, index: &WorldIndex, id: EntityId) -> Result<EntityRef, WorldError> {
        let mut records = self.records();
        let position = records
            .get(id.0)
            .ok_or(WorldError::EntityNotFound(id))?
            .position;

        index.with_chunk(position.chunk, |chunk| {
            chunk
                .cell_mut(position.local)
                .map(|cell| cell.remove_occupant(id))
        })??;

        Ok(records.remove(id.0).entity)
    }

    pub fn position(&self, id: EntityId) -> Result<WorldPosition, WorldError> {
        self.records()
            .get(id.0)
            .map(|record| record.position)
            .ok_or(WorldError::EntityNotFound(id))
    }

    pub fn entity(&self, id: EntityId) -> Result<EntityRef, WorldError> {
        self.records()
            .get(id.0)
            .map(|record| record.entity.clone())
            .ok_or(WorldError::EntityNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Moves an entity by `offset` unless the destination cell blocks movement.
    ///
    /// `from` must be where the directory has the entity, otherwise
    /// [`WorldError::PositionMismatch`] is returned. A refused move leaves
    /// everything untouched and reports the blocking occupants.
    pub fn try_move(
        &self,
        index: &WorldIndex,
        id: EntityId,
        from: IVec3,
        offset: IVec3,
    ) -> Result<MoveOutcome, WorldError> {
        let mut records = self.records();
        let record = records.get_mut(id.0).ok_or(WorldError::EntityNotFound(id))?;

        if record.position.global != from {
            return Err(WorldError::PositionMismatch {
                expected: from,
                actual: record.position.global,
            });
        }

        if offset == IVec3::ZERO {
            return Ok(MoveOutcome::moved());
        }

        let source = record.position;
        let target = index.resolve(from + offset)?;
        let entity = record.entity.clone();

        let blockers = index.with_chunk(target.chunk, |chunk| {
            let cell = chunk.cell_mut(target.local)?;
            let blockers = cell.blockers();
            if blockers.is_empty() {
                cell.add_occupant(entity);
            }
            Ok::<_, WorldError>(blockers)
        })??;

        if !blockers.is_empty() {
            log::debug!(
                "{:?} blocked moving to {} by {} entities",
                id,
                target.global,
                blockers.len()
            );
            return Ok(MoveOutcome::blocked(blockers));
        }

        index.with_chunk(source.chunk, |chunk| {
            chunk
                .cell_mut(source.local)
                .map(|cell| cell.remove_occupant(id))
        })??;

        record.position = target;
        Ok(MoveOutcome::moved())
    }

    /// Moves an entity to `global` without checking for blockers.
    pub fn teleport(
        &self,
        index: &WorldIndex,
        id: EntityId,
        global: IVec3,
    ) -> Result<WorldPosition, WorldError> {
        let mut records = self.records();
        let record = records.get_mut(id.0).ok_or(WorldError::EntityNotFound(id))?;

        let source = record.position;
        let target = index.resolve(global)?;
        if source == target {
            return Ok(target);
        }

        index.with_chunk(source.chunk, |chunk| {
            chunk
                .cell_mut(source.local)
                .map(|cell| cell.remove_occupant(id))
        })??;

        let entity = record.entity.clone();
        index.with_chunk(target.chunk, |chunk| {
            chunk
                .cell_mut(target.local)
                .map(|cell| cell.add_occupant(entity))
        })??;

        record.position = target;
        Ok(target)
    }

    /// The entities in the cell at `offset` from an entity's position.
    pub fn entities_relative(
        &self,
        index: &WorldIndex,
        id: EntityId,
        offset: IVec3,
    ) -> Result<Vec<EntityRef>, WorldError> {
        let position = self.position(id)?;
        index.entities_at(position.global + offset)
    }

    fn records(&self) -> MutexGuard<'_, Slab<EntityRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::WorldSettingsBuilder;

    fn setup() -> (WorldIndex, EntityDirectory) {
        let index = WorldIndex::new(&WorldSettingsBuilder::cubic(4).build());
        index.create_region(IVec3::new(-1, 0, 0), IVec3::new(1, 0, 0)).unwrap();
        (index, EntityDirectory::new())
    }

    fn ids(entities: &[EntityRef]) -> Vec<EntityId> {
        entities.iter().map(EntityRef::id).collect()
    }

    #[test]
    fn test_spawn_tracks_position() {
        let (index, directory) = setup();

        let id = directory
            .spawn(&index, Arc::new(Body::solid()), IVec3::new(-2, 1, 3))
            .unwrap();

        let position = directory.position(id).unwrap();
        assert_eq!(position.chunk, IVec3::new(-1, 0, 0));
        assert_eq!(position.local, UVec3::new(2, 1, 3));
        assert_eq!(ids(&index.entities_at(IVec3::new(-2, 1, 3)).unwrap()), vec![id]);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_spawn_outside_chunks_fails() {
        let (index, directory) = setup();

        assert_eq!(
            directory
                .spawn(&index, Arc::new(Body::solid()), IVec3::new(0, 4, 0))
                .unwrap_err(),
            WorldError::ChunkNotFound(IVec3::new(0, 1, 0))
        );
        assert!(directory.is_empty());
    }

    #[test]
    fn test_move_into_free_cell() {
        let (index, directory) = setup();
        let id = directory.spawn(&index, Arc::new(Body::solid()), IVec3::new(3, 0, 0)).unwrap();

        let outcome = directory
            .try_move(&index, id, IVec3::new(3, 0, 0), IVec3::X)
            .unwrap();

        assert!(outcome.moved);
        assert!(outcome.blockers.is_empty());
        assert_eq!(directory.position(id).unwrap().global, IVec3::new(4, 0, 0));
        assert_eq!(directory.position(id).unwrap().chunk, IVec3::X);
        assert!(index.entities_at(IVec3::new(3, 0, 0)).unwrap().is_empty());
        assert_eq!(ids(&index.entities_at(IVec3::new(4, 0, 0)).unwrap()), vec![id]);
    }

    #[test]
    fn test_move_blocked_reports_only_blockers() {
        let (index, directory) = setup();
        let mover = directory.spawn(&index, Arc::new(Body::solid()), IVec3::ZERO).unwrap();
        let rock = directory.spawn(&index, Arc::new(Body::solid()), IVec3::X).unwrap();
        directory.spawn(&index, Arc::new(Body::walkable()), IVec3::X).unwrap();
        let wall = directory.spawn(&index, Arc::new(Body::new(true, false)), IVec3::X).unwrap();

        let outcome = directory.try_move(&index, mover, IVec3::ZERO, IVec3::X).unwrap();

        assert!(!outcome.moved);
        assert_eq!(ids(&outcome.blockers), vec![rock, wall]);
        assert_eq!(directory.position(mover).unwrap().global, IVec3::ZERO);
        assert_eq!(ids(&index.entities_at(IVec3::ZERO).unwrap()), vec![mover]);
        assert_eq!(index.entities_at(IVec3::X).unwrap().len(), 3);
    }

    #[test]
    fn test_move_onto_walkable_occupant() {
        let (index, directory) = setup();
        let mover = directory.spawn(&index, Arc::new(Body::solid()), IVec3::ZERO).unwrap();
        let item = directory.spawn(&index, Arc::new(Body::walkable()), IVec3::Y).unwrap();

        assert!(directory.try_move(&index, mover, IVec3::ZERO, IVec3::Y).unwrap().moved);
        assert_eq!(ids(&index.entities_at(IVec3::Y).unwrap()), vec![item, mover]);
    }

    #[test]
    fn test_move_position_mismatch() {
        let (index, directory) = setup();
        let id = directory.spawn(&index, Arc::new(Body::solid()), IVec3::ZERO).unwrap();

        assert_eq!(
            directory.try_move(&index, id, IVec3::Y, IVec3::X).unwrap_err(),
            WorldError::PositionMismatch {
                expected: IVec3::Y,
                actual: IVec3::ZERO,
            }
        );
    }

    #[test]
    fn test_move_into_missing_chunk_leaves_state() {
        let (index, directory) = setup();
        let id = directory.spawn(&index, Arc::new(Body::solid()), IVec3::new(1, 3, 0)).unwrap();

        assert_eq!(
            directory.try_move(&index, id, IVec3::new(1, 3, 0), IVec3::Y).unwrap_err(),
            WorldError::ChunkNotFound(IVec3::new(0, 1, 0))
        );
        assert_eq!(directory.position(id).unwrap().global, IVec3::new(1, 3, 0));
        assert_eq!(index.entities_at(IVec3::new(1, 3, 0)).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_offset_is_noop() {
        let (index, directory) = setup();
        let id = directory.spawn(&index, Arc::new(Body::solid()), IVec3::ZERO).unwrap();

        let outcome = directory.try_move(&index, id, IVec3::ZERO, IVec3::ZERO).unwrap();

        assert!(outcome.moved);
        assert_eq!(index.entities_at(IVec3::ZERO).unwrap().len(), 1);
    }

    #[test]
    fn test_despawn_frees_cell_and_id() {
        let (index, directory) = setup();
        let id = directory.spawn(&index, Arc::new(Body::solid()), IVec3::ZERO).unwrap();

        let removed = directory.despawn(&index, id).unwrap();

        assert_eq!(removed.id(), id);
        assert!(index.entities_at(IVec3::ZERO).unwrap().is_empty());
        assert_eq!(directory.position(id).unwrap_err(), WorldError::EntityNotFound(id));
        assert_eq!(
            directory.despawn(&index, id).unwrap_err(),
            WorldError::EntityNotFound(id)
        );

        let reused = directory.spawn(&index, Arc::new(Body::walkable()), IVec3::ONE).unwrap();
        assert_eq!(reused, id);
    }

    #[test]
    fn test_teleport_ignores_blockers() {
        let (index, directory) = setup();
        let id = directory.spawn(&index, Arc::new(Body::solid()), IVec3::ZERO).unwrap();
        directory.spawn(&index, Arc::new(Body::solid()), IVec3::new(-3, 2, 2)).unwrap();

        let position = directory.teleport(&index, id, IVec3::new(-3, 2, 2)).unwrap();

        assert_eq!(position.chunk, IVec3::NEG_X);
        assert!(index.entities_at(IVec3::ZERO).unwrap().is_empty());
        assert_eq!(index.entities_at(IVec3::new(-3, 2, 2)).unwrap().len(), 2);
        assert!(directory.teleport(&index, id, IVec3::new(0, 0, 9)).is_err());
        assert_eq!(directory.position(id).unwrap(), position);
    }

    #[test]
    fn test_entities_relative() {
        let (index, directory) = setup();
        let id = directory
            .spawn(&index, Arc::new(Body::solid()), IVec3::new(3, 3, 3))
            .unwrap();
        let other = directory
            .spawn(&index, Arc::new(Body::walkable()), IVec3::new(4, 3, 3))
            .unwrap();

        let found = directory.entities_relative(&index, id, IVec3::X).unwrap();

        assert_eq!(ids(&found), vec![other]);
        assert_eq!(ids(&directory.entities_relative(&index, id, IVec3::ZERO).unwrap()), vec![id]);
    }
}
