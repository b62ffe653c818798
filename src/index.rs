//! This module contains the `WorldIndex`, the registry of every chunk in a world.
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bevy::{
    log,
    math::{I64Vec3, IVec3, UVec3},
};
use rustc_hash::FxHashMap;

use crate::{
    chunk::{self, Chunk, SharedChunk},
    entity::{EntityRef, WorldPosition},
    error::WorldError,
    los::line_of_sight,
    path::Path,
    pathfind::pathfind,
};

/// World configuration. Fixed when the world is built.
/// Use [`WorldSettingsBuilder`] to create one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorldSettings {
    chunk_size: UVec3,
    coarse_heuristic_weight: u32,
    stitch_attempts: usize,
}

impl WorldSettings {
    /// Number of cells along each axis of every chunk.
    pub fn chunk_size(&self) -> UVec3 {
        self.chunk_size
    }

    /// Multiplier on the Manhattan heuristic of the chunk-level search.
    pub fn coarse_heuristic_weight(&self) -> u32 {
        self.coarse_heuristic_weight
    }

    /// How many exit cells are tried per chunk crossing before a path query gives up.
    pub fn stitch_attempts(&self) -> usize {
        self.stitch_attempts
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        WorldSettingsBuilder::default().build()
    }
}

/// Builder for [`WorldSettings`].
///
/// Example usage:
/// ```
/// use chunk_nav::prelude::*;
///
/// let settings = WorldSettingsBuilder::new(UVec3::new(16, 16, 4))
///     .coarse_heuristic_weight(2)
///     .stitch_attempts(5)
///     .build();
///
/// let world = World::new(&settings);
/// assert_eq!(world.index().chunk_size(), UVec3::new(16, 16, 4));
/// ```
#[derive(Copy, Clone, Debug)]
pub struct WorldSettingsBuilder {
    chunk_size: UVec3,
    coarse_heuristic_weight: u32,
    stitch_attempts: usize,
}

impl Default for WorldSettingsBuilder {
    fn default() -> Self {
        WorldSettingsBuilder {
            chunk_size: UVec3::new(16, 16, 16),
            coarse_heuristic_weight: 1,
            stitch_attempts: 3,
        }
    }
}

impl WorldSettingsBuilder {
    /// Start from a chunk size. Every component must be at least 1.
    pub fn new(chunk_size: UVec3) -> Self {
        if chunk_size.min_element() < 1 {
            panic!("Chunk size must be at least 1 on every axis");
        }

        WorldSettingsBuilder {
            chunk_size,
            ..Default::default()
        }
    }

    /// Start from cubic chunks of `size` cells per axis.
    pub fn cubic(size: u32) -> Self {
        Self::new(UVec3::splat(size))
    }

    /// Weight applied to the chunk-level heuristic. 1 keeps the coarse route
    /// optimal, larger values trade optimality for fewer expanded chunks.
    pub fn coarse_heuristic_weight(mut self, weight: u32) -> Self {
        if weight < 1 {
            panic!("Coarse heuristic weight must be at least 1");
        }

        self.coarse_heuristic_weight = weight;
        self
    }

    /// Number of ranked exit cells tried at each chunk crossing.
    pub fn stitch_attempts(mut self, attempts: usize) -> Self {
        if attempts < 1 {
            panic!("At least one stitch attempt is required");
        }

        self.stitch_attempts = attempts;
        self
    }

    pub fn build(self) -> WorldSettings {
        WorldSettings {
            chunk_size: self.chunk_size,
            coarse_heuristic_weight: self.coarse_heuristic_weight,
            stitch_attempts: self.stitch_attempts,
        }
    }
}

/// Owns every chunk of a world and answers "which chunk holds this position".
///
/// Registration happens under one write lock, so a coordinate can only ever
/// be claimed once, even by concurrent creators. Each chunk has its own mutex.
#[derive(Debug)]
pub struct WorldIndex {
    settings: WorldSettings,
    chunks: RwLock<FxHashMap<IVec3, SharedChunk>>,
}

impl WorldIndex {
    pub fn new(settings: &WorldSettings) -> Self {
        WorldIndex {
            settings: *settings,
            chunks: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn chunk_size(&self) -> UVec3 {
        self.settings.chunk_size
    }

    /// Builds and registers a chunk.
    ///
    /// Returns [`WorldError::DuplicateChunk`] if the coordinate is already taken and
    /// [`WorldError::ChunkOutOfRange`] if its cells can't be addressed with `i32`.
    pub fn create_chunk(&self, coord: IVec3) -> Result<SharedChunk, WorldError> {
        self.check_vacant(coord)?;

        let chunk = timed!("Built chunk", { Chunk::new(coord, self.chunk_size()) });
        self.register(chunk)
    }

    /// Builds many chunks at once, in parallel with the `parallel` feature,
    /// then registers them one by one. Results are in input order.
    pub fn create_chunks(&self, coords: &[IVec3]) -> Vec<Result<SharedChunk, WorldError>> {
        self.build(coords)
            .into_iter()
            .map(|built| built.and_then(|chunk| self.register(chunk)))
            .collect()
    }

    /// Creates every chunk in the inclusive box `min..=max`.
    ///
    /// All or nothing: if any coordinate in the box is taken or out of range,
    /// the error for the first such coordinate is returned and no chunk is
    /// registered.
    pub fn create_region(&self, min: IVec3, max: IVec3) -> Result<Vec<SharedChunk>, WorldError> {
        let lo = min.min(max);
        let hi = min.max(max);

        let mut coords = Vec::new();
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    coords.push(IVec3::new(x, y, z));
                }
            }
        }

        for &coord in &coords {
            self.check_vacant(coord)?;
        }

        let built = self
            .build(&coords)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let chunks = self.register_all(built)?;

        log::info!("Created {} chunks between {} and {}", chunks.len(), lo, hi);
        Ok(chunks)
    }

    /// Returns the chunk at `coord`, creating it first if needed.
    ///
    /// When two callers race, the chunk built by the first one to register wins
    /// and both get that chunk.
    pub fn get_or_create_chunk(&self, coord: IVec3) -> Result<SharedChunk, WorldError> {
        if let Ok(chunk) = self.chunk_at(coord) {
            return Ok(chunk);
        }
        if !in_range(coord, self.chunk_size()) {
            return Err(WorldError::ChunkOutOfRange(coord));
        }

        let chunk = Chunk::new(coord, self.chunk_size());
        Ok(self
            .write()
            .entry(coord)
            .or_insert_with(|| Arc::new(Mutex::new(chunk)))
            .clone())
    }

    fn check_vacant(&self, coord: IVec3) -> Result<(), WorldError> {
        if !in_range(coord, self.chunk_size()) {
            return Err(WorldError::ChunkOutOfRange(coord));
        }
        if self.contains_chunk(coord) {
            return Err(WorldError::DuplicateChunk(coord));
        }
        Ok(())
    }

    /// Builds a chunk for every coordinate that passes [`Self::check_vacant`].
    fn build(&self, coords: &[IVec3]) -> Vec<Result<Chunk, WorldError>> {
        let size = self.chunk_size();

        timed!("Built chunk batch", {
            #[cfg(feature = "parallel")]
            let iter = coords.par_iter();
            #[cfg(not(feature = "parallel"))]
            let iter = coords.iter();

            iter.map(|&coord| {
                self.check_vacant(coord)
                    .map(|()| Chunk::new(coord, size))
            })
            .collect()
        })
    }

    fn register(&self, chunk: Chunk) -> Result<SharedChunk, WorldError> {
        match self.write().entry(chunk.coord()) {
            Entry::Occupied(entry) => Err(WorldError::DuplicateChunk(*entry.key())),
            Entry::Vacant(entry) => Ok(entry.insert(Arc::new(Mutex::new(chunk))).clone()),
        }
    }

    /// Registers a batch under one write lock, or none of it if any
    /// coordinate was taken in the meantime.
    fn register_all(&self, chunks: Vec<Chunk>) -> Result<Vec<SharedChunk>, WorldError> {
        let mut map = self.write();

        if let Some(taken) = chunks
            .iter()
            .map(Chunk::coord)
            .find(|coord| map.contains_key(coord))
        {
            return Err(WorldError::DuplicateChunk(taken));
        }

        Ok(chunks
            .into_iter()
            .map(|chunk| {
                let coord = chunk.coord();
                let shared = Arc::new(Mutex::new(chunk));
                map.insert(coord, Arc::clone(&shared));
                shared
            })
            .collect())
    }

    /// Looks up a chunk by chunk coordinate.
    pub fn chunk_at(&self, coord: IVec3) -> Result<SharedChunk, WorldError> {
        self.read()
            .get(&coord)
            .cloned()
            .ok_or(WorldError::ChunkNotFound(coord))
    }

    /// Looks up the chunk owning a global position.
    pub fn chunk_containing(&self, global: IVec3) -> Result<SharedChunk, WorldError> {
        self.chunk_at(self.chunk_coord_of(global))
    }

    pub fn contains_chunk(&self, coord: IVec3) -> bool {
        self.read().contains_key(&coord)
    }

    pub fn chunk_count(&self) -> usize {
        self.read().len()
    }

    /// Every registered chunk coordinate, sorted.
    pub fn chunk_coords(&self) -> Vec<IVec3> {
        let mut coords: Vec<IVec3> = self.read().keys().copied().collect();
        coords.sort_unstable_by_key(|coord| coord.to_array());
        coords
    }

    /// Chunk coordinate owning a global position. Rounds towards negative
    /// infinity so `-1` belongs to chunk `-1`, not chunk `0`.
    pub fn chunk_coord_of(&self, global: IVec3) -> IVec3 {
        global.div_euclid(self.chunk_size().as_ivec3())
    }

    /// Converts a global position into the local space of the chunk at `coord`.
    pub fn to_local(&self, coord: IVec3, global: IVec3) -> Result<UVec3, WorldError> {
        let size = self.chunk_size();
        let local = global.as_i64vec3() - coord.as_i64vec3() * size.as_i64vec3();

        if local.cmplt(I64Vec3::ZERO).any() || local.cmpge(size.as_i64vec3()).any() {
            let i32_range = (I64Vec3::splat(i32::MIN.into()), I64Vec3::splat(i32::MAX.into()));
            return Err(WorldError::OutOfBounds {
                global,
                local: local.clamp(i32_range.0, i32_range.1).as_ivec3(),
                size,
            });
        }

        Ok(local.as_uvec3())
    }

    /// Global position of a local cell. Wraps around for coordinates no chunk
    /// can be created at.
    pub fn to_global(&self, coord: IVec3, local: UVec3) -> IVec3 {
        coord
            .wrapping_mul(self.chunk_size().as_ivec3())
            .wrapping_add(local.as_ivec3())
    }

    /// Resolves a global position to its chunk and local cell.
    /// Fails if the owning chunk was never created.
    pub fn resolve(&self, global: IVec3) -> Result<WorldPosition, WorldError> {
        let chunk = self.chunk_coord_of(global);
        if !self.contains_chunk(chunk) {
            return Err(WorldError::ChunkNotFound(chunk));
        }

        let local = self.to_local(chunk, global)?;
        Ok(WorldPosition {
            chunk,
            local,
            global,
        })
    }

    /// Runs `f` with the chunk at `coord` locked.
    pub fn with_chunk<R>(
        &self,
        coord: IVec3,
        f: impl FnOnce(&mut Chunk) -> R,
    ) -> Result<R, WorldError> {
        let chunk = self.chunk_at(coord)?;
        let mut guard = chunk::lock(&chunk);
        Ok(f(&mut guard))
    }

    /// Snapshot of the entities at a global position.
    pub fn entities_at(&self, global: IVec3) -> Result<Vec<EntityRef>, WorldError> {
        let position = self.resolve(global)?;
        self.with_chunk(position.chunk, |chunk| chunk.entities(position.local))?
    }

    pub fn blocks_movement(&self, global: IVec3) -> Result<bool, WorldError> {
        let position = self.resolve(global)?;
        self.with_chunk(position.chunk, |chunk| {
            chunk.cell(position.local).map(|cell| cell.blocks_movement())
        })?
    }

    pub fn blocks_sight(&self, global: IVec3) -> Result<bool, WorldError> {
        let position = self.resolve(global)?;
        self.with_chunk(position.chunk, |chunk| {
            chunk.cell(position.local).map(|cell| cell.blocks_sight())
        })?
    }

    /// Finds a walkable path between two global positions, across chunks if needed.
    ///
    /// The result is empty when no path exists, including when either end lies
    /// in a chunk that was never created.
    pub fn find_path(&self, from: IVec3, to: IVec3) -> Path {
        timed!("Path query", { pathfind(self, from, to) })
    }

    /// True if nothing between the two cells blocks sight. The end cells
    /// themselves are not checked.
    pub fn line_of_sight(&self, from: IVec3, to: IVec3) -> Result<bool, WorldError> {
        line_of_sight(self, from, to)
    }

    fn read(&self) -> RwLockReadGuard<'_, FxHashMap<IVec3, SharedChunk>> {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FxHashMap<IVec3, SharedChunk>> {
        self.chunks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// True if every cell of the chunk at `coord` has a global position that fits in `i32`.
fn in_range(coord: IVec3, size: UVec3) -> bool {
    let first = coord.as_i64vec3() * size.as_i64vec3();
    let last = first + size.as_i64vec3() - I64Vec3::ONE;

    first.min_element() >= i64::from(i32::MIN) && last.max_element() <= i64::from(i32::MAX)
}
