//! A chunked 3D spatial index with two-level pathfinding.
//!
//! The world is split into fixed-size [`chunk::Chunk`]s of cells. Each chunk owns a
//! [`graph::LocalPathGraph`] for searches inside it, and cross-chunk routes are found
//! on a coarse chunk-level graph and then stitched together through border cells.
use std::cmp::Ordering;
use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

#[macro_use]
mod macros;

mod astar;
pub mod cell;
pub mod chunk;
mod chunk_graph;
pub mod dir;
pub mod entity;
pub mod error;
pub mod graph;
pub mod index;
mod los;
pub mod neighbor;
pub mod path;
mod pathfind;
pub mod world;

pub mod prelude {
    pub use crate::cell::Cell;
    pub use crate::chunk::{Chunk, SharedChunk};
    pub use crate::dir::Dir;
    pub use crate::entity::{
        Body, Entity, EntityDirectory, EntityId, EntityRef, MoveOutcome, WorldPosition,
    };
    pub use crate::error::WorldError;
    pub use crate::graph::LocalPathGraph;
    pub use crate::index::{WorldIndex, WorldSettings, WorldSettingsBuilder};
    pub use crate::neighbor::*;
    pub use crate::path::Path;
    pub use crate::world::World;
    pub use bevy::math::{IVec3, UVec3};
}

pub type NodeId = usize;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

pub(crate) struct SmallestCostHolder<Id> {
    estimated_cost: Id,
    cost: Id,
    index: usize,
}

impl<Id: PartialEq> PartialEq for SmallestCostHolder<Id> {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost.eq(&other.estimated_cost)
            && self.cost.eq(&other.cost)
            && self.index == other.index
    }
}

impl<Id: Eq> Eq for SmallestCostHolder<Id> {}

impl<Id: Ord> PartialOrd for SmallestCostHolder<Id> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Id: Ord> Ord for SmallestCostHolder<Id> {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.estimated_cost.cmp(&self.estimated_cost) {
            Ordering::Equal => match self.cost.cmp(&other.cost) {
                Ordering::Equal => other.index.cmp(&self.index),
                s => s,
            },
            s => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn test_smallest_cost_holder_order() {
        let mut heap = BinaryHeap::new();
        heap.push(SmallestCostHolder {
            estimated_cost: 5u32,
            cost: 1,
            index: 0,
        });
        heap.push(SmallestCostHolder {
            estimated_cost: 3u32,
            cost: 1,
            index: 1,
        });
        heap.push(SmallestCostHolder {
            estimated_cost: 3u32,
            cost: 2,
            index: 2,
        });
        heap.push(SmallestCostHolder {
            estimated_cost: 3u32,
            cost: 2,
            index: 3,
        });

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|h| h.index)).collect();
        assert_eq!(order, vec![2, 3, 1, 0]);
    }
}
