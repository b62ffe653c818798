//! The coarse chunk-level graph used to plan routes between chunks.
use bevy::math::IVec3;
use rustc_hash::FxHashMap;
use slab::Slab;
use smallvec::SmallVec;

use crate::{
    astar::astar,
    neighbor::{CardinalNeighborhood3d, MovementCost, Neighborhood},
    NodeId,
};

/// A created chunk and the face-adjacent created chunks it connects to.
#[derive(Debug, Clone)]
pub(crate) struct ChunkNode {
    pub(crate) coord: IVec3,
    pub(crate) edges: SmallVec<[NodeId; 6]>,
}

/// One node per created chunk inside a box of chunk coordinates.
///
/// Built per query and thrown away afterwards, so it always matches the set
/// of chunks registered when the query started.
#[derive(Debug, Default)]
pub(crate) struct ChunkGraph {
    nodes: Slab<ChunkNode>,
    node_ids: FxHashMap<IVec3, NodeId>,
}

impl ChunkGraph {
    /// Builds the graph over the inclusive box spanned by `a` and `b`.
    /// `exists` reports whether a chunk was created at a coordinate.
    pub(crate) fn build<F>(a: IVec3, b: IVec3, exists: F) -> Self
    where
        F: Fn(IVec3) -> bool,
    {
        let min = a.min(b);
        let max = a.max(b);
        let mut graph = ChunkGraph::default();

        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let coord = IVec3::new(x, y, z);
                    if exists(coord) {
                        graph.add_node(coord);
                    }
                }
            }
        }

        let neighborhood = CardinalNeighborhood3d;
        let ids: Vec<NodeId> = graph.nodes.iter().map(|(id, _)| id).collect();
        for id in ids {
            let coord = graph.nodes[id].coord;
            let edges = neighborhood
                .offsets()
                .iter()
                .filter_map(|&offset| graph.node_ids.get(&(coord + offset)).copied())
                .collect();
            graph.nodes[id].edges = edges;
        }

        graph
    }

    fn add_node(&mut self, coord: IVec3) -> NodeId {
        if let Some(&id) = self.node_ids.get(&coord) {
            return id;
        }

        let id = self.nodes.insert(ChunkNode {
            coord,
            edges: SmallVec::new(),
        });
        self.node_ids.insert(coord, id);
        id
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.nodes.iter().map(|(_, node)| node.edges.len()).sum()
    }

    /// Chunk coordinates from `start` to `goal` inclusive, each face-adjacent to
    /// the next. The Manhattan heuristic is scaled by `weight`.
    pub(crate) fn find_route(&self, start: IVec3, goal: IVec3, weight: u32) -> Option<Vec<IVec3>> {
        let start_id = *self.node_ids.get(&start)?;
        let goal_id = *self.node_ids.get(&goal)?;
        let neighborhood = CardinalNeighborhood3d;

        let path = astar(
            start_id,
            goal_id,
            self.nodes.len(),
            |id: NodeId, out: &mut Vec<(NodeId, MovementCost)>| {
                out.extend(self.nodes[id].edges.iter().map(|&n| (n, 1)));
            },
            |id: NodeId| neighborhood.heuristic(self.nodes[id].coord, goal) * weight,
        )?;

        Some(path.into_iter().map(|id| self.nodes[id].coord).collect())
    }
}
