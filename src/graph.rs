//! `LocalPathGraph`, the cell-level navigation graph of a single chunk.
use bevy::math::{IVec3, UVec3};

use crate::{
    astar::astar,
    neighbor::{MovementCost, Neighborhood, OrdinalNeighborhood3d},
    path::Path,
    NodeId,
};

/// One node per cell, connected to every 26-neighbour inside the chunk.
///
/// Node ids and adjacency follow from the chunk size alone, so nothing is
/// stored per node. Whether an edge can be taken is decided during each
/// search by the traversability predicate passed to
/// [`LocalPathGraph::find_path`], so occupancy changes are seen immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPathGraph {
    size: UVec3,
}

impl LocalPathGraph {
    /// Builds the graph for a chunk of the given size.
    pub fn new(size: UVec3) -> Self {
        LocalPathGraph { size }
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn node_count(&self) -> usize {
        (self.size.x * self.size.y * self.size.z) as usize
    }

    pub fn edge_count(&self) -> usize {
        (0..self.node_count())
            .map(|id| self.edges(node_pos(self.size, id)).count())
            .sum()
    }

    /// Node id of a local position, `x + y*sx + z*sx*sy`.
    pub fn node_id(&self, pos: UVec3) -> Option<NodeId> {
        in_bounds(self.size, pos.as_ivec3()).then(|| node_id(self.size, pos))
    }

    pub fn node_pos(&self, id: NodeId) -> Option<UVec3> {
        (id < self.node_count()).then(|| node_pos(self.size, id))
    }

    /// Local positions directly connected to `pos`.
    pub fn neighbors(&self, pos: UVec3) -> impl Iterator<Item = UVec3> + '_ {
        self.node_id(pos)
            .into_iter()
            .flat_map(move |_| self.edges(pos).map(|(neighbor, _)| neighbor))
    }

    /// A* from `start` to `goal`, both inclusive.
    ///
    /// `passable` is asked about every cell the search wants to step into; a
    /// `false` answer removes that cell from the search entirely. The start cell
    /// is never asked. Returns `None` if either end is outside the chunk or the
    /// goal can't be reached.
    pub fn find_path<F>(&self, start: UVec3, goal: UVec3, passable: F) -> Option<Path<UVec3>>
    where
        F: Fn(UVec3) -> bool,
    {
        let start_id = self.node_id(start)?;
        let goal_id = self.node_id(goal)?;
        let neighborhood = OrdinalNeighborhood3d;
        let goal_pos = goal.as_ivec3();
        let size = self.size;

        let path = astar(
            start_id,
            goal_id,
            self.node_count(),
            |id: NodeId, out: &mut Vec<(NodeId, MovementCost)>| {
                out.extend(
                    self.edges(node_pos(size, id))
                        .filter(|&(neighbor, _)| passable(neighbor))
                        .map(|(neighbor, cost)| (node_id(size, neighbor), cost)),
                );
            },
            |id: NodeId| neighborhood.heuristic(node_pos(size, id).as_ivec3(), goal_pos),
        )?;

        let cost = path.cost();
        let cells = path.into_iter().map(|id| node_pos(size, id)).collect();
        Some(Path::new(cells, cost))
    }

    /// In-chunk neighbours of `pos` with the cost of stepping to each, in
    /// offset order.
    fn edges(&self, pos: UVec3) -> impl Iterator<Item = (UVec3, MovementCost)> + '_ {
        let neighborhood = OrdinalNeighborhood3d;
        let origin = pos.as_ivec3();

        neighborhood.offsets().iter().filter_map(move |&offset| {
            let neighbor = origin + offset;
            in_bounds(self.size, neighbor)
                .then(|| (neighbor.as_uvec3(), neighborhood.step_cost(offset)))
        })
    }
}

fn in_bounds(size: UVec3, pos: IVec3) -> bool {
    pos.cmpge(IVec3::ZERO).all() && pos.cmplt(size.as_ivec3()).all()
}

fn node_id(size: UVec3, pos: UVec3) -> NodeId {
    (pos.x + pos.y * size.x + pos.z * size.x * size.y) as NodeId
}

fn node_pos(size: UVec3, id: NodeId) -> UVec3 {
    let id = id as u32;
    let layer = size.x * size.y;
    UVec3::new(id % size.x, (id % layer) / size.x, id / layer)
}
