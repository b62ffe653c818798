use bevy::math::IVec3;

use std::fmt::Debug;

/// Cost of a single step, in tenths of a cell width.
pub type MovementCost = u32;

pub const ORTHOGONAL_COST: MovementCost = 10;
pub const DIAGONAL_COST: MovementCost = 14;
pub const CUBE_DIAGONAL_COST: MovementCost = 17;

/// All 26 offsets around a cell. Ordered x, then y, then z, which is also the
/// order successors are pushed during a search.
pub const ORDINAL_3D_OFFSETS: [IVec3; 26] = {
    let mut offsets = [IVec3::ZERO; 26];
    let mut n = 0;
    let mut x = -1;
    while x <= 1 {
        let mut y = -1;
        while y <= 1 {
            let mut z = -1;
            while z <= 1 {
                if !(x == 0 && y == 0 && z == 0) {
                    offsets[n] = IVec3::new(x, y, z);
                    n += 1;
                }
                z += 1;
            }
            y += 1;
        }
        x += 1;
    }
    offsets
};

/// The six face-sharing offsets.
pub const CARDINAL_3D_OFFSETS: [IVec3; 6] = [
    IVec3::NEG_X,
    IVec3::X,
    IVec3::NEG_Y,
    IVec3::Y,
    IVec3::NEG_Z,
    IVec3::Z,
];

/// Movement rules for a search: which offsets are steps, what they cost, and
/// a lower bound on the remaining cost.
pub trait Neighborhood: Clone + Debug + Default + Sync + Send {
    fn offsets(&self) -> &'static [IVec3];
    fn step_cost(&self, offset: IVec3) -> MovementCost;
    /// Must never overestimate the cost of reaching `target`.
    fn heuristic(&self, pos: IVec3, target: IVec3) -> MovementCost;
}

/// 26-connected movement used inside a chunk.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrdinalNeighborhood3d;

impl Neighborhood for OrdinalNeighborhood3d {
    #[inline(always)]
    fn offsets(&self) -> &'static [IVec3] {
        &ORDINAL_3D_OFFSETS
    }

    #[inline(always)]
    fn step_cost(&self, offset: IVec3) -> MovementCost {
        match offset.abs().element_sum() {
            1 => ORTHOGONAL_COST,
            2 => DIAGONAL_COST,
            _ => CUBE_DIAGONAL_COST,
        }
    }

    /// Octile distance in three dimensions. With the step costs above this is
    /// the exact cost of an unobstructed walk.
    #[inline(always)]
    fn heuristic(&self, pos: IVec3, target: IVec3) -> MovementCost {
        let d = (pos - target).abs();
        let mut axes = [d.x as u32, d.y as u32, d.z as u32];
        axes.sort_unstable();
        let [low, mid, high] = axes;

        CUBE_DIAGONAL_COST * low + DIAGONAL_COST * (mid - low) + ORTHOGONAL_COST * (high - mid)
    }
}

/// 6-connected movement with unit steps, used for the chunk-level graph.
#[derive(Clone, Copy, Debug, Default)]
pub struct CardinalNeighborhood3d;

impl Neighborhood for CardinalNeighborhood3d {
    #[inline(always)]
    fn offsets(&self) -> &'static [IVec3] {
        &CARDINAL_3D_OFFSETS
    }

    #[inline(always)]
    fn step_cost(&self, _offset: IVec3) -> MovementCost {
        1
    }

    #[inline(always)]
    fn heuristic(&self, pos: IVec3, target: IVec3) -> MovementCost {
        (pos - target).abs().element_sum() as u32
    }
}
