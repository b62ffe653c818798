//! Cross-chunk path planning.
//!
//! A route is first found on the coarse [`ChunkGraph`], then each chunk on the
//! route is crossed with a local search that ends on a border cell facing the
//! next chunk. The legs are joined into one global [`Path`].
use bevy::{
    log,
    math::{IVec3, UVec3, Vec3},
};
use rustc_hash::FxHashSet;

use crate::{
    chunk::{self, mirror_across},
    chunk_graph::ChunkGraph,
    dir::Dir,
    index::WorldIndex,
    path::Path,
};

/// Finds a path between two global positions. Empty if there is none.
pub(crate) fn pathfind(index: &WorldIndex, from: IVec3, to: IVec3) -> Path {
    let (start, goal) = match (index.resolve(from), index.resolve(to)) {
        (Ok(start), Ok(goal)) => (start, goal),
        (Err(err), _) | (_, Err(err)) => {
            log::warn!("Path query {} -> {} rejected: {}", from, to, err);
            return Path::empty();
        }
    };

    if start.chunk == goal.chunk {
        return local_leg(index, start.chunk, start.local, goal.local).unwrap_or_else(Path::empty);
    }

    let graph = ChunkGraph::build(start.chunk, goal.chunk, |coord| index.contains_chunk(coord));
    log::debug!(
        "Chunk graph for {} -> {}: {} nodes, {} edges",
        start.chunk,
        goal.chunk,
        graph.node_count(),
        graph.edge_count()
    );
    let Some(route) = graph.find_route(
        start.chunk,
        goal.chunk,
        index.settings().coarse_heuristic_weight(),
    ) else {
        log::debug!("No chunk route from {} to {}", start.chunk, goal.chunk);
        return Path::empty();
    };

    let mut path = Path::empty();
    let mut cursor = start.local;

    for pair in route.windows(2) {
        let Some((segment, entry)) = stitch(index, pair[0], pair[1], cursor, from, to) else {
            log::debug!("Could not cross from chunk {} into {}", pair[0], pair[1]);
            return Path::empty();
        };

        path.extend(segment);
        cursor = entry;
    }

    match local_leg(index, goal.chunk, cursor, goal.local) {
        Some(segment) => path.extend(segment),
        None => {
            log::debug!("Final leg inside chunk {} failed", goal.chunk);
            return Path::empty();
        }
    }

    path
}

/// Local search inside one chunk, returned in global space.
fn local_leg(index: &WorldIndex, coord: IVec3, start: UVec3, goal: UVec3) -> Option<Path> {
    index
        .with_chunk(coord, |chunk| {
            chunk
                .find_path(start, goal)
                .map(|path| path.to_global(chunk.origin()))
        })
        .ok()
        .flatten()
}

/// Walks from `cursor` to the best reachable exit of `current` towards `next`.
///
/// Returns the leg in global space and the cell it enters in `next`, in
/// `next`'s local space.
fn stitch(
    index: &WorldIndex,
    current: IVec3,
    next: IVec3,
    cursor: UVec3,
    from: IVec3,
    to: IVec3,
) -> Option<(Path, UVec3)> {
    let dir = Dir::from_vector(next - current)?;
    let size = index.chunk_size();

    // Entry cells are gathered first so only one chunk is locked at a time.
    let entries: FxHashSet<UVec3> = {
        let next_chunk = index.chunk_at(next).ok()?;
        let guard = chunk::lock(&next_chunk);
        guard.open_border_cells(dir.opposite()).collect()
    };

    let current_chunk = index.chunk_at(current).ok()?;
    let guard = chunk::lock(&current_chunk);

    let target = crossing_point(index, current, dir, from, to);
    let [u, v] = dir.face_axes();

    let mut candidates: Vec<(f32, UVec3)> = guard
        .open_border_cells(dir)
        .filter(|&exit| entries.contains(&mirror_across(size, exit, dir)))
        .map(|exit| {
            let pos = guard.to_global(exit).as_vec3();
            let du = pos[u] - target[u];
            let dv = pos[v] - target[v];
            (du * du + dv * dv, exit)
        })
        .collect();

    if candidates.is_empty() {
        log::debug!("No open crossing on the {:?} face of chunk {}", dir, current);
        return None;
    }

    // Stable, so equal distances keep border order.
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    candidates
        .iter()
        .take(index.settings().stitch_attempts())
        .find_map(|&(_, exit)| {
            let segment = guard.find_path(cursor, exit)?;
            Some((
                segment.to_global(guard.origin()),
                mirror_across(size, exit, dir),
            ))
        })
}

/// Where the straight line `from -> to` crosses the face between `current`
/// and its neighbour in `dir`. The plane lies halfway between the two facing
/// cell layers.
fn crossing_point(index: &WorldIndex, current: IVec3, dir: Dir, from: IVec3, to: IVec3) -> Vec3 {
    let axis = dir.fixed_axis();
    let size = index.chunk_size().as_ivec3();
    let origin = current * size;

    let plane = if dir.is_positive() {
        (origin[axis] + size[axis]) as f32 - 0.5
    } else {
        origin[axis] as f32 - 0.5
    };

    let from = from.as_vec3();
    let to = to.as_vec3();
    let delta = to[axis] - from[axis];

    let t = if delta == 0.0 {
        0.0
    } else {
        ((plane - from[axis]) / delta).clamp(0.0, 1.0)
    };

    from + (to - from) * t
}
