//! A* search shared by the cell-level and chunk-level graphs.
use indexmap::map::Entry::{Occupied, Vacant};
use std::collections::BinaryHeap;
use std::hash::Hash;

use crate::{neighbor::MovementCost, path::Path, FxIndexMap, SmallestCostHolder};

/// A* search over an implicit graph.
///
/// # Arguments
/// * `start` - The starting node.
/// * `goal` - The goal node.
/// * `size_hint` - A hint for the size of the binary heap.
/// * `successors` - Pushes every traversable successor of a node, with the step cost, into the
///   buffer.
/// * `heuristic` - Lower bound on the cost from a node to `goal`. Must be consistent.
///
/// # Returns
/// * [`Option<Path>`] - The cheapest path from `start` to `goal` inclusive, or `None` if `goal`
///   can't be reached.
///
/// Frontier ties are broken by deeper node first, then by discovery order, so
/// identical inputs always produce identical paths.
pub(crate) fn astar<P, S, H>(
    start: P,
    goal: P,
    size_hint: usize,
    mut successors: S,
    heuristic: H,
) -> Option<Path<P>>
where
    P: Copy + Eq + Hash,
    S: FnMut(P, &mut Vec<(P, MovementCost)>),
    H: Fn(P) -> MovementCost,
{
    let mut to_visit = BinaryHeap::with_capacity(size_hint / 2);
    to_visit.push(SmallestCostHolder {
        estimated_cost: heuristic(start),
        cost: 0,
        index: 0,
    });

    let mut visited: FxIndexMap<P, (usize, MovementCost)> = FxIndexMap::default();
    visited.insert(start, (usize::MAX, 0));

    let mut neighbors = Vec::new();

    while let Some(SmallestCostHolder { cost, index, .. }) = to_visit.pop() {
        let current_pos = {
            let (&current_pos, &(_, current_cost)) = visited.get_index(index)?;

            if current_pos == goal {
                return Some(Path::new(
                    reconstruct_path(&visited, index),
                    current_cost,
                ));
            }

            // Stale heap entry, a cheaper route to this node was already expanded.
            if cost > current_cost {
                continue;
            }

            current_pos
        };

        neighbors.clear();
        successors(current_pos, &mut neighbors);

        for &(neighbor, step_cost) in neighbors.iter() {
            let new_cost = cost + step_cost;
            let h;
            let n;
            match visited.entry(neighbor) {
                Vacant(e) => {
                    h = heuristic(neighbor);
                    n = e.index();
                    e.insert((index, new_cost));
                }
                Occupied(mut e) => {
                    if e.get().1 > new_cost {
                        h = heuristic(neighbor);
                        n = e.index();
                        e.insert((index, new_cost));
                    } else {
                        continue;
                    }
                }
            }

            to_visit.push(SmallestCostHolder {
                estimated_cost: new_cost + h,
                cost: new_cost,
                index: n,
            });
        }
    }

    None
}

fn reconstruct_path<P: Copy>(
    visited: &FxIndexMap<P, (usize, MovementCost)>,
    goal_index: usize,
) -> Vec<P> {
    let mut steps = vec![];
    let mut current = goal_index;

    while current != usize::MAX {
        match visited.get_index(current) {
            Some((pos, &(parent, _))) => {
                steps.push(*pos);
                current = parent;
            }
            None => break,
        }
    }

    steps.reverse();
    steps
}
