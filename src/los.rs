//! Line of sight between cells, across chunks.
use bevy::math::IVec3;

use crate::{error::WorldError, index::WorldIndex};

/// True if no cell strictly between `from` and `to` blocks sight.
///
/// Both end cells must lie in created chunks, as must every cell on the line.
/// A missing chunk is reported as [`WorldError::ChunkNotFound`].
pub(crate) fn line_of_sight(
    index: &WorldIndex,
    from: IVec3,
    to: IVec3,
) -> Result<bool, WorldError> {
    index.resolve(from)?;
    index.resolve(to)?;

    let line = bresenham_line(from, to);
    if line.len() <= 2 {
        return Ok(true);
    }

    for &cell in &line[1..line.len() - 1] {
        if index.blocks_sight(cell)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Cells visited by a 3D Bresenham walk from `start` to `end`, both included.
/// One cell per step along the dominant axis.
pub(crate) fn bresenham_line(start: IVec3, end: IVec3) -> Vec<IVec3> {
    let delta = end - start;
    let d = delta.abs();
    let step = delta.signum();

    let axis = if d.x >= d.y && d.x >= d.z {
        0
    } else if d.y >= d.z {
        1
    } else {
        2
    };
    let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
    let len = d[axis];

    let mut err_a = 2 * d[a] - len;
    let mut err_b = 2 * d[b] - len;
    let mut current = start;

    let mut line = Vec::with_capacity(len as usize + 1);
    line.push(current);

    for _ in 0..len {
        if err_a > 0 {
            current[a] += step[a];
            err_a -= 2 * len;
        }
        if err_b > 0 {
            current[b] += step[b];
            err_b -= 2 * len;
        }
        err_a += 2 * d[a];
        err_b += 2 * d[b];
        current[axis] += step[axis];

        line.push(current);
    }

    line
}
