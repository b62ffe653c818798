//! Errors raised by the world index and the entity directory.
use bevy::math::{IVec3, UVec3};
use thiserror::Error;

use crate::entity::EntityId;

/// Integrity errors for coordinate conversion and lookups.
///
/// Pathfinding never produces one of these. A failed search is an empty [`crate::path::Path`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// A global position converted to local space fell outside `[0, size)`.
    #[error("global position {global} maps to local {local}, outside chunk bounds [0, {size})")]
    OutOfBounds {
        global: IVec3,
        local: IVec3,
        size: UVec3,
    },
    /// No chunk is registered at the coordinate.
    #[error("no chunk registered at chunk coordinate {0}")]
    ChunkNotFound(IVec3),
    /// A chunk is already registered at the coordinate.
    #[error("a chunk already exists at chunk coordinate {0}")]
    DuplicateChunk(IVec3),
    /// Some cells of a chunk at this coordinate would fall outside the `i32` range.
    #[error("chunk coordinate {0} has cells outside the addressable range")]
    ChunkOutOfRange(IVec3),
    #[error("entity {0:?} is not registered in the directory")]
    EntityNotFound(EntityId),
    /// The caller's idea of where an entity stands disagrees with the directory.
    #[error("entity is tracked at {actual}, not at {expected}")]
    PositionMismatch { expected: IVec3, actual: IVec3 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorldError::ChunkNotFound(IVec3::new(1, -2, 3));
        assert_eq!(
            err.to_string(),
            "no chunk registered at chunk coordinate [1, -2, 3]"
        );

        let err = WorldError::OutOfBounds {
            global: IVec3::new(4, 0, 0),
            local: IVec3::new(4, 0, 0),
            size: UVec3::new(4, 4, 4),
        };
        assert!(err.to_string().contains("outside chunk bounds"));

        let err = WorldError::ChunkOutOfRange(IVec3::new(i32::MAX, 0, 0));
        assert!(err.to_string().contains("outside the addressable range"));
    }
}
