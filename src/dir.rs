//! The six face directions a chunk can be left through.
use bevy::math::IVec3;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// A face of a chunk. +X is east, +Y is north and +Z is up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum Dir {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
    Up = 4,
    Down = 5,
}

impl Dir {
    /// Unit step across this face.
    pub fn vector(self) -> IVec3 {
        match self {
            Dir::North => IVec3::Y,
            Dir::East => IVec3::X,
            Dir::South => IVec3::NEG_Y,
            Dir::West => IVec3::NEG_X,
            Dir::Up => IVec3::Z,
            Dir::Down => IVec3::NEG_Z,
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::North => Dir::South,
            Dir::East => Dir::West,
            Dir::South => Dir::North,
            Dir::West => Dir::East,
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
        }
    }

    /// The axis (0 = x, 1 = y, 2 = z) this face is perpendicular to.
    pub fn fixed_axis(self) -> usize {
        match self {
            Dir::East | Dir::West => 0,
            Dir::North | Dir::South => 1,
            Dir::Up | Dir::Down => 2,
        }
    }

    /// The two axes spanning the face, in ascending order.
    pub fn face_axes(self) -> [usize; 2] {
        match self.fixed_axis() {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        }
    }

    /// True if the face points towards increasing coordinates.
    pub fn is_positive(self) -> bool {
        matches!(self, Dir::North | Dir::East | Dir::Up)
    }

    /// Returns the face crossed by a unit step, or `None` for anything else.
    pub fn from_vector(vector: IVec3) -> Option<Dir> {
        Dir::iter().find(|dir| dir.vector() == vector)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Number of chunk faces.
pub const FACE_COUNT: usize = Dir::COUNT;

/// Every face, in discriminant order.
pub const FACES: [Dir; FACE_COUNT] = [
    Dir::North,
    Dir::East,
    Dir::South,
    Dir::West,
    Dir::Up,
    Dir::Down,
];
