use core::fmt;

use euclid::{Box3D, Point3D};

/// Unit-of-measure type for coordinates in the mesh's own space, in meters.
///
/// This is the space that producer vertex positions are expressed in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum MeshSpace {}

/// A position in [`MeshSpace`].
pub type MeshPoint = Point3D<f32, MeshSpace>;

/// Integer coordinates identifying one cubic block of the mesh grid.
///
/// Block `(x, y, z)` covers the half-open box from `(x, y, z) * block_size` to
/// `(x + 1, y + 1, z + 1) * block_size` in [`MeshSpace`]; the block size itself is
/// chosen by the producer and reported with each pass.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[allow(clippy::exhaustive_structs)]
pub struct BlockCoord {
    #[allow(missing_docs)]
    pub x: i32,
    #[allow(missing_docs)]
    pub y: i32,
    #[allow(missing_docs)]
    pub z: i32,
}

impl BlockCoord {
    #[allow(missing_docs)]
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the block containing `point`, for blocks of edge length `block_size`.
    ///
    /// Points exactly on a boundary belong to the block on the positive side.
    /// `block_size` must be positive.
    pub fn containing(point: MeshPoint, block_size: f32) -> Self {
        debug_assert!(block_size > 0.0, "block size must be positive");
        Self {
            x: (point.x / block_size).floor() as i32,
            y: (point.y / block_size).floor() as i32,
            z: (point.z / block_size).floor() as i32,
        }
    }

    /// Returns the region of [`MeshSpace`] this block covers, for blocks of edge length
    /// `block_size`.
    pub fn bounds(self, block_size: f32) -> Box3D<f32, MeshSpace> {
        let lower = Point3D::new(self.x as f32, self.y as f32, self.z as f32) * block_size;
        Box3D::new(
            lower,
            Point3D::new(
                (self.x + 1) as f32,
                (self.y + 1) as f32,
                (self.z + 1) as f32,
            ) * block_size,
        )
    }
}

impl From<[i32; 3]> for BlockCoord {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<BlockCoord> for [i32; 3] {
    fn from(value: BlockCoord) -> Self {
        [value.x, value.y, value.z]
    }
}

impl fmt::Display for BlockCoord {
    /// Produces a short label such as `b1,-2,3`, suitable for naming per-block objects.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { x, y, z } = self;
        write!(f, "b{x},{y},{z}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn containing_rounds_toward_negative_infinity() {
        assert_eq!(
            BlockCoord::containing(MeshPoint::new(0.1, -0.1, 2.9), 1.4),
            BlockCoord::new(0, -1, 2)
        );
        assert_eq!(
            BlockCoord::containing(MeshPoint::new(-1.4, 1.4, 0.0), 1.4),
            BlockCoord::new(-1, 1, 0)
        );
    }

    #[test]
    fn bounds_contain_their_own_points() {
        let coord = BlockCoord::new(3, -2, 0);
        let bounds = coord.bounds(0.5);
        assert_eq!(bounds.min, MeshPoint::new(1.5, -1.0, 0.0));
        assert_eq!(bounds.max, MeshPoint::new(2.0, -0.5, 0.5));
        assert_eq!(BlockCoord::containing(bounds.center(), 0.5), coord);
    }

    #[test]
    fn display() {
        assert_eq!(BlockCoord::new(1, -2, 3).to_string(), "b1,-2,3");
    }
}
