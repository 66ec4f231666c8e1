use core::mem;
use core::ops::Range;

use euclid::Vector3D;

use crate::{FLOATS_PER_VECTOR, INDICES_PER_FACE, MeshPoint, MeshSpace};

/// A normal vector in [`MeshSpace`].
pub type MeshNormal = Vector3D<f32, MeshSpace>;

/// Triangle geometry of a single block, copied out of the producer's flat buffers.
///
/// Each [`MeshBlockRecord`](crate::MeshBlockRecord) exclusively owns one of these. It is
/// overwritten in place (reusing its allocations) when the block changes, and is never
/// shared with the flat buffers, which are overwritten on every pass.
///
/// Indices are local to the block: index `i` refers to `positions()[i]` and `normals()[i]`.
/// Triangles are consecutive triples of indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockGeometry {
    positions: Vec<MeshPoint>,
    normals: Vec<MeshNormal>,
    indices: Vec<u32>,
}

impl BlockGeometry {
    /// Constructs geometry from its parts.
    ///
    /// Panics if `positions` and `normals` differ in length, if `indices` is not a
    /// whole number of triangles, or if any index is out of range.
    pub fn new(positions: Vec<MeshPoint>, normals: Vec<MeshNormal>, indices: Vec<u32>) -> Self {
        assert_eq!(
            positions.len(),
            normals.len(),
            "positions and normals must be parallel"
        );
        assert_eq!(indices.len() % INDICES_PER_FACE, 0, "partial triangle");
        assert!(
            indices.iter().all(|&i| (i as usize) < positions.len()),
            "index out of range"
        );
        Self {
            positions,
            normals,
            indices,
        }
    }

    /// Vertex positions.
    #[inline]
    pub fn positions(&self) -> &[MeshPoint] {
        &self.positions
    }

    /// Vertex normals, parallel to [`Self::positions()`].
    #[inline]
    pub fn normals(&self) -> &[MeshNormal] {
        &self.normals
    }

    /// Block-local vertex indices, three per triangle.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / INDICES_PER_FACE
    }

    /// Returns whether there are no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over the triangles as triples of block-local indices.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(INDICES_PER_FACE)
            .map(|t| [t[0], t[1], t[2]])
    }

    /// Memory occupied by the geometry data, not counting unused capacity.
    pub fn total_byte_size(&self) -> usize {
        self.positions.len() * mem::size_of::<MeshPoint>()
            + self.normals.len() * mem::size_of::<MeshNormal>()
            + self.indices.len() * mem::size_of::<u32>()
    }

    /// Discards all geometry, keeping allocations.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.indices.clear();
    }

    /// Replaces the contents of `self` with one block's geometry taken from flat buffers.
    ///
    /// * `vertex_floats` is the filled part of the vertex buffer; positions occupy its first
    ///   half and normals its second half.
    /// * `vertices` is the block's range of global vertex numbers.
    /// * `face_ints` is the filled part of the face buffer and `faces` the block's range of
    ///   global face numbers; the indices they contain are global and are rebased by
    ///   subtracting `vertices.start`.
    ///
    /// The caller must have validated the ranges and indices.
    pub(crate) fn copy_from_flat(
        &mut self,
        vertex_floats: &[f32],
        vertices: Range<usize>,
        face_ints: &[i32],
        faces: Range<usize>,
    ) {
        self.clear();

        let normals_offset = vertex_floats.len() / 2;
        let position_floats =
            &vertex_floats[vertices.start * FLOATS_PER_VECTOR..vertices.end * FLOATS_PER_VECTOR];
        let normal_floats = &vertex_floats[normals_offset + vertices.start * FLOATS_PER_VECTOR
            ..normals_offset + vertices.end * FLOATS_PER_VECTOR];

        self.positions.extend(
            position_floats
                .chunks_exact(FLOATS_PER_VECTOR)
                .map(|p| MeshPoint::new(p[0], p[1], p[2])),
        );
        self.normals.extend(
            normal_floats
                .chunks_exact(FLOATS_PER_VECTOR)
                .map(|n| MeshNormal::new(n[0], n[1], n[2])),
        );

        // vertices.start fits in i32 because it was derived from i32 counts.
        let first_vertex = vertices.start as i32;
        self.indices.extend(
            face_ints[faces.start * INDICES_PER_FACE..faces.end * INDICES_PER_FACE]
                .iter()
                .map(|&global| (global - first_vertex) as u32),
        );
    }
}
