//! The boundary between this crate and whatever supplies mesh data.

use crate::{BlockCoord, BufferSizes, FillTarget};

/// Number of `i32` slots in one block descriptor:
/// `[x, y, z, vertex_count, face_count, version]`.
pub const INTS_PER_BLOCK: usize = 6;

/// Number of `f32` values in one position or normal vector.
pub const FLOATS_PER_VECTOR: usize = 3;

/// Number of `f32` values the vertex buffer holds per vertex: a position in the first half
/// of the buffer and a normal in the second half.
pub const FLOATS_PER_VERTEX: usize = 2 * FLOATS_PER_VECTOR;

/// Number of `i32` indices per triangle in the face buffer.
pub const INDICES_PER_FACE: usize = 3;

/// A source of complete mesh states, such as a native meshing library.
///
/// Each reconciliation pass calls [`Self::mesh_info()`] once and then, if the proposed
/// state is worth reading, [`Self::fill()`] once.
///
/// The mesh state offered is always the *full* mesh, not a delta. Block coordinates
/// must be unique within one state; block versions must increase whenever a block's
/// geometry changes.
pub trait MeshProducer {
    /// Reports the buffer sizes needed to receive the current mesh state, and its version.
    ///
    /// A version of 0 together with zero block slots means the mesh has been discarded
    /// (for example because a new map was loaded).
    fn mesh_info(&mut self) -> MeshInfo;

    /// Writes the current mesh state into `target`, whose buffers have exactly the lengths
    /// most recently reported by [`Self::mesh_info()`].
    ///
    /// Returns the number of complete block descriptors written. `Ok(0)` means no data
    /// was available.
    fn fill(&mut self, target: FillTarget<'_>) -> Result<usize, ProducerError>;
}

impl<P: MeshProducer + ?Sized> MeshProducer for &mut P {
    fn mesh_info(&mut self) -> MeshInfo {
        (**self).mesh_info()
    }

    fn fill(&mut self, target: FillTarget<'_>) -> Result<usize, ProducerError> {
        (**self).fill(target)
    }
}

impl<P: MeshProducer + ?Sized> MeshProducer for Box<P> {
    fn mesh_info(&mut self) -> MeshInfo {
        (**self).mesh_info()
    }

    fn fill(&mut self, target: FillTarget<'_>) -> Result<usize, ProducerError> {
        (**self).fill(target)
    }
}

/// Answer to [`MeshProducer::mesh_info()`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct MeshInfo {
    /// Version of the mesh state on offer.
    pub version: u32,
    /// Number of slots needed in each flat buffer.
    pub sizes: BufferSizes,
    /// Edge length of a block, in meters.
    pub block_size: f32,
}

/// Error reported by a [`MeshProducer`] instead of mesh data.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ProducerError {
    /// A native implementation returned a negative status code.
    #[error("producer returned status code {0}")]
    Status(i32),

    /// Any other failure, described by the producer.
    #[error("producer failed: {0}")]
    Other(String),
}

impl ProducerError {
    /// Interprets the return value of a native fill call: non-negative values are block
    /// counts and negative values are errors.
    pub fn from_status(status: i32) -> Result<usize, Self> {
        usize::try_from(status).map_err(|_| Self::Status(status))
    }
}

/// One decoded block descriptor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct BlockDescriptor {
    /// Which block this describes.
    pub coord: BlockCoord,
    /// Number of vertices belonging to this block.
    pub vertex_count: i32,
    /// Number of triangles belonging to this block.
    pub face_count: i32,
    /// Version of this block's geometry.
    pub version: i32,
}

impl BlockDescriptor {
    /// Decodes one descriptor from its [`INTS_PER_BLOCK`] slots.
    pub fn from_ints(slots: &[i32; INTS_PER_BLOCK]) -> Self {
        let &[x, y, z, vertex_count, face_count, version] = slots;
        Self {
            coord: BlockCoord::new(x, y, z),
            vertex_count,
            face_count,
            version,
        }
    }

    /// Encodes this descriptor into its [`INTS_PER_BLOCK`] slots.
    pub fn to_ints(self) -> [i32; INTS_PER_BLOCK] {
        let Self {
            coord: BlockCoord { x, y, z },
            vertex_count,
            face_count,
            version,
        } = self;
        [x, y, z, vertex_count, face_count, version]
    }

    /// Decodes every complete descriptor in `block_ints`, in order.
    pub fn iter_from(block_ints: &[i32]) -> impl Iterator<Item = Self> + '_ {
        let (descriptors, _partial) = block_ints.as_chunks::<INTS_PER_BLOCK>();
        descriptors.iter().map(Self::from_ints)
    }
}
