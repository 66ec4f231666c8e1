use core::{fmt, mem};
use std::collections::TryReserveError;

use crate::{FLOATS_PER_VERTEX, INDICES_PER_FACE, INTS_PER_BLOCK};

/// Factor by which a buffer's capacity exceeds the size that made it grow.
///
/// Growing past the immediate need means a mesh that keeps expanding causes only a
/// logarithmic number of reallocations.
pub const GROWTH_FACTOR: usize = 2;

/// Numbers of slots in each of the three flat buffers.
///
/// These are counts of `i32` or `f32` values, not bytes and not blocks.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct BufferSizes {
    /// `i32` slots for block descriptors.
    pub block_ints: usize,
    /// `f32` slots for vertex positions followed by vertex normals.
    pub vertex_floats: usize,
    /// `i32` slots for triangle indices.
    pub face_ints: usize,
}

impl BufferSizes {
    #[allow(missing_docs)]
    pub const ZERO: Self = Self {
        block_ints: 0,
        vertex_floats: 0,
        face_ints: 0,
    };

    /// Number of whole block descriptors the block buffer holds.
    #[inline]
    pub fn block_count(self) -> usize {
        self.block_ints / INTS_PER_BLOCK
    }

    /// Number of whole vertices (position plus normal) the vertex buffer holds.
    #[inline]
    pub fn vertex_count(self) -> usize {
        self.vertex_floats / FLOATS_PER_VERTEX
    }

    /// Number of whole triangles the face buffer holds.
    #[inline]
    pub fn face_count(self) -> usize {
        self.face_ints / INDICES_PER_FACE
    }

    /// Returns whether any of the three sizes is zero.
    #[inline]
    pub fn any_zero(self) -> bool {
        self.block_ints == 0 || self.vertex_floats == 0 || self.face_ints == 0
    }

    /// Returns whether every size in `self` is at most the corresponding size in `other`.
    #[inline]
    pub fn fits_within(self, other: Self) -> bool {
        self.block_ints <= other.block_ints
            && self.vertex_floats <= other.vertex_floats
            && self.face_ints <= other.face_ints
    }

    /// Size in bytes of buffers of these sizes.
    pub fn byte_size(self) -> usize {
        self.block_ints * mem::size_of::<i32>()
            + self.vertex_floats * mem::size_of::<f32>()
            + self.face_ints * mem::size_of::<i32>()
    }
}

/// Identifies one of the three flat buffers, for error reporting.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum BufferKind {
    /// The block descriptor buffer.
    Block,
    /// The vertex buffer.
    Vertex,
    /// The face index buffer.
    Face,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BufferKind::Block => "block",
            BufferKind::Vertex => "vertex",
            BufferKind::Face => "face",
        })
    }
}

/// Error from [`FlatBuffers::ensure_capacity()`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum BufferError {
    /// Memory for a larger buffer could not be allocated.
    ///
    /// The buffers are left exactly as they were before the call.
    #[error("could not allocate {requested} slots for the {buffer} buffer")]
    ResourceExhausted {
        /// Which buffer was being grown.
        buffer: BufferKind,
        /// Number of slots that were requested.
        requested: usize,
        /// Error from the allocator.
        #[source]
        source: TryReserveError,
    },
}

/// The three flat buffers a [`MeshProducer`](crate::MeshProducer) writes into.
///
/// Capacities only ever grow. Contents are meaningful only up to the sizes of the most
/// recent successful fill, and are overwritten by the next one.
#[derive(Clone, Default, PartialEq)]
pub struct FlatBuffers {
    block_ints: Vec<i32>,
    vertex_floats: Vec<f32>,
    face_ints: Vec<i32>,
}

impl FlatBuffers {
    /// Constructs empty buffers, which will be allocated on first use.
    pub const fn new() -> Self {
        Self {
            block_ints: Vec::new(),
            vertex_floats: Vec::new(),
            face_ints: Vec::new(),
        }
    }

    /// Constructs buffers sized for `blocks` blocks, each with up to `blocks` vertices and
    /// `blocks` triangles.
    ///
    /// A size too large to represent is requested as [`usize::MAX`] slots, which always
    /// fails with [`BufferError::ResourceExhausted`].
    pub fn with_initial_block_capacity(blocks: usize) -> Result<Self, BufferError> {
        let mut buffers = Self::new();
        let squared = blocks.saturating_mul(blocks);
        let sizes = BufferSizes {
            block_ints: blocks.saturating_mul(INTS_PER_BLOCK),
            vertex_floats: squared.saturating_mul(FLOATS_PER_VERTEX),
            face_ints: squared.saturating_mul(INDICES_PER_FACE),
        };
        buffers.replace_smaller(sizes, |size| size)?;
        Ok(buffers)
    }

    /// Current capacity of each buffer, in slots.
    pub fn capacities(&self) -> BufferSizes {
        BufferSizes {
            block_ints: self.block_ints.len(),
            vertex_floats: self.vertex_floats.len(),
            face_ints: self.face_ints.len(),
        }
    }

    /// Makes every buffer at least as large as `required`.
    ///
    /// Each buffer that is too small is replaced by a zeroed buffer of
    /// [`GROWTH_FACTOR`] times the required size, and the old one is released; buffers that
    /// are already large enough are untouched. Returns whether anything was reallocated.
    ///
    /// If any allocation fails, no buffer is changed.
    pub fn ensure_capacity(&mut self, required: BufferSizes) -> Result<bool, BufferError> {
        self.replace_smaller(required, |size| size.saturating_mul(GROWTH_FACTOR))
    }

    fn replace_smaller(
        &mut self,
        required: BufferSizes,
        grown_size: impl Fn(usize) -> usize,
    ) -> Result<bool, BufferError> {
        // Reserve everything before touching anything, so that failure leaves no trace.
        let block_ints = reserve_if_smaller(
            &self.block_ints,
            required.block_ints,
            &grown_size,
            BufferKind::Block,
        )?;
        let vertex_floats = reserve_if_smaller(
            &self.vertex_floats,
            required.vertex_floats,
            &grown_size,
            BufferKind::Vertex,
        )?;
        let face_ints = reserve_if_smaller(
            &self.face_ints,
            required.face_ints,
            &grown_size,
            BufferKind::Face,
        )?;

        let grew = block_ints.is_some() || vertex_floats.is_some() || face_ints.is_some();
        if let Some((fresh, len)) = block_ints {
            self.block_ints = zeroed(fresh, len);
        }
        if let Some((fresh, len)) = vertex_floats {
            self.vertex_floats = zeroed(fresh, len);
        }
        if let Some((fresh, len)) = face_ints {
            self.face_ints = zeroed(fresh, len);
        }
        if grew {
            log::trace!("flat buffers grown to {:?}", self.capacities());
        }
        Ok(grew)
    }

    /// Borrows the first `sizes` slots of each buffer for a producer to write into.
    ///
    /// Panics if `sizes` does not fit within [`Self::capacities()`].
    pub fn fill_target(&mut self, sizes: BufferSizes) -> FillTarget<'_> {
        assert!(
            sizes.fits_within(self.capacities()),
            "fill sizes {sizes:?} exceed buffer capacities {:?}",
            self.capacities()
        );
        FillTarget {
            block_ints: &mut self.block_ints[..sizes.block_ints],
            vertex_floats: &mut self.vertex_floats[..sizes.vertex_floats],
            face_ints: &mut self.face_ints[..sizes.face_ints],
        }
    }

    /// Borrows the first `sizes` slots of each buffer for reading.
    ///
    /// Panics if `sizes` does not fit within [`Self::capacities()`].
    pub fn filled(&self, sizes: BufferSizes) -> FilledBuffers<'_> {
        assert!(
            sizes.fits_within(self.capacities()),
            "fill sizes {sizes:?} exceed buffer capacities {:?}",
            self.capacities()
        );
        FilledBuffers {
            block_ints: &self.block_ints[..sizes.block_ints],
            vertex_floats: &self.vertex_floats[..sizes.vertex_floats],
            face_ints: &self.face_ints[..sizes.face_ints],
        }
    }

    /// Returns the base addresses and capacities of the three buffers, for handing to a
    /// foreign producer.
    ///
    /// The pointers are valid until the next call to [`Self::ensure_capacity()`] or until
    /// `self` is dropped. Prefer [`Self::fill_target()`] when the producer is Rust code.
    pub fn raw_pointers(&mut self) -> RawBufferPointers {
        RawBufferPointers {
            block_ints: self.block_ints.as_mut_ptr(),
            vertex_floats: self.vertex_floats.as_mut_ptr(),
            face_ints: self.face_ints.as_mut_ptr(),
            capacities: self.capacities(),
        }
    }

    /// Memory occupied by the buffers.
    pub fn total_byte_size(&self) -> usize {
        self.capacities().byte_size()
    }
}

impl fmt::Debug for FlatBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The contents are large and usually stale; show only the sizes.
        f.debug_struct("FlatBuffers")
            .field("capacities", &self.capacities())
            .finish_non_exhaustive()
    }
}

/// Returns an empty vector with room for the grown size, and that size, if `current` is
/// shorter than `required`.
fn reserve_if_smaller<T>(
    current: &[T],
    required: usize,
    grown_size: impl Fn(usize) -> usize,
    buffer: BufferKind,
) -> Result<Option<(Vec<T>, usize)>, BufferError> {
    if current.len() >= required {
        return Ok(None);
    }
    let requested = grown_size(required);
    let mut fresh = Vec::new();
    fresh
        .try_reserve_exact(requested)
        .map_err(|source| BufferError::ResourceExhausted {
            buffer,
            requested,
            source,
        })?;
    Ok(Some((fresh, requested)))
}

/// Fills a freshly reserved vector with `len` default values.
fn zeroed<T: Copy + Default>(mut fresh: Vec<T>, len: usize) -> Vec<T> {
    fresh.resize(len, T::default());
    fresh
}

/// Mutable views of the flat buffers, truncated to the sizes a producer asked for.
#[derive(Debug)]
#[allow(clippy::exhaustive_structs)]
pub struct FillTarget<'a> {
    /// Destination for block descriptors; see [`BlockDescriptor`](crate::BlockDescriptor).
    pub block_ints: &'a mut [i32],
    /// Destination for vertex positions (first half) and normals (second half).
    pub vertex_floats: &'a mut [f32],
    /// Destination for triangle indices, relative to the start of the whole vertex buffer.
    pub face_ints: &'a mut [i32],
}

impl FillTarget<'_> {
    /// Lengths of the three views.
    pub fn sizes(&self) -> BufferSizes {
        BufferSizes {
            block_ints: self.block_ints.len(),
            vertex_floats: self.vertex_floats.len(),
            face_ints: self.face_ints.len(),
        }
    }

    /// Returns the base addresses and lengths of the three views, for handing to a foreign
    /// producer. The pointers are valid for as long as `self` is borrowed.
    pub fn raw_pointers(&mut self) -> RawBufferPointers {
        RawBufferPointers {
            block_ints: self.block_ints.as_mut_ptr(),
            vertex_floats: self.vertex_floats.as_mut_ptr(),
            face_ints: self.face_ints.as_mut_ptr(),
            capacities: self.sizes(),
        }
    }
}

/// Read-only views of filled flat buffers.
#[derive(Clone, Copy, Debug)]
#[allow(clippy::exhaustive_structs)]
pub struct FilledBuffers<'a> {
    #[allow(missing_docs)]
    pub block_ints: &'a [i32],
    #[allow(missing_docs)]
    pub vertex_floats: &'a [f32],
    #[allow(missing_docs)]
    pub face_ints: &'a [i32],
}

impl FilledBuffers<'_> {
    /// Lengths of the three views.
    pub fn sizes(&self) -> BufferSizes {
        BufferSizes {
            block_ints: self.block_ints.len(),
            vertex_floats: self.vertex_floats.len(),
            face_ints: self.face_ints.len(),
        }
    }
}

/// Base addresses and capacities of the flat buffers; see [`FlatBuffers::raw_pointers()`].
#[derive(Clone, Copy, Debug)]
#[allow(clippy::exhaustive_structs)]
pub struct RawBufferPointers {
    #[allow(missing_docs)]
    pub block_ints: *mut i32,
    #[allow(missing_docs)]
    pub vertex_floats: *mut f32,
    #[allow(missing_docs)]
    pub face_ints: *mut i32,
    /// Number of slots writable through each pointer.
    pub capacities: BufferSizes,
}
