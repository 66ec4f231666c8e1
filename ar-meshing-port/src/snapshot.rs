use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use ar_meshing::{
    BlockDescriptor, BufferKind, BufferSizes, FilledBuffers, PassError, FLOATS_PER_VERTEX,
};

/// Magic word at the start of every snapshot file.
pub const MAGIC: [u8; 16] = *b"6DBLOCKMESH\0\0\0\0\0";

/// Size in bytes of the fixed-length header.
pub const HEADER_LEN: usize = size_of::<RawHeader>();

/// Header as laid out in the file. All fields are little-endian.
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 16],
    block_ints: i32,
    vertex_floats: i32,
    face_ints: i32,
    block_size_bits: u32,
}

/// The complete contents of one fill of the flat buffers, as stored in a snapshot file.
#[derive(Clone, Debug, Default, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct MeshSnapshot {
    /// Block descriptor slots.
    pub block_ints: Vec<i32>,
    /// Vertex positions followed by vertex normals.
    pub vertex_floats: Vec<f32>,
    /// Global triangle indices.
    pub face_ints: Vec<i32>,
    /// Block edge length in meters.
    pub block_size: f32,
}

/// Error from reading, writing, or capturing a [`MeshSnapshot`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// The underlying reader or writer failed.
    #[error("snapshot I/O failed")]
    Io(#[from] io::Error),

    /// The data does not start with [`MAGIC`].
    #[error("not a mesh snapshot (magic word was \"{}\")", .found.escape_ascii())]
    BadMagic {
        #[allow(missing_docs)]
        found: [u8; 16],
    },

    /// The header declares a negative buffer size.
    #[error("snapshot declares a negative {buffer} buffer size ({length})")]
    NegativeLength {
        #[allow(missing_docs)]
        buffer: BufferKind,
        #[allow(missing_docs)]
        length: i32,
    },

    /// The data ends before all the buffers declared in the header.
    #[error("snapshot is truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        #[allow(missing_docs)]
        expected: usize,
        #[allow(missing_docs)]
        actual: usize,
    },

    /// The vertex buffer size is not a whole number of vertices, so positions and normals
    /// cannot be told apart.
    #[error(
        "snapshot vertex buffer has {length} slots, which is not a multiple of {}",
        FLOATS_PER_VERTEX
    )]
    UnalignedVertexBuffer {
        #[allow(missing_docs)]
        length: usize,
    },

    /// The producer failed, or its data was inconsistent, while capturing.
    #[error("could not capture snapshot")]
    Producer(#[from] PassError),
}

impl MeshSnapshot {
    /// Number of slots in each buffer.
    pub fn sizes(&self) -> BufferSizes {
        BufferSizes {
            block_ints: self.block_ints.len(),
            vertex_floats: self.vertex_floats.len(),
            face_ints: self.face_ints.len(),
        }
    }

    /// The buffers, in the form a producer would have filled them.
    pub fn as_filled(&self) -> FilledBuffers<'_> {
        FilledBuffers {
            block_ints: &self.block_ints,
            vertex_floats: &self.vertex_floats,
            face_ints: &self.face_ints,
        }
    }

    /// Decodes the block descriptors.
    pub fn descriptors(&self) -> impl Iterator<Item = BlockDescriptor> + '_ {
        BlockDescriptor::iter_from(&self.block_ints)
    }

    /// Size in bytes of the encoded snapshot.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.sizes().byte_size()
    }

    /// Decodes a snapshot from the complete contents of a file.
    ///
    /// Bytes after the declared buffers are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let Some(header_bytes) = bytes.get(..HEADER_LEN) else {
            return Err(SnapshotError::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        };
        let header: RawHeader = bytemuck::pod_read_unaligned(header_bytes);
        if header.magic != MAGIC {
            return Err(SnapshotError::BadMagic {
                found: header.magic,
            });
        }
        let sizes = BufferSizes {
            block_ints: declared_length(BufferKind::Block, header.block_ints)?,
            vertex_floats: declared_length(BufferKind::Vertex, header.vertex_floats)?,
            face_ints: declared_length(BufferKind::Face, header.face_ints)?,
        };
        if sizes.vertex_floats % FLOATS_PER_VERTEX != 0 {
            return Err(SnapshotError::UnalignedVertexBuffer {
                length: sizes.vertex_floats,
            });
        }

        let expected = HEADER_LEN + sizes.byte_size();
        if bytes.len() < expected {
            return Err(SnapshotError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() > expected {
            log::warn!(
                "ignoring {} bytes after the end of the mesh snapshot",
                bytes.len() - expected
            );
        }

        let (block_bytes, rest) = bytes[HEADER_LEN..].split_at(sizes.block_ints * 4);
        let (vertex_bytes, rest) = rest.split_at(sizes.vertex_floats * 4);
        let face_bytes = &rest[..sizes.face_ints * 4];

        Ok(Self {
            block_ints: decode_words(block_bytes, i32::from_le_bytes),
            vertex_floats: decode_words(vertex_bytes, f32::from_le_bytes),
            face_ints: decode_words(face_bytes, i32::from_le_bytes),
            block_size: f32::from_bits(u32::from_le(header.block_size_bits)),
        })
    }

    /// Encodes the snapshot in file format.
    ///
    /// Panics if any buffer has more than [`i32::MAX`] slots.
    pub fn to_bytes(&self) -> Vec<u8> {
        let sizes = self.sizes();
        let header = RawHeader {
            magic: MAGIC,
            block_ints: encode_length(sizes.block_ints).to_le(),
            vertex_floats: encode_length(sizes.vertex_floats).to_le(),
            face_ints: encode_length(sizes.face_ints).to_le(),
            block_size_bits: self.block_size.to_bits().to_le(),
        };

        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        bytes.extend(self.block_ints.iter().flat_map(|v| v.to_le_bytes()));
        bytes.extend(self.vertex_floats.iter().flat_map(|v| v.to_le_bytes()));
        bytes.extend(self.face_ints.iter().flat_map(|v| v.to_le_bytes()));
        bytes
    }

    /// Reads a snapshot from `reader`, which is read to the end.
    pub fn read_from(mut reader: impl Read) -> Result<Self, SnapshotError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Writes the snapshot to `writer`.
    pub fn write_to(&self, mut writer: impl Write) -> Result<(), SnapshotError> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Reads a snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        Self::from_bytes(&fs::read(path)?)
    }

    /// Writes a snapshot file, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

fn declared_length(buffer: BufferKind, raw_le: i32) -> Result<usize, SnapshotError> {
    let length = i32::from_le(raw_le);
    usize::try_from(length).map_err(|_| SnapshotError::NegativeLength { buffer, length })
}

fn encode_length(length: usize) -> i32 {
    i32::try_from(length).unwrap_or_else(|_| panic!("buffer of {length} slots is too large"))
}

fn decode_words<T>(bytes: &[u8], from_le_bytes: fn([u8; 4]) -> T) -> Vec<T> {
    let (words, _) = bytes.as_chunks::<4>();
    words.iter().copied().map(from_le_bytes).collect()
}
