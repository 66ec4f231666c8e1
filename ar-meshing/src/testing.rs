//! Test helpers for ar-meshing tests and benches, and for other crates' tests.
//!
//! This module is public but doc(hidden).

#![allow(missing_docs, clippy::exhaustive_enums)]

use std::collections::BTreeSet;

use crate::{
    BlockCoord, BlockDescriptor, BlockGeometry, BufferSizes, FillTarget, GeometrySink,
    MaterialMode, MeshInfo, MeshNormal, MeshPoint, MeshProducer, ProducerError,
    FLOATS_PER_VECTOR,
};

/// One block of fixture mesh data, with block-local triangle indices.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockFixture {
    pub coord: BlockCoord,
    pub version: i32,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl BlockFixture {
    /// A block with no vertices or triangles.
    pub fn empty(coord: impl Into<BlockCoord>, version: i32) -> Self {
        Self {
            coord: coord.into(),
            version,
            positions: Vec::new(),
            normals: Vec::new(),
            triangles: Vec::new(),
        }
    }

    /// A block with `vertex_count` distinct vertices arranged in a triangle fan
    /// (`vertex_count - 2` triangles, all sharing vertex 0).
    ///
    /// Positions depend on `version`, so that geometry from different versions differs.
    pub fn fan(coord: impl Into<BlockCoord>, version: i32, vertex_count: usize) -> Self {
        let coord = coord.into();
        let base = [coord.x as f32, coord.y as f32, coord.z as f32];
        let positions = (0..vertex_count)
            .map(|i| {
                let angle = i as f32 * 0.5;
                [
                    base[0] + angle.cos() * 0.25,
                    base[1] + version as f32 * 0.01,
                    base[2] + angle.sin() * 0.25,
                ]
            })
            .collect();
        let triangles = (1..vertex_count.saturating_sub(1))
            .map(|i| [0, i as u32, i as u32 + 1])
            .collect();
        Self {
            coord,
            version,
            positions,
            normals: vec![[0.0, 1.0, 0.0]; vertex_count],
            triangles,
        }
    }

    /// The geometry a reconciler should extract for this block.
    pub fn expected_geometry(&self) -> BlockGeometry {
        BlockGeometry::new(
            self.positions.iter().map(|&p| MeshPoint::from(p)).collect(),
            self.normals.iter().map(|&n| MeshNormal::from(n)).collect(),
            self.triangles.iter().flatten().copied().collect(),
        )
    }
}

/// Flat-buffer encoding of a list of [`BlockFixture`]s, exactly as a producer would write
/// it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixtureBuffers {
    pub block_ints: Vec<i32>,
    pub vertex_floats: Vec<f32>,
    pub face_ints: Vec<i32>,
}

impl FixtureBuffers {
    pub fn encode(blocks: &[BlockFixture]) -> Self {
        let mut block_ints = Vec::new();
        let mut positions: Vec<f32> = Vec::new();
        let mut normals: Vec<f32> = Vec::new();
        let mut face_ints = Vec::new();

        let mut first_vertex: i32 = 0;
        for block in blocks {
            let vertex_count = block.positions.len() as i32;
            block_ints.extend(
                BlockDescriptor {
                    coord: block.coord,
                    vertex_count,
                    face_count: block.triangles.len() as i32,
                    version: block.version,
                }
                .to_ints(),
            );
            positions.extend(block.positions.iter().flatten());
            normals.extend(block.normals.iter().flatten());
            face_ints.extend(
                block
                    .triangles
                    .iter()
                    .flatten()
                    .map(|&local| local as i32 + first_vertex),
            );
            first_vertex += vertex_count;
        }
        debug_assert_eq!(positions.len(), normals.len());
        debug_assert_eq!(positions.len() % FLOATS_PER_VECTOR, 0);

        let mut vertex_floats = positions;
        vertex_floats.extend(normals);
        Self {
            block_ints,
            vertex_floats,
            face_ints,
        }
    }

    pub fn sizes(&self) -> BufferSizes {
        BufferSizes {
            block_ints: self.block_ints.len(),
            vertex_floats: self.vertex_floats.len(),
            face_ints: self.face_ints.len(),
        }
    }
}

/// Deliberate misbehavior for [`FixtureProducer::misbehave_on_next_fill()`].
#[derive(Clone, Debug, PartialEq)]
pub enum Misbehavior {
    /// Write the data, then return this raw status instead of the block count.
    ReturnStatus(i32),
    /// Fail with [`ProducerError::Other`].
    Fail(String),
    /// Write the data with this value in face index slot 0.
    CorruptFirstFaceIndex(i32),
}

/// In-memory [`MeshProducer`] serving a scriptable sequence of mesh states.
#[derive(Clone, Debug)]
pub struct FixtureProducer {
    version: u32,
    block_size: f32,
    encoded: FixtureBuffers,
    misbehavior: Option<Misbehavior>,
    pub mesh_info_calls: usize,
    pub fill_calls: usize,
}

impl FixtureProducer {
    /// A producer offering nothing (version 0, all sizes zero).
    pub fn new(block_size: f32) -> Self {
        Self {
            version: 0,
            block_size,
            encoded: FixtureBuffers::default(),
            misbehavior: None,
            mesh_info_calls: 0,
            fill_calls: 0,
        }
    }

    /// Replaces the offered mesh state.
    pub fn set_state(&mut self, version: u32, blocks: &[BlockFixture]) {
        self.version = version;
        self.encoded = FixtureBuffers::encode(blocks);
    }

    /// Offers the same blocks under a different mesh version.
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Offers the "mesh discarded" signal: version 0 with no blocks.
    pub fn set_reset(&mut self) {
        self.set_state(0, &[]);
    }

    /// The next [`MeshProducer::fill()`] call misbehaves as specified; later ones are normal.
    pub fn misbehave_on_next_fill(&mut self, misbehavior: Misbehavior) {
        self.misbehavior = Some(misbehavior);
    }

    pub fn encoded(&self) -> &FixtureBuffers {
        &self.encoded
    }
}

impl MeshProducer for FixtureProducer {
    fn mesh_info(&mut self) -> MeshInfo {
        self.mesh_info_calls += 1;
        MeshInfo {
            version: self.version,
            sizes: self.encoded.sizes(),
            block_size: self.block_size,
        }
    }

    fn fill(&mut self, target: FillTarget<'_>) -> Result<usize, ProducerError> {
        self.fill_calls += 1;
        assert_eq!(target.sizes(), self.encoded.sizes(), "fill target size");

        let misbehavior = self.misbehavior.take();
        if let Some(Misbehavior::Fail(message)) = &misbehavior {
            return Err(ProducerError::Other(message.clone()));
        }

        target.block_ints.copy_from_slice(&self.encoded.block_ints);
        target.vertex_floats.copy_from_slice(&self.encoded.vertex_floats);
        target.face_ints.copy_from_slice(&self.encoded.face_ints);

        match misbehavior {
            Some(Misbehavior::ReturnStatus(status)) => ProducerError::from_status(status),
            Some(Misbehavior::CorruptFirstFaceIndex(value)) => {
                target.face_ints[0] = value;
                Ok(self.encoded.sizes().block_count())
            }
            Some(Misbehavior::Fail(_)) | None => Ok(self.encoded.sizes().block_count()),
        }
    }
}

/// Operation recorded by [`RecordingSink`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SinkOp {
    Create(BlockCoord),
    /// Coordinates and triangle count of the assigned geometry.
    Assign(BlockCoord, usize),
    RebuildCollider(BlockCoord),
    SetMaterial(BlockCoord, MaterialMode),
    Destroy(BlockCoord),
}

/// [`GeometrySink`] which records every operation and tracks which objects exist.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub ops: Vec<SinkOp>,
    pub live: BTreeSet<BlockCoord>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return all operations recorded so far.
    pub fn drain(&mut self) -> Vec<SinkOp> {
        std::mem::take(&mut self.ops)
    }
}

impl GeometrySink for RecordingSink {
    type Object = BlockCoord;

    fn create(&mut self, coord: BlockCoord) -> BlockCoord {
        assert!(self.live.insert(coord), "{coord} created twice");
        self.ops.push(SinkOp::Create(coord));
        coord
    }

    fn assign_geometry(&mut self, object: &mut BlockCoord, geometry: &BlockGeometry) {
        self.ops
            .push(SinkOp::Assign(*object, geometry.triangle_count()));
    }

    fn rebuild_collider(&mut self, object: &mut BlockCoord, _geometry: &BlockGeometry) {
        self.ops.push(SinkOp::RebuildCollider(*object));
    }

    fn set_material(&mut self, object: &mut BlockCoord, material: MaterialMode) {
        self.ops.push(SinkOp::SetMaterial(*object, material));
    }

    fn destroy(&mut self, object: BlockCoord) {
        assert!(self.live.remove(&object), "{object} destroyed but not live");
        self.ops.push(SinkOp::Destroy(object));
    }
}
