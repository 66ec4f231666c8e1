//! [`MeshReconciler`], which turns full mesh states offered by a [`MeshProducer`] into
//! per-block changes.

use core::fmt;
use core::ops::Range;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use indoc::indoc;

use crate::listen::{Listen, Listener, Notifier};
use crate::{
    BlockCoord, BlockDescriptor, BlockRegistry, BufferError, FilledBuffers,
    FlatBuffers, MeshInfo, MeshPoint, MeshProducer, MeshingSettings, ProducerError,
    FLOATS_PER_VERTEX, INDICES_PER_FACE,
};


/// Notification of a change committed by a [`MeshReconciler`].
///
/// Within one pass, [`MeshEvent::BlockUpdated`] messages arrive in block descriptor order,
/// followed by [`MeshEvent::BlockObsoleted`] messages in ascending coordinate order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum MeshEvent {
    /// The block's geometry is new or has changed; read it from the registry.
    BlockUpdated(BlockCoord),
    /// The block is no longer part of the mesh and has been removed from the registry.
    BlockObsoleted(BlockCoord),
    /// Every block has been removed at once.
    MeshCleared,
}

/// Global state of the mesh as of the last committed pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct MeshState {
    /// Version of the last committed pass, or 0 if there has been none since the last clear.
    pub version: u32,
    /// Number of blocks in the last committed fill.
    pub block_count: usize,
    /// Number of vertices in the last committed fill.
    pub vertex_count: usize,
    /// Number of triangles in the last committed fill.
    pub face_count: usize,
    /// Edge length of a block, in meters.
    pub block_size: f32,
}

/// Error from a reconciliation pass that was aborted.
///
/// When a pass fails, the registry, the [`MeshState`], and the event stream are exactly as
/// they were before it started; the next pass may be attempted at any time.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PassError {
    /// The producer reported an error instead of filling the buffers.
    #[error(transparent)]
    Producer(#[from] ProducerError),

    /// The producer wrote no blocks even though it reported a nonempty mesh.
    #[error("mesh producer wrote no blocks")]
    EmptyFill,

    /// The producer wrote a different number of blocks than its reported sizes imply.
    #[error("mesh producer wrote {returned} blocks, but {expected} were expected")]
    BlockCountMismatch {
        #[allow(missing_docs)]
        returned: usize,
        #[allow(missing_docs)]
        expected: usize,
    },

    /// A block descriptor is inconsistent with the rest of the filled data.
    #[error("block descriptor {index} is malformed: {reason}")]
    MalformedDescriptor {
        /// Position of the descriptor within the block buffer.
        index: usize,
        #[allow(missing_docs)]
        reason: String,
    },

    /// The flat buffers could not be grown.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// What a call to [`MeshReconciler::update()`] did.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum PassOutcome {
    /// The producer offered nothing newer; nothing changed.
    Skipped,
    /// Block updates are paused; the producer was not consulted.
    Paused,
    /// The producer signalled that the mesh was discarded, and all blocks were removed.
    Cleared,
    /// A new mesh state was read and committed.
    Committed,
}

/// Report of a single call to [`MeshReconciler::update()`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct PassInfo {
    /// What happened.
    pub outcome: PassOutcome,
    /// Mesh version after the pass.
    pub version: u32,
    /// Number of [`MeshEvent::BlockUpdated`] notifications sent.
    pub blocks_updated: usize,
    /// Number of [`MeshEvent::BlockObsoleted`] notifications sent.
    pub blocks_obsoleted: usize,
    /// Number of block descriptors that were ignored because a later descriptor in the same
    /// fill had the same coordinates.
    pub duplicate_coordinates: usize,
    /// Whether any flat buffer had to be reallocated.
    pub buffers_grew: bool,
    /// Total time spent in the pass, including the producer's fill.
    pub time: Duration,
}

impl PassInfo {
    fn new(outcome: PassOutcome, version: u32) -> Self {
        Self {
            outcome,
            version,
            blocks_updated: 0,
            blocks_obsoleted: 0,
            duplicate_coordinates: 0,
            buffers_grew: false,
            time: Duration::ZERO,
        }
    }

    /// Returns whether any notification was sent.
    pub fn changed(&self) -> bool {
        self.outcome == PassOutcome::Cleared || self.blocks_updated > 0 || self.blocks_obsoleted > 0
    }
}

impl fmt::Display for PassInfo {
    /// Multi-line summary for logs and status displays.
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            outcome,
            version,
            blocks_updated,
            blocks_obsoleted,
            duplicate_coordinates,
            buffers_grew,
            time,
        } = self;
        write!(
            fmt,
            indoc! {"
                Mesh pass {outcome:?} at version {version} in {time:.2?}
                Blocks updated {blocks_updated}   obsoleted {blocks_obsoleted}   duplicates {duplicate_coordinates}
                Buffers grew: {buffers_grew}\
            "},
            outcome = outcome,
            version = version,
            time = time,
            blocks_updated = blocks_updated,
            blocks_obsoleted = blocks_obsoleted,
            duplicate_coordinates = duplicate_coordinates,
            buffers_grew = buffers_grew,
        )
    }
}

/// Keeps a [`BlockRegistry`] in step with the full mesh states offered by a
/// [`MeshProducer`].
///
/// Each call to [`Self::update()`] is one reconciliation pass: it asks the producer for
/// the size and version of its current state, pulls that state into the reconciler's
/// [`FlatBuffers`] if it is newer, and then copies out the geometry of only those blocks
/// whose version increased. Blocks absent from the new state are removed. Listeners
/// (see [`Listen`]) hear about every change after it has been committed.
///
/// A pass either commits completely or fails with a [`PassError`] having changed nothing
/// observable.
#[derive(Debug)]
pub struct MeshReconciler {
    buffers: FlatBuffers,
    registry: BlockRegistry,
    state: MeshState,
    paused: bool,
    notifier: Notifier<MeshEvent>,
}

impl MeshReconciler {
    /// Constructs a reconciler with empty buffers, which will be allocated by the first
    /// pass.
    pub fn new() -> Self {
        Self {
            buffers: FlatBuffers::new(),
            registry: BlockRegistry::new(),
            state: MeshState::default(),
            paused: false,
            notifier: Notifier::new(),
        }
    }

    /// Constructs a reconciler with buffers preallocated according to
    /// [`MeshingSettings::initial_block_capacity`], and paused if
    /// [`MeshingSettings::block_updates_paused`] is set.
    pub fn with_settings(settings: &MeshingSettings) -> Result<Self, BufferError> {
        Ok(Self {
            buffers: FlatBuffers::with_initial_block_capacity(settings.initial_block_capacity)?,
            paused: settings.block_updates_paused,
            ..Self::new()
        })
    }

    /// Read-only view of the blocks as of the last committed pass.
    #[inline]
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Global mesh state as of the last committed pass.
    #[inline]
    pub fn state(&self) -> MeshState {
        self.state
    }

    /// The flat buffers the producer fills. Their contents are meaningful only during a
    /// pass; this is useful for inspecting capacities.
    #[inline]
    pub fn buffers(&self) -> &FlatBuffers {
        &self.buffers
    }

    /// Returns whether block updates are paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pauses or resumes block updates. While paused, [`Self::update()`] does nothing and
    /// the producer is not consulted.
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            log::debug!("block updates {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Returns the coordinates of the block containing `point`, or [`None`] if no mesh
    /// has been committed yet.
    pub fn block_coord_for_point(&self, point: MeshPoint) -> Option<BlockCoord> {
        let MeshState {
            version,
            block_size,
            ..
        } = self.state;
        (version != 0 && block_size > 0.0).then(|| BlockCoord::containing(point, block_size))
    }

    /// Records that the collision representation of `coord` has been rebuilt from its
    /// current geometry. Returns [`false`] if there is no such block.
    pub fn mark_collider_rebuilt(&mut self, coord: BlockCoord) -> bool {
        match self.registry.get_mut(coord) {
            Some(record) => {
                let content_version = record.content_version();
                record.set_collider_version(content_version);
                true
            }
            None => false,
        }
    }

    /// Removes every block and resets the [`MeshState`], sending a single
    /// [`MeshEvent::MeshCleared`] rather than one notification per block.
    ///
    /// The flat buffers keep their capacity.
    pub fn clear(&mut self) {
        let removed = self.registry.clear();
        log::info!(
            "mesh cleared at version {} ({} blocks removed)",
            self.state.version,
            removed.len()
        );
        self.state = MeshState::default();
        self.notifier.notify(&MeshEvent::MeshCleared);
    }

    /// Performs one reconciliation pass against `producer`.
    ///
    /// Returns [`PassOutcome::Skipped`] without filling anything if the producer's version
    /// is not newer than the current one or any of its reported sizes is zero, except that
    /// a version of 0 with no blocks, while a mesh is present, clears the mesh.
    pub fn update<P>(&mut self, producer: &mut P) -> Result<PassInfo, PassError>
    where
        P: MeshProducer + ?Sized,
    {
        let start_time = Instant::now();
        if self.paused {
            return Ok(PassInfo {
                time: start_time.elapsed(),
                ..PassInfo::new(PassOutcome::Paused, self.state.version)
            });
        }

        let info = producer.mesh_info();
        let current = self.state.version;

        if info.version == 0 && current > 0 && info.sizes.block_ints == 0 {
            self.clear();
            return Ok(PassInfo {
                time: start_time.elapsed(),
                ..PassInfo::new(PassOutcome::Cleared, 0)
            });
        }
        if info.version <= current || info.sizes.any_zero() {
            return Ok(PassInfo {
                time: start_time.elapsed(),
                ..PassInfo::new(PassOutcome::Skipped, current)
            });
        }

        match self.read_and_commit(producer, info, start_time) {
            Ok(pass_info) => {
                log::debug!(
                    "mesh version {} committed: {} updated, {} obsoleted, {} blocks total",
                    pass_info.version,
                    pass_info.blocks_updated,
                    pass_info.blocks_obsoleted,
                    self.registry.len(),
                );
                Ok(pass_info)
            }
            Err(error) => {
                log::warn!(
                    "mesh pass for version {} aborted; will retry: {error}",
                    info.version
                );
                Err(error)
            }
        }
    }

    fn read_and_commit<P>(
        &mut self,
        producer: &mut P,
        info: MeshInfo,
        start_time: Instant,
    ) -> Result<PassInfo, PassError>
    where
        P: MeshProducer + ?Sized,
    {
        let MeshInfo {
            version,
            sizes,
            block_size,
        } = info;

        let buffers_grew = self.buffers.ensure_capacity(sizes)?;

        let returned = producer.fill(self.buffers.fill_target(sizes))?;
        let filled = self.buffers.filled(sizes);
        check_block_count(returned, filled)?;
        let plan = PassPlan::new(filled)?;

        // Nothing below can fail, so it is now safe to modify the registry.
        let mut events: Vec<MeshEvent> = Vec::new();
        for block in plan.blocks.iter().filter(|block| !block.superseded) {
            let (record, _) = self.registry.get_or_create(block.coord);
            record.set_mesh_version(version);
            if record.needs_content(block.version) {
                record.geometry_mut().copy_from_flat(
                    filled.vertex_floats,
                    block.vertices.clone(),
                    filled.face_ints,
                    block.faces.clone(),
                );
                record.set_content_version(block.version);
                events.push(MeshEvent::BlockUpdated(block.coord));
            }
        }
        let blocks_updated = events.len();

        let obsoleted = self.registry.remove_obsolete(version);
        let blocks_obsoleted = obsoleted.len();
        events.extend(obsoleted.into_iter().map(MeshEvent::BlockObsoleted));

        self.state = MeshState {
            version,
            block_count: sizes.block_count(),
            vertex_count: sizes.vertex_count(),
            face_count: sizes.face_count(),
            block_size,
        };
        self.notifier.notify_many(&events);

        Ok(PassInfo {
            blocks_updated,
            blocks_obsoleted,
            duplicate_coordinates: plan.duplicates,
            buffers_grew,
            time: start_time.elapsed(),
            ..PassInfo::new(PassOutcome::Committed, version)
        })
    }
}

impl Default for MeshReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Listen for MeshReconciler {
    type Msg = MeshEvent;

    fn listen<L: Listener<MeshEvent> + 'static>(&self, listener: L) {
        self.notifier.listen(listener)
    }
}

/// Checks the result of a [`MeshProducer::fill()`] exactly as [`MeshReconciler::update()`]
/// does, without keeping anything.
///
/// `returned` is the producer's block count and `filled` the buffers it wrote, truncated
/// to the sizes it reported.
pub fn validate_fill(returned: usize, filled: FilledBuffers<'_>) -> Result<(), PassError> {
    check_block_count(returned, filled)?;
    PassPlan::new(filled).map(|_| ())
}

fn check_block_count(returned: usize, filled: FilledBuffers<'_>) -> Result<(), PassError> {
    let expected = filled.sizes().block_count();
    if returned == 0 {
        Err(PassError::EmptyFill)
    } else if returned != expected {
        Err(PassError::BlockCountMismatch { returned, expected })
    } else {
        Ok(())
    }
}

/// The validated contents of one fill, with every block's position in the flat buffers.
#[derive(Debug)]
struct PassPlan {
    blocks: Vec<PlannedBlock>,
    duplicates: usize,
}

#[derive(Debug)]
struct PlannedBlock {
    coord: BlockCoord,
    version: i32,
    /// Range of global vertex numbers.
    vertices: Range<usize>,
    /// Range of global triangle numbers.
    faces: Range<usize>,
    /// A later descriptor has the same coordinates.
    superseded: bool,
}

impl PassPlan {
    /// Decodes and checks every descriptor in `filled`, without modifying anything.
    fn new(filled: FilledBuffers<'_>) -> Result<Self, PassError> {
        let sizes = filled.sizes();
        let total_vertices = sizes.vertex_floats / FLOATS_PER_VERTEX;
        let total_faces = sizes.face_ints / INDICES_PER_FACE;

        let mut blocks: Vec<PlannedBlock> = Vec::with_capacity(sizes.block_count());
        let mut last_index_of: HashMap<BlockCoord, usize> = HashMap::new();
        let mut duplicates = 0;
        let mut first_vertex = 0usize;
        let mut first_face = 0usize;

        for (index, descriptor) in BlockDescriptor::iter_from(filled.block_ints).enumerate() {
            let malformed = |reason: String| PassError::MalformedDescriptor { index, reason };

            let vertex_count = usize::try_from(descriptor.vertex_count).map_err(|_| {
                malformed(format!("negative vertex count {}", descriptor.vertex_count))
            })?;
            let face_count = usize::try_from(descriptor.face_count).map_err(|_| {
                malformed(format!("negative face count {}", descriptor.face_count))
            })?;

            let vertices = first_vertex..first_vertex + vertex_count;
            let faces = first_face..first_face + face_count;
            if vertices.end > total_vertices {
                return Err(malformed(format!(
                    "vertices {vertices:?} exceed the {total_vertices} filled"
                )));
            }
            if faces.end > total_faces {
                return Err(malformed(format!(
                    "faces {faces:?} exceed the {total_faces} filled"
                )));
            }
            if let Some(&bad) = filled.face_ints
                [faces.start * INDICES_PER_FACE..faces.end * INDICES_PER_FACE]
                .iter()
                .find(|&&global| {
                    !usize::try_from(global).is_ok_and(|global| vertices.contains(&global))
                })
            {
                return Err(malformed(format!(
                    "face index {bad} outside the block's vertices {vertices:?}"
                )));
            }

            if let Some(previous) = last_index_of.insert(descriptor.coord, index) {
                log::warn!(
                    "mesh producer sent block {} more than once (descriptors {previous} and {index}); \
                    using the last",
                    descriptor.coord
                );
                blocks[previous].superseded = true;
                duplicates += 1;
            }

            // Offsets advance for every descriptor, including superseded ones.
            first_vertex = vertices.end;
            first_face = faces.end;
            blocks.push(PlannedBlock {
                coord: descriptor.coord,
                version: descriptor.version,
                vertices,
                faces,
                superseded: false,
            });
        }

        Ok(Self { blocks, duplicates })
    }
}
