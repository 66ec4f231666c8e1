use core::fmt;

use hashbrown::HashMap;

use crate::{BlockCoord, BlockGeometry};

/// Per-block state retained by a [`BlockRegistry`].
///
/// The geometry is exclusively owned by the record; it is never aliased with the flat
/// buffers the producer writes into.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBlockRecord {
    geometry: BlockGeometry,
    mesh_version: u32,
    content_version: Option<i32>,
    collider_version: Option<i32>,
}

impl MeshBlockRecord {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The block's current geometry.
    #[inline]
    pub fn geometry(&self) -> &BlockGeometry {
        &self.geometry
    }

    /// Mesh version of the most recent pass in which this block was present.
    ///
    /// A record whose mesh version differs from the reconciler's current version is
    /// obsolete and will be removed at the end of that pass.
    #[inline]
    pub fn mesh_version(&self) -> u32 {
        self.mesh_version
    }

    /// Block version of the geometry currently held, or [`None`] if no geometry has been
    /// copied yet.
    #[inline]
    pub fn content_version(&self) -> Option<i32> {
        self.content_version
    }

    /// Block version of the geometry the collision representation was last rebuilt from,
    /// or [`None`] if it never has been.
    #[inline]
    pub fn collider_version(&self) -> Option<i32> {
        self.collider_version
    }

    /// Returns whether the geometry needs replacing to reach block version `version`.
    #[inline]
    pub fn needs_content(&self, version: i32) -> bool {
        self.content_version.is_none_or(|current| current < version)
    }

    pub(crate) fn geometry_mut(&mut self) -> &mut BlockGeometry {
        &mut self.geometry
    }

    pub(crate) fn set_mesh_version(&mut self, version: u32) {
        self.mesh_version = version;
    }

    pub(crate) fn set_content_version(&mut self, version: i32) {
        self.content_version = Some(version);
    }

    pub(crate) fn set_collider_version(&mut self, version: Option<i32>) {
        self.collider_version = version;
    }
}

/// Mapping from [`BlockCoord`] to the [`MeshBlockRecord`] for that block.
///
/// Only the [`MeshReconciler`](crate::MeshReconciler) that owns a registry may modify it;
/// everyone else gets read-only access through
/// [`MeshReconciler::registry()`](crate::MeshReconciler::registry).
#[derive(Clone, Default, PartialEq)]
pub struct BlockRegistry {
    blocks: HashMap<BlockCoord, MeshBlockRecord>,
}

impl BlockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `coord`, if that block is currently in the mesh.
    #[inline]
    pub fn get(&self, coord: BlockCoord) -> Option<&MeshBlockRecord> {
        self.blocks.get(&coord)
    }

    /// Returns the geometry for `coord`, if that block is currently in the mesh.
    pub fn geometry(&self, coord: BlockCoord) -> Option<&BlockGeometry> {
        self.get(coord).map(MeshBlockRecord::geometry)
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn contains(&self, coord: BlockCoord) -> bool {
        self.blocks.contains_key(&coord)
    }

    /// Number of blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[allow(missing_docs)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates over all blocks, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockCoord, &MeshBlockRecord)> + '_ {
        self.blocks.iter().map(|(&coord, record)| (coord, record))
    }

    /// Returns all block coordinates in ascending order.
    pub fn sorted_coords(&self) -> Vec<BlockCoord> {
        let mut coords: Vec<BlockCoord> = self.blocks.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Memory occupied by all block geometry.
    pub fn total_byte_size(&self) -> usize {
        self.blocks
            .values()
            .map(|record| record.geometry().total_byte_size())
            .sum()
    }

    /// Returns the record for `coord`, creating an empty one if there is none.
    /// The boolean is true if the record was created.
    pub(crate) fn get_or_create(&mut self, coord: BlockCoord) -> (&mut MeshBlockRecord, bool) {
        let mut created = false;
        let record = self.blocks.entry(coord).or_insert_with(|| {
            created = true;
            MeshBlockRecord::new()
        });
        (record, created)
    }

    pub(crate) fn get_mut(&mut self, coord: BlockCoord) -> Option<&mut MeshBlockRecord> {
        self.blocks.get_mut(&coord)
    }

    /// Removes every record whose mesh version is not `current`, returning their
    /// coordinates in ascending order.
    pub(crate) fn remove_obsolete(&mut self, current: u32) -> Vec<BlockCoord> {
        let mut removed = Vec::new();
        self.blocks.retain(|&coord, record| {
            let keep = record.mesh_version() == current;
            if !keep {
                removed.push(coord);
            }
            keep
        });
        removed.sort_unstable();
        removed
    }

    /// Removes every record, returning their coordinates in ascending order.
    pub(crate) fn clear(&mut self) -> Vec<BlockCoord> {
        let mut removed: Vec<BlockCoord> = self.blocks.drain().map(|(coord, _)| coord).collect();
        removed.sort_unstable();
        removed
    }
}

impl fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sorted so that the output is deterministic.
        let mut entries: Vec<_> = self.blocks.iter().collect();
        entries.sort_unstable_by_key(|&(&coord, _)| coord);
        f.debug_map().entries(entries).finish()
    }
}
