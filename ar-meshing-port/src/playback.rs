use std::fs;
use std::path::Path;

use ar_meshing::{FillTarget, MeshInfo, MeshProducer, ProducerError};

use crate::{MeshSnapshot, SnapshotError, version_from_file_name};

/// Version used for snapshots whose file name does not follow [`crate::snapshot_file_name()`].
pub const DEFAULT_VERSION: u32 = 1;

/// A [`MeshProducer`] which always offers the same [`MeshSnapshot`].
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotProducer {
    version: u32,
    snapshot: MeshSnapshot,
}

impl SnapshotProducer {
    /// Offers `snapshot` as mesh version `version`.
    pub fn new(version: u32, snapshot: MeshSnapshot) -> Self {
        Self { version, snapshot }
    }

    /// Loads a snapshot file, taking the version from its name if possible.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let version = version_from_file_name(path).unwrap_or(DEFAULT_VERSION);
        Ok(Self::new(version, MeshSnapshot::load(path)?))
    }

    #[allow(missing_docs)]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[allow(missing_docs)]
    pub fn snapshot(&self) -> &MeshSnapshot {
        &self.snapshot
    }
}

impl MeshProducer for SnapshotProducer {
    fn mesh_info(&mut self) -> MeshInfo {
        MeshInfo {
            version: self.version,
            sizes: self.snapshot.sizes(),
            block_size: self.snapshot.block_size,
        }
    }

    fn fill(&mut self, target: FillTarget<'_>) -> Result<usize, ProducerError> {
        fill_from(&self.snapshot, target)
    }
}

/// A [`MeshProducer`] which offers a series of snapshots in ascending version order,
/// moving on to the next one each time it is asked for [`MeshProducer::mesh_info()`].
///
/// After the last snapshot it keeps offering the last one, which a reconciler will
/// consider unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotSequence {
    snapshots: Vec<(u32, MeshSnapshot)>,
    /// Index of the snapshot most recently offered.
    current: Option<usize>,
}

impl SnapshotSequence {
    /// Constructs a sequence from versioned snapshots, which are sorted by version.
    pub fn new(mut snapshots: Vec<(u32, MeshSnapshot)>) -> Self {
        snapshots.sort_by_key(|&(version, _)| version);
        Self {
            snapshots,
            current: None,
        }
    }

    /// Loads a directory as [`Self::load_directory()`] does, or a single snapshot file as
    /// a sequence of one, versioned as [`SnapshotProducer::load()`] does.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        if path.is_dir() {
            return Self::load_directory(path);
        }
        let SnapshotProducer { version, snapshot } = SnapshotProducer::load(path)?;
        Ok(Self::new(vec![(version, snapshot)]))
    }

    /// Loads every file in `directory` whose name follows
    /// [`crate::snapshot_file_name()`]. Other files are ignored.
    pub fn load_directory(directory: &Path) -> Result<Self, SnapshotError> {
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let Some(version) = version_from_file_name(&path) else {
                log::debug!("skipping {}: not a snapshot file name", path.display());
                continue;
            };
            snapshots.push((version, MeshSnapshot::load(&path)?));
        }
        log::debug!(
            "loaded {} mesh snapshots from {}",
            snapshots.len(),
            directory.display()
        );
        Ok(Self::new(snapshots))
    }

    /// Number of snapshots in the sequence.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Versions of all snapshots, in the order they will be offered.
    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.snapshots.iter().map(|&(version, _)| version)
    }

    /// Returns whether the last snapshot has been offered.
    pub fn is_finished(&self) -> bool {
        match self.current {
            Some(index) => index + 1 >= self.snapshots.len(),
            None => self.snapshots.is_empty(),
        }
    }

    /// Starts again from the first snapshot.
    pub fn rewind(&mut self) {
        self.current = None;
    }
}

impl MeshProducer for SnapshotSequence {
    fn mesh_info(&mut self) -> MeshInfo {
        let next = self.current.map_or(0, |index| index + 1);
        if next < self.snapshots.len() {
            self.current = Some(next);
        }
        match self.current.map(|index| &self.snapshots[index]) {
            Some((version, snapshot)) => MeshInfo {
                version: *version,
                sizes: snapshot.sizes(),
                block_size: snapshot.block_size,
            },
            None => MeshInfo::default(),
        }
    }

    fn fill(&mut self, target: FillTarget<'_>) -> Result<usize, ProducerError> {
        match self.current {
            Some(index) => fill_from(&self.snapshots[index].1, target),
            None => Ok(0),
        }
    }
}

fn fill_from(snapshot: &MeshSnapshot, target: FillTarget<'_>) -> Result<usize, ProducerError> {
    let sizes = snapshot.sizes();
    if target.sizes() != sizes {
        return Err(ProducerError::Other(format!(
            "fill target sizes {:?} do not match snapshot sizes {sizes:?}",
            target.sizes()
        )));
    }
    target.block_ints.copy_from_slice(&snapshot.block_ints);
    target.vertex_floats.copy_from_slice(&snapshot.vertex_floats);
    target.face_ints.copy_from_slice(&snapshot.face_ints);
    Ok(sizes.block_count())
}
