use std::fs;
use std::path::{Path, PathBuf};

use ar_meshing::{FillTarget, MeshInfo, MeshProducer, PassError, validate_fill};

use crate::{MeshSnapshot, SnapshotError};

const FILE_PREFIX: &str = "mesh_";
const FILE_SUFFIX: &str = ".bin";

/// Name of the snapshot file for mesh version `version`: `mesh_<version>.bin`.
pub fn snapshot_file_name(version: u32) -> String {
    format!("{FILE_PREFIX}{version}{FILE_SUFFIX}")
}

/// Parses the mesh version out of a file name produced by [`snapshot_file_name()`].
///
/// Any directory part of `path` is ignored.
pub fn version_from_file_name(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// Reads the producer's current full mesh state into a new [`MeshSnapshot`].
///
/// The fill is checked exactly as a reconciliation pass would check it. Returns
/// `Ok(None)` if the producer currently offers no mesh (any reported size is zero);
/// otherwise returns the offered mesh version along with the snapshot.
pub fn capture_snapshot<P>(producer: &mut P) -> Result<Option<(u32, MeshSnapshot)>, SnapshotError>
where
    P: MeshProducer + ?Sized,
{
    let MeshInfo {
        version,
        sizes,
        block_size,
    } = producer.mesh_info();
    if sizes.any_zero() {
        log::debug!("not capturing mesh version {version}: nothing offered");
        return Ok(None);
    }

    let mut snapshot = MeshSnapshot {
        block_ints: vec![0; sizes.block_ints],
        vertex_floats: vec![0.0; sizes.vertex_floats],
        face_ints: vec![0; sizes.face_ints],
        block_size,
    };
    let returned = producer
        .fill(FillTarget {
            block_ints: &mut snapshot.block_ints,
            vertex_floats: &mut snapshot.vertex_floats,
            face_ints: &mut snapshot.face_ints,
        })
        .map_err(PassError::from)?;
    validate_fill(returned, snapshot.as_filled())?;

    log::debug!("captured mesh version {version} with {returned} blocks");
    Ok(Some((version, snapshot)))
}

/// Writes `snapshot` into `directory`, named according to [`snapshot_file_name()`],
/// creating the directory if necessary. Returns the path of the written file.
pub fn save_in_directory(
    directory: &Path,
    version: u32,
    snapshot: &MeshSnapshot,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(directory)?;
    let path = directory.join(snapshot_file_name(version));
    snapshot.save(&path)?;
    log::info!("saved mesh version {version} to {}", path.display());
    Ok(path)
}
