//! Mesh snapshot files for [`ar_meshing`]: capturing a producer's full mesh state,
//! saving and loading it, and playing snapshots back as a [`MeshProducer`].
//!
//! A snapshot file holds exactly what a producer writes into the flat buffers during one
//! fill, plus the block size:
//!
//! | Offset | Size | Contents |
//! |-------:|-----:|----------|
//! | 0      | 16   | Magic word: ASCII `6DBLOCKMESH` padded with NUL bytes. |
//! | 16     | 4    | Number of block descriptor slots (`i32`). |
//! | 20     | 4    | Number of vertex buffer slots (`i32`). |
//! | 24     | 4    | Number of face index slots (`i32`). |
//! | 28     | 4    | Block edge length in meters (`f32`). |
//! | 32     | …    | Block descriptor slots, then vertex slots, then face index slots. |
//!
//! All numbers are little-endian. There is no padding between sections.
//!
//! Files are conventionally named `mesh_<version>.bin`; see [`snapshot_file_name()`].

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

#[cfg(doc)]
use ar_meshing::MeshProducer;

mod capture;
pub use capture::*;
mod playback;
pub use playback::*;
mod snapshot;
pub use snapshot::*;

#[cfg(test)]
mod tests;
