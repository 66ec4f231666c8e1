//! Components of the `ar-meshing` command-line tool, which replays recorded mesh
//! snapshots through [`ar_meshing`] without any real renderer, and inspects snapshot
//! files.
//!
//! This is not a general-purpose library. It exists as a library so that its pieces can
//! be tested separately from the binary.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

mod config_files;
pub use config_files::*;
mod headless;
pub use headless::*;
mod inspect;
pub use inspect::*;
pub mod logging;
mod session;
pub use session::*;
