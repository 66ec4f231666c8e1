//! Reconciliation of a versioned, block-partitioned environment mesh into a set of
//! per-block geometry updates.
//!
//! An external awareness subsystem (the [`MeshProducer`]) periodically offers the *full*
//! current mesh as three flat numeric buffers: block descriptors, vertices, and face
//! indices. [`MeshReconciler`] pulls that data into its [`FlatBuffers`], works out which
//! blocks are new, changed, or gone since the previous pass, and keeps an owned copy of
//! each block's geometry in its [`BlockRegistry`]. Consumers hear about changes through
//! [`MeshEvent`]s and never see partially written or stale geometry: a pass either commits
//! completely or leaves everything as it was.
//!
//! # Getting started
//!
//! 1. Implement [`MeshProducer`] for whatever delivers mesh data (a native meshing library,
//!    a network session, or a recorded snapshot).
//! 2. Create a [`MeshReconciler`] and call [`MeshReconciler::update()`] each time new data
//!    may be available.
//! 3. To maintain engine-side objects, implement [`GeometrySink`] and drive a
//!    [`RendererBinding`] after each pass.
//!
//! Nothing here creates threads; a pass runs synchronously on the caller's thread.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

mod binding;
pub use binding::*;
mod buffers;
pub use buffers::*;
mod coord;
pub use coord::*;
mod geometry;
pub use geometry::*;
pub mod listen;
mod producer;
pub use producer::*;
mod reconcile;
pub use reconcile::*;
mod registry;
pub use registry::*;
mod settings;
pub use settings::*;
#[doc(hidden)]
pub mod testing;
