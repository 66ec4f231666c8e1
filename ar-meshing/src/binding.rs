//! Maintaining engine-side visual and collision objects for the blocks of a
//! [`MeshReconciler`].

use hashbrown::HashMap;

use crate::listen::{Listen as _, Sink};
use crate::{BlockCoord, BlockGeometry, MeshEvent, MeshReconciler};

#[cfg(test)]
mod tests;

/// How visual representations of blocks should be drawn.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[allow(clippy::exhaustive_enums)]
pub enum MaterialMode {
    /// Drawn normally.
    #[default]
    Visible,
    /// Not drawn, but still occluding and colliding.
    Invisible,
}

/// The engine-specific half of a [`RendererBinding`]: creates, updates, and destroys
/// whatever objects represent blocks in a renderer or physics engine.
///
/// Implementations should be cheap to call for [`Self::assign_geometry()`]; the binding
/// throttles calls to [`Self::rebuild_collider()`], which are presumed expensive.
pub trait GeometrySink {
    /// Per-block object, such as a scene node owning a mesh and a collider.
    type Object;

    /// Creates the object for the block at `coord`, with no geometry yet.
    fn create(&mut self, coord: BlockCoord) -> Self::Object;

    /// Replaces the object's visual geometry.
    fn assign_geometry(&mut self, object: &mut Self::Object, geometry: &BlockGeometry);

    /// Replaces the object's collision representation.
    fn rebuild_collider(&mut self, object: &mut Self::Object, geometry: &BlockGeometry);

    /// Changes the object's material.
    fn set_material(&mut self, object: &mut Self::Object, material: MaterialMode) {
        let _ = (object, material);
    }

    /// Destroys the object along with its collision representation.
    fn destroy(&mut self, object: Self::Object);
}

/// Summary of the changes one call to [`RendererBinding::apply()`] made, suitable for
/// raising a single notification per frame instead of one per block.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct BindingReport {
    /// Number of objects whose geometry was assigned.
    pub blocks_updated: usize,
    /// Number of objects whose collider was rebuilt.
    pub colliders_updated: usize,
    /// Number of objects destroyed because their block became obsolete.
    pub blocks_removed: usize,
    /// Whether all objects were destroyed because the mesh was cleared.
    pub cleared: bool,
}

impl BindingReport {
    /// Returns whether nothing happened.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Keeps one [`GeometrySink::Object`] per block of a [`MeshReconciler`].
///
/// The binding listens to the reconciler's [`MeshEvent`]s as they are sent, and acts on
/// them when [`Self::apply()`] is called, typically once per frame after
/// [`MeshReconciler::update()`].
///
/// Collision representations are rebuilt only when a block is first seen, or when its
/// content version has advanced more than the collider update throttle past the version
/// the collider was last built from.
#[derive(Debug)]
pub struct RendererBinding<O> {
    objects: HashMap<BlockCoord, O>,
    events: Sink<MeshEvent>,
    collider_update_throttle: i32,
    material: MaterialMode,
}

impl<O> RendererBinding<O> {
    /// Constructs a binding which will receive all changes made by `reconciler` from now
    /// on.
    ///
    /// `collider_update_throttle` is as in
    /// [`MeshingSettings::collider_update_throttle`](crate::MeshingSettings::collider_update_throttle).
    pub fn new(reconciler: &MeshReconciler, collider_update_throttle: i32) -> Self {
        let events = Sink::new();
        reconciler.listen(events.listener());
        Self {
            objects: HashMap::new(),
            events,
            collider_update_throttle,
            material: MaterialMode::default(),
        }
    }

    /// Number of objects currently existing.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns the object for `coord`, if there is one.
    pub fn object(&self, coord: BlockCoord) -> Option<&O> {
        self.objects.get(&coord)
    }

    #[allow(missing_docs)]
    pub fn material(&self) -> MaterialMode {
        self.material
    }

    #[allow(missing_docs)]
    pub fn collider_update_throttle(&self) -> i32 {
        self.collider_update_throttle
    }

    /// Changes the throttle for future collider rebuilds.
    pub fn set_collider_update_throttle(&mut self, throttle: i32) {
        self.collider_update_throttle = throttle;
    }

    /// Returns whether a collider built from `collider_version` is due for rebuilding from
    /// `content_version`.
    pub fn collider_due(&self, content_version: Option<i32>, collider_version: Option<i32>) -> bool {
        match (content_version, collider_version) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(content), Some(collider)) => {
                i64::from(content) - i64::from(collider)
                    > i64::from(self.collider_update_throttle.max(0))
            }
        }
    }

    /// Applies `material` to every existing object, and to every object created later.
    pub fn set_material<S>(&mut self, sink: &mut S, material: MaterialMode)
    where
        S: GeometrySink<Object = O>,
    {
        self.material = material;
        for object in self.objects.values_mut() {
            sink.set_material(object, material);
        }
    }

    /// Acts on every [`MeshEvent`] received since the last call.
    ///
    /// `reconciler` must be the one this binding was created with; it is needed mutably
    /// only to record collider rebuilds.
    pub fn apply<S>(&mut self, reconciler: &mut MeshReconciler, sink: &mut S) -> BindingReport
    where
        S: GeometrySink<Object = O>,
    {
        let mut report = BindingReport::default();
        for event in self.events.drain() {
            match event {
                MeshEvent::BlockUpdated(coord) => {
                    // The block may have been removed by a later pass whose events are
                    // also queued; then there is nothing to show.
                    let Some(record) = reconciler.registry().get(coord) else {
                        continue;
                    };
                    let collider_due =
                        self.collider_due(record.content_version(), record.collider_version());
                    let material = self.material;
                    let object = self.objects.entry(coord).or_insert_with(|| {
                        let mut object = sink.create(coord);
                        if material != MaterialMode::Visible {
                            sink.set_material(&mut object, material);
                        }
                        object
                    });
                    sink.assign_geometry(object, record.geometry());
                    report.blocks_updated += 1;

                    if collider_due {
                        sink.rebuild_collider(object, record.geometry());
                        report.colliders_updated += 1;
                        reconciler.mark_collider_rebuilt(coord);
                    }
                }
                MeshEvent::BlockObsoleted(coord) => {
                    if let Some(object) = self.objects.remove(&coord) {
                        sink.destroy(object);
                        report.blocks_removed += 1;
                    }
                }
                MeshEvent::MeshCleared => {
                    for (_, object) in self.objects.drain() {
                        sink.destroy(object);
                    }
                    report.cleared = true;
                }
            }
        }

        if !report.is_empty() {
            log::trace!("renderer binding applied {report:?}");
        }
        report
    }

    /// Destroys every object, without waiting for the reconciler to clear.
    pub fn destroy_all<S>(&mut self, sink: &mut S)
    where
        S: GeometrySink<Object = O>,
    {
        for (_, object) in self.objects.drain() {
            sink.destroy(object);
        }
    }
}
