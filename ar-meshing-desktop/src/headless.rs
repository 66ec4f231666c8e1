use ar_meshing::{BlockCoord, BlockGeometry, GeometrySink, MaterialMode};

/// Object created by [`HeadlessSink`] for each block: a record of what a renderer would
/// have been given.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessObject {
    coord: BlockCoord,
    triangle_count: usize,
    collider_triangle_count: Option<usize>,
    material: MaterialMode,
}

impl HeadlessObject {
    #[allow(missing_docs)]
    pub fn coord(&self) -> BlockCoord {
        self.coord
    }

    /// Number of triangles in the visual geometry last assigned.
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Number of triangles in the collider, or [`None`] if no collider was built yet.
    pub fn collider_triangle_count(&self) -> Option<usize> {
        self.collider_triangle_count
    }

    #[allow(missing_docs)]
    pub fn material(&self) -> MaterialMode {
        self.material
    }
}

/// Running totals kept by [`HeadlessSink`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct HeadlessStats {
    /// Objects currently existing.
    pub live_objects: usize,
    /// Sum of the visual triangle counts of all live objects.
    pub live_triangles: usize,
    /// Total geometry assignments so far.
    pub geometry_assignments: usize,
    /// Total collider rebuilds so far.
    pub collider_rebuilds: usize,
    /// Total objects destroyed so far.
    pub destroyed: usize,
}

/// [`GeometrySink`] that renders nothing and only counts.
#[derive(Clone, Debug, Default)]
pub struct HeadlessSink {
    stats: HeadlessStats,
}

impl HeadlessSink {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(missing_docs)]
    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }
}

impl GeometrySink for HeadlessSink {
    type Object = HeadlessObject;

    fn create(&mut self, coord: BlockCoord) -> HeadlessObject {
        self.stats.live_objects += 1;
        HeadlessObject {
            coord,
            triangle_count: 0,
            collider_triangle_count: None,
            material: MaterialMode::Visible,
        }
    }

    fn assign_geometry(&mut self, object: &mut HeadlessObject, geometry: &BlockGeometry) {
        self.stats.live_triangles -= object.triangle_count;
        object.triangle_count = geometry.triangle_count();
        self.stats.live_triangles += object.triangle_count;
        self.stats.geometry_assignments += 1;
    }

    fn rebuild_collider(&mut self, object: &mut HeadlessObject, geometry: &BlockGeometry) {
        object.collider_triangle_count = Some(geometry.triangle_count());
        self.stats.collider_rebuilds += 1;
    }

    fn set_material(&mut self, object: &mut HeadlessObject, material: MaterialMode) {
        object.material = material;
    }

    fn destroy(&mut self, object: HeadlessObject) {
        self.stats.live_objects -= 1;
        self.stats.live_triangles -= object.triangle_count;
        self.stats.destroyed += 1;
    }
}
