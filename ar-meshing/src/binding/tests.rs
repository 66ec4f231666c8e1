use pretty_assertions::assert_eq;

use crate::testing::{BlockFixture, FixtureProducer, RecordingSink, SinkOp};
use crate::{BlockCoord, MeshReconciler};

use super::{BindingReport, MaterialMode, RendererBinding};

const A: BlockCoord = BlockCoord::new(0, 0, 0);
const B: BlockCoord = BlockCoord::new(0, 0, 1);

struct Tester {
    reconciler: MeshReconciler,
    producer: FixtureProducer,
    binding: RendererBinding<BlockCoord>,
    sink: RecordingSink,
}

impl Tester {
    fn new(collider_update_throttle: i32) -> Self {
        let reconciler = MeshReconciler::new();
        let binding = RendererBinding::new(&reconciler, collider_update_throttle);
        Self {
            reconciler,
            producer: FixtureProducer::new(1.0),
            binding,
            sink: RecordingSink::new(),
        }
    }

    fn pass_and_apply(&mut self, version: u32, blocks: &[BlockFixture]) -> BindingReport {
        self.producer.set_state(version, blocks);
        self.reconciler.update(&mut self.producer).unwrap();
        self.binding.apply(&mut self.reconciler, &mut self.sink)
    }
}

#[test]
fn create_update_destroy() {
    let mut t = Tester::new(0);

    let report = t.pass_and_apply(1, &[BlockFixture::fan(A, 1, 3), BlockFixture::fan(B, 1, 4)]);
    assert_eq!(
        report,
        BindingReport {
            blocks_updated: 2,
            colliders_updated: 2,
            blocks_removed: 0,
            cleared: false,
        }
    );
    assert_eq!(
        t.sink.drain(),
        vec![
            SinkOp::Create(A),
            SinkOp::Assign(A, 1),
            SinkOp::RebuildCollider(A),
            SinkOp::Create(B),
            SinkOp::Assign(B, 2),
            SinkOp::RebuildCollider(B),
        ]
    );

    let report = t.pass_and_apply(2, &[BlockFixture::fan(A, 2, 5)]);
    assert_eq!((report.blocks_updated, report.blocks_removed), (1, 1));
    assert_eq!(
        t.sink.drain(),
        vec![
            SinkOp::Assign(A, 3),
            SinkOp::RebuildCollider(A),
            SinkOp::Destroy(B),
        ]
    );
    assert_eq!(t.binding.object_count(), 1);
    assert_eq!(t.sink.live.iter().copied().collect::<Vec<_>>(), vec![A]);
}

#[test]
fn nothing_to_apply() {
    let mut t = Tester::new(0);
    t.pass_and_apply(1, &[BlockFixture::fan(A, 1, 3)]);
    t.sink.drain();

    let report = t.pass_and_apply(2, &[BlockFixture::fan(A, 1, 3)]);
    assert!(report.is_empty());
    assert_eq!(t.sink.drain(), vec![]);
}

#[test]
fn cleared_destroys_everything_at_once() {
    let mut t = Tester::new(0);
    t.pass_and_apply(1, &[BlockFixture::fan(A, 1, 3), BlockFixture::fan(B, 1, 3)]);
    t.sink.drain();

    t.producer.set_reset();
    t.reconciler.update(&mut t.producer).unwrap();
    let report = t.binding.apply(&mut t.reconciler, &mut t.sink);

    assert!(report.cleared);
    assert_eq!(report.blocks_removed, 0);
    assert_eq!(t.binding.object_count(), 0);
    assert!(t.sink.live.is_empty());
    let mut ops = t.sink.drain();
    ops.sort_by_key(|op| format!("{op:?}"));
    assert_eq!(ops, vec![SinkOp::Destroy(A), SinkOp::Destroy(B)]);
}

#[test]
fn events_from_several_passes_applied_together() {
    let mut t = Tester::new(0);
    t.producer.set_state(1, &[BlockFixture::fan(A, 1, 3), BlockFixture::fan(B, 1, 3)]);
    t.reconciler.update(&mut t.producer).unwrap();
    t.producer.set_state(2, &[BlockFixture::fan(A, 1, 3)]);
    t.reconciler.update(&mut t.producer).unwrap();

    let report = t.binding.apply(&mut t.reconciler, &mut t.sink);

    // B was gone by the time of applying, so it never got an object.
    assert_eq!(report.blocks_updated, 1);
    assert_eq!(report.blocks_removed, 0);
    assert_eq!(
        t.sink.drain(),
        vec![
            SinkOp::Create(A),
            SinkOp::Assign(A, 1),
            SinkOp::RebuildCollider(A),
        ]
    );
}

/// Content versions 0 through 4 with throttle 3: the collider is built on first sight and
/// again only once the content is more than 3 versions ahead of it.
#[test]
fn collider_throttle() {
    let mut t = Tester::new(3);
    let mut rebuilt_at = Vec::new();
    for content_version in 0..=4 {
        let report = t.pass_and_apply(
            content_version as u32 + 1,
            &[BlockFixture::fan(A, content_version, 3)],
        );
        assert_eq!(report.blocks_updated, 1);
        if report.colliders_updated > 0 {
            rebuilt_at.push(content_version);
        }
    }
    assert_eq!(rebuilt_at, vec![0, 4]);
    assert_eq!(
        t.reconciler.registry().get(A).unwrap().collider_version(),
        Some(4)
    );
}

#[rstest::rstest]
fn non_positive_throttle_always_rebuilds(#[values(0, -5)] throttle: i32) {
    let mut t = Tester::new(throttle);
    for content_version in 1..=3 {
        let report = t.pass_and_apply(
            content_version as u32,
            &[BlockFixture::fan(A, content_version, 3)],
        );
        assert_eq!(report.colliders_updated, 1);
    }
}

#[test]
fn collider_due_rule() {
    let t = Tester::new(2);
    assert!(!t.binding.collider_due(None, None));
    assert!(t.binding.collider_due(Some(0), None));
    assert!(!t.binding.collider_due(Some(2), Some(0)));
    assert!(t.binding.collider_due(Some(3), Some(0)));
    assert!(!t.binding.collider_due(Some(i32::MIN), Some(i32::MAX)));
}

#[test]
fn material_applies_to_existing_and_new_objects() {
    let mut t = Tester::new(0);
    t.pass_and_apply(1, &[BlockFixture::fan(A, 1, 3)]);
    t.sink.drain();

    t.binding
        .set_material(&mut t.sink, MaterialMode::Invisible);
    assert_eq!(
        t.sink.drain(),
        vec![SinkOp::SetMaterial(A, MaterialMode::Invisible)]
    );

    t.pass_and_apply(2, &[BlockFixture::fan(A, 1, 3), BlockFixture::fan(B, 1, 3)]);
    assert_eq!(
        t.sink.drain(),
        vec![
            SinkOp::Create(B),
            SinkOp::SetMaterial(B, MaterialMode::Invisible),
            SinkOp::Assign(B, 1),
            SinkOp::RebuildCollider(B),
        ]
    );
}

#[test]
fn destroy_all() {
    let mut t = Tester::new(0);
    t.pass_and_apply(1, &[BlockFixture::fan(A, 1, 3)]);
    t.binding.destroy_all(&mut t.sink);
    assert_eq!(t.binding.object_count(), 0);
    assert!(t.sink.live.is_empty());
}
