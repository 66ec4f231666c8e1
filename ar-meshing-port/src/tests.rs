use std::path::Path;

use pretty_assertions::assert_eq;

use ar_meshing::testing::{BlockFixture, FixtureProducer, Misbehavior};
use ar_meshing::{BlockCoord, BufferKind, MeshEvent, MeshReconciler, PassError, PassOutcome};
use ar_meshing::listen::{Listen as _, Sink};

use crate::{
    HEADER_LEN, MAGIC, MeshSnapshot, SnapshotError, SnapshotProducer, SnapshotSequence,
    capture_snapshot, save_in_directory, snapshot_file_name, version_from_file_name,
};

fn example_producer(version: u32) -> FixtureProducer {
    let mut producer = FixtureProducer::new(1.4);
    producer.set_state(
        version,
        &[
            BlockFixture::fan([0, 0, 0], 1, 4),
            BlockFixture::fan([1, -2, 3], 5, 3),
        ],
    );
    producer
}

fn example_snapshot() -> MeshSnapshot {
    capture_snapshot(&mut example_producer(7)).unwrap().unwrap().1
}

#[test]
fn header_layout() {
    let snapshot = MeshSnapshot {
        block_ints: vec![1, 2, 3, 0, 0, -1],
        vertex_floats: vec![0.5; 6],
        face_ints: vec![],
        block_size: 1.4,
    };
    let bytes = snapshot.to_bytes();

    assert_eq!(HEADER_LEN, 32);
    assert_eq!(&bytes[..16], b"6DBLOCKMESH\0\0\0\0\0");
    assert_eq!(&bytes[16..20], &6i32.to_le_bytes());
    assert_eq!(&bytes[20..24], &6i32.to_le_bytes());
    assert_eq!(&bytes[24..28], &0i32.to_le_bytes());
    assert_eq!(&bytes[28..32], &1.4f32.to_le_bytes());
    assert_eq!(&bytes[32..36], &1i32.to_le_bytes());
    assert_eq!(&bytes[52..56], &(-1i32).to_le_bytes());
    assert_eq!(&bytes[56..60], &0.5f32.to_le_bytes());
    assert_eq!(bytes.len(), 32 + 6 * 4 + 6 * 4);
    assert_eq!(bytes.len(), snapshot.encoded_len());
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = example_snapshot();

    let path = save_in_directory(&dir.path().join("meshes"), 7, &snapshot).unwrap();

    assert_eq!(path.file_name().unwrap(), "mesh_7.bin");
    let loaded = MeshSnapshot::load(&path).unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.block_size, 1.4);
}

#[test]
fn reader_writer_round_trip() {
    let snapshot = example_snapshot();
    let mut bytes = Vec::new();
    snapshot.write_to(&mut bytes).unwrap();
    assert_eq!(MeshSnapshot::read_from(bytes.as_slice()).unwrap(), snapshot);
}

#[test]
fn bad_magic() {
    let mut bytes = example_snapshot().to_bytes();
    bytes[0] = b'7';
    let error = MeshSnapshot::from_bytes(&bytes).unwrap_err();
    assert!(matches!(error, SnapshotError::BadMagic { .. }), "{error:?}");
    assert_eq!(
        error.to_string(),
        r#"not a mesh snapshot (magic word was "7DBLOCKMESH\x00\x00\x00\x00\x00")"#
    );
}

#[test]
fn truncated() {
    let bytes = example_snapshot().to_bytes();
    let error = MeshSnapshot::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(
        matches!(
            error,
            SnapshotError::Truncated { expected, actual } if expected == actual + 1
        ),
        "{error:?}"
    );

    let error = MeshSnapshot::from_bytes(&MAGIC).unwrap_err();
    assert!(
        matches!(
            error,
            SnapshotError::Truncated {
                expected: 32,
                actual: 16
            }
        ),
        "{error:?}"
    );
}

#[test]
fn negative_length() {
    let mut bytes = example_snapshot().to_bytes();
    bytes[24..28].copy_from_slice(&(-3i32).to_le_bytes());
    let error = MeshSnapshot::from_bytes(&bytes).unwrap_err();
    assert!(
        matches!(
            error,
            SnapshotError::NegativeLength {
                buffer: BufferKind::Face,
                length: -3
            }
        ),
        "{error:?}"
    );
}

#[test]
fn unaligned_vertex_buffer() {
    let snapshot = MeshSnapshot {
        block_ints: vec![0; 6],
        vertex_floats: vec![0.0; 9],
        face_ints: vec![0; 3],
        block_size: 1.0,
    };
    let error = MeshSnapshot::from_bytes(&snapshot.to_bytes()).unwrap_err();
    assert!(
        matches!(error, SnapshotError::UnalignedVertexBuffer { length: 9 }),
        "{error:?}"
    );
}

#[test]
fn trailing_bytes_are_ignored() {
    let snapshot = example_snapshot();
    let mut bytes = snapshot.to_bytes();
    bytes.extend([1, 2, 3]);
    assert_eq!(MeshSnapshot::from_bytes(&bytes).unwrap(), snapshot);
}

#[test]
fn file_names() {
    assert_eq!(snapshot_file_name(42), "mesh_42.bin");
    assert_eq!(version_from_file_name(Path::new("a/b/mesh_42.bin")), Some(42));
    assert_eq!(version_from_file_name(Path::new("mesh_.bin")), None);
    assert_eq!(version_from_file_name(Path::new("mesh_42.json")), None);
    assert_eq!(version_from_file_name(Path::new("other_42.bin")), None);
}

#[test]
fn capture_nothing_offered() {
    let mut producer = FixtureProducer::new(1.0);
    assert_eq!(capture_snapshot(&mut producer).unwrap(), None);
    assert_eq!(producer.fill_calls, 0);
}

#[test]
fn capture_rejects_short_fill() {
    let mut producer = example_producer(3);
    producer.misbehave_on_next_fill(Misbehavior::ReturnStatus(1));
    let error = capture_snapshot(&mut producer).unwrap_err();
    assert!(
        matches!(
            error,
            SnapshotError::Producer(PassError::BlockCountMismatch {
                returned: 1,
                expected: 2
            })
        ),
        "{error:?}"
    );
}

#[test]
fn capture_matches_producer_encoding() {
    let mut producer = example_producer(9);
    let (version, snapshot) = capture_snapshot(&mut producer).unwrap().unwrap();
    assert_eq!(version, 9);
    assert_eq!(snapshot.block_ints, producer.encoded().block_ints);
    assert_eq!(snapshot.vertex_floats, producer.encoded().vertex_floats);
    assert_eq!(snapshot.face_ints, producer.encoded().face_ints);
    assert_eq!(
        snapshot.descriptors().map(|d| d.coord).collect::<Vec<_>>(),
        vec![BlockCoord::new(0, 0, 0), BlockCoord::new(1, -2, 3)]
    );
}

#[test]
fn snapshot_producer_playback_matches_live() {
    let mut live = MeshReconciler::new();
    live.update(&mut example_producer(7)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = save_in_directory(dir.path(), 7, &example_snapshot()).unwrap();
    let mut played = MeshReconciler::new();
    let mut producer = SnapshotProducer::load(&path).unwrap();
    assert_eq!(producer.version(), 7);
    let info = played.update(&mut producer).unwrap();

    assert_eq!(info.outcome, PassOutcome::Committed);
    assert_eq!(played.registry(), live.registry());
    assert_eq!(played.state(), live.state());

    // Offering the same snapshot again changes nothing.
    let info = played.update(&mut producer).unwrap();
    assert_eq!(info.outcome, PassOutcome::Skipped);
}

#[test]
fn snapshot_producer_default_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recording.bin");
    example_snapshot().save(&path).unwrap();
    assert_eq!(SnapshotProducer::load(&path).unwrap().version(), 1);
}

#[test]
fn sequence_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    let first = BlockFixture::fan([0, 0, 0], 1, 3);
    let second = BlockFixture::fan([0, 0, 1], 1, 3);
    for (version, blocks) in [(12, vec![second.clone()]), (3, vec![first.clone()])] {
        let mut producer = FixtureProducer::new(1.0);
        producer.set_state(version, &blocks);
        let (version, snapshot) = capture_snapshot(&mut producer).unwrap().unwrap();
        save_in_directory(dir.path(), version, &snapshot).unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "not a snapshot").unwrap();

    let mut sequence = SnapshotSequence::load_directory(dir.path()).unwrap();
    assert_eq!(sequence.versions().collect::<Vec<_>>(), vec![3, 12]);
    assert!(!sequence.is_finished());

    let mut reconciler = MeshReconciler::new();
    let events = Sink::new();
    reconciler.listen(events.listener());

    reconciler.update(&mut sequence).unwrap();
    assert_eq!(events.drain(), vec![MeshEvent::BlockUpdated(first.coord)]);
    reconciler.update(&mut sequence).unwrap();
    assert_eq!(
        events.drain(),
        vec![
            MeshEvent::BlockUpdated(second.coord),
            MeshEvent::BlockObsoleted(first.coord),
        ]
    );
    assert!(sequence.is_finished());

    let info = reconciler.update(&mut sequence).unwrap();
    assert_eq!(info.outcome, PassOutcome::Skipped);
    assert_eq!(events.drain(), vec![]);
}

#[test]
fn sequence_from_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = save_in_directory(dir.path(), 4, &example_snapshot()).unwrap();
    let sequence = SnapshotSequence::load(&path).unwrap();
    assert_eq!(sequence.versions().collect::<Vec<_>>(), vec![4]);

    let sequence = SnapshotSequence::load(dir.path()).unwrap();
    assert_eq!(sequence.len(), 1);
}

#[test]
fn empty_sequence_offers_nothing() {
    let mut sequence = SnapshotSequence::new(vec![]);
    assert!(sequence.is_finished());
    let mut reconciler = MeshReconciler::new();
    let info = reconciler.update(&mut sequence).unwrap();
    assert_eq!(info.outcome, PassOutcome::Skipped);
}
