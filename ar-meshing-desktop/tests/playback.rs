//! Replaying recorded snapshot directories end to end.

use std::path::Path;

use pretty_assertions::assert_eq;

use ar_meshing::testing::{BlockFixture, FixtureProducer};
use ar_meshing::{MeshingSettings, PassOutcome};
use ar_meshing_desktop::{PlaybackSession, SettingsArgs, inspection_text};
use ar_meshing_port::{
    MeshSnapshot, SnapshotSequence, capture_snapshot, save_in_directory, version_from_file_name,
};

/// Records three versions of a small scene: two blocks appear, one changes and a third
/// appears, then the first disappears.
fn record(directory: &Path) {
    let states: [(u32, Vec<BlockFixture>); 3] = [
        (
            2,
            vec![
                BlockFixture::fan([0, 0, 0], 1, 4),
                BlockFixture::fan([1, 0, 0], 1, 3),
            ],
        ),
        (
            5,
            vec![
                BlockFixture::fan([0, 0, 0], 1, 4),
                BlockFixture::fan([1, 0, 0], 2, 6),
                BlockFixture::fan([0, 0, 1], 1, 3),
            ],
        ),
        (
            9,
            vec![
                BlockFixture::fan([1, 0, 0], 2, 6),
                BlockFixture::fan([0, 0, 1], 1, 3),
            ],
        ),
    ];
    let mut producer = FixtureProducer::new(1.4);
    for (version, blocks) in states {
        producer.set_state(version, &blocks);
        let (version, snapshot) = capture_snapshot(&mut producer).unwrap().unwrap();
        save_in_directory(directory, version, &snapshot).unwrap();
    }
}

fn fast_settings(directory: &Path) -> MeshingSettings {
    SettingsArgs {
        no_config_files: true,
        set: vec![("target_frame_rate".to_owned(), serde_json::json!(1000))],
        ..SettingsArgs::default()
    }
    .build_settings_in(directory)
    .unwrap()
}

#[test]
fn play_recorded_directory() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path());

    let sequence = SnapshotSequence::load(dir.path()).unwrap();
    let mut session = PlaybackSession::new(sequence, &fast_settings(dir.path())).unwrap();

    let mut reports = Vec::new();
    session
        .play_to_end(|step| {
            reports.push((
                step.pass.version,
                step.pass.outcome,
                step.binding.blocks_updated,
                step.binding.blocks_removed,
            ));
        })
        .unwrap();

    assert_eq!(
        reports,
        vec![
            (2, PassOutcome::Committed, 2, 0),
            (5, PassOutcome::Committed, 2, 0),
            (9, PassOutcome::Committed, 0, 1),
        ]
    );
    let stats = session.sink().stats();
    assert_eq!(stats.live_objects, 2);
    assert_eq!(stats.live_triangles, 4 + 1);
    assert_eq!(stats.destroyed, 1);
    // The changed block's collider is within the throttle, so only first sightings
    // build colliders.
    assert_eq!(stats.collider_rebuilds, 3);
    assert_eq!(session.reconciler().state().version, 9);
}

#[test]
fn paused_settings_refuse_to_play() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path());
    let settings = SettingsArgs {
        no_config_files: true,
        set: vec![("block_updates_paused".to_owned(), serde_json::json!(true))],
        ..SettingsArgs::default()
    }
    .build_settings_in(dir.path())
    .unwrap();

    let sequence = SnapshotSequence::load(dir.path()).unwrap();
    let mut session = PlaybackSession::new(sequence, &settings).unwrap();
    let error = session.play_to_end(|_| {}).unwrap_err();
    assert_eq!(
        error.to_string(),
        "block updates are paused; no passes would ever run"
    );
    assert_eq!(session.passes(), 0);
}

#[test]
fn corrupt_snapshot_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path());
    // A block whose descriptor claims more vertices than the file holds.
    MeshSnapshot {
        block_ints: vec![0, 0, 0, 100, 1, 1],
        vertex_floats: vec![0.0; 6],
        face_ints: vec![0, 0, 0],
        block_size: 1.4,
    }
    .save(&dir.path().join("mesh_7.bin"))
    .unwrap();

    let sequence = SnapshotSequence::load(dir.path()).unwrap();
    let mut session = PlaybackSession::new(sequence, &fast_settings(dir.path())).unwrap();
    let mut versions = Vec::new();
    session
        .play_to_end(|step| versions.push(step.pass.version))
        .unwrap();

    assert_eq!(versions, vec![2, 5, 9]);
    assert_eq!(session.passes(), 4);
    assert_eq!(session.sink().stats().live_objects, 2);
}

#[test]
fn inspect_recorded_file() {
    let dir = tempfile::tempdir().unwrap();
    record(dir.path());
    let path = dir.path().join("mesh_5.bin");

    let snapshot = MeshSnapshot::load(&path).unwrap();
    let text = inspection_text(version_from_file_name(&path), &snapshot);

    assert!(text.starts_with("Mesh version:  5\n"), "{text}");
    assert!(
        text.contains("Totals:        3 blocks, 13 vertices, 7 triangles"),
        "{text}"
    );
    for label in ["b0,0,0", "b1,0,0", "b0,0,1"] {
        assert!(text.contains(label), "{label} missing from {text}");
    }
}
