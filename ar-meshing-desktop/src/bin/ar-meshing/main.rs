//! Binary for the `ar-meshing` snapshot playback and inspection tool.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

use std::path::Path;

use anyhow::Context as _;
use clap::Parser as _;

use ar_meshing::MeshingSettings;
use ar_meshing_desktop::{PlaybackSession, SessionStep, inspection_text, logging};
use ar_meshing_port::{MeshSnapshot, SnapshotSequence, version_from_file_name};

mod command_options;
use command_options::{ArMeshingArgs, Command};

fn main() -> Result<(), anyhow::Error> {
    let ArMeshingArgs {
        command,
        logging: logging_args,
        settings: settings_args,
    } = ArMeshingArgs::parse();

    logging::install(&logging_args)?;

    match command {
        Command::Play { path, detailed } => {
            let settings = settings_args.build_settings()?;
            play(&path, &settings, detailed)
        }
        Command::Inspect { file } => {
            let snapshot = MeshSnapshot::load(&file)
                .with_context(|| format!("failed to read snapshot {}", file.display()))?;
            print!("{}", inspection_text(version_from_file_name(&file), &snapshot));
            Ok(())
        }
    }
}

fn play(path: &Path, settings: &MeshingSettings, detailed: bool) -> Result<(), anyhow::Error> {
    let sequence = load_sequence(path)?;
    log::info!(
        "playing {count} snapshots from {path}",
        count = sequence.len(),
        path = path.display()
    );

    let mut session = PlaybackSession::new(sequence, settings)
        .context("failed to allocate mesh buffers")?;
    session.play_to_end(|step: &SessionStep| {
        if detailed {
            println!("{}\n", step.pass);
        } else {
            println!(
                "version {version}: {outcome:?}, {updated} updated, {removed} removed",
                version = step.pass.version,
                outcome = step.pass.outcome,
                updated = step.binding.blocks_updated,
                removed = step.binding.blocks_removed,
            );
        }
    })?;

    let stats = session.sink().stats();
    println!(
        "{objects} blocks with {triangles} triangles after {passes} passes \
        ({colliders} collider rebuilds)",
        objects = stats.live_objects,
        triangles = stats.live_triangles,
        passes = session.passes(),
        colliders = stats.collider_rebuilds,
    );
    Ok(())
}

fn load_sequence(path: &Path) -> Result<SnapshotSequence, anyhow::Error> {
    SnapshotSequence::load(path)
        .with_context(|| format!("failed to load snapshots from {}", path.display()))
}
