//! Command line option parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ar_meshing_desktop::SettingsArgs;
use ar_meshing_desktop::logging::LoggingArgs;

#[derive(Clone, Debug, Parser)]
#[command(name = "ar-meshing", author, about, version)]
pub(crate) struct ArMeshingArgs {
    #[command(subcommand)]
    pub(crate) command: Command,

    #[command(flatten)]
    pub(crate) logging: LoggingArgs,

    #[command(flatten)]
    pub(crate) settings: SettingsArgs,
}

#[derive(Clone, Debug, Subcommand)]
pub(crate) enum Command {
    /// Replay mesh snapshots through the reconciler at the configured frame rate.
    ///
    /// PATH may be a single snapshot file or a directory of `mesh_<version>.bin` files,
    /// which are played in ascending version order.
    Play {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Print the full report of every pass instead of one line per pass.
        #[arg(long)]
        detailed: bool,
    },

    /// Print the header and block table of a snapshot file.
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}
