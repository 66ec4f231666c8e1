use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use ar_meshing::MeshingSettings;

/// Name of the settings file which is read from the working directory, if it exists,
/// when no `--config` option is given.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "ar-meshing.json";

// -------------------------------------------------------------------------------------------------

/// [`clap::Args`] argument group struct for args that affect what settings are used.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct SettingsArgs {
    /// Read settings from this JSON file instead of `ar-meshing.json` in the working
    /// directory.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Ignore all configuration files, using only defaults and command-line options.
    #[arg(long = "no-config-files", conflicts_with = "config", global = true)]
    pub no_config_files: bool,

    #[allow(clippy::doc_markdown, reason = "will be displayed in --help")]
    /// Override the value of a setting for this session, instead of taking it from files
    /// or defaults.
    ///
    /// The value is specified as a key-value pair where the key is an unquoted string, the
    /// separator is “=”, and the value is a JSON value (which, if a string, must be quoted);
    /// for example: -Scollider_update_throttle=4
    #[arg(
        long = "set",
        short = 'S',
        value_parser = parse_configure,
        value_name = "NAME=JSON",
        global = true
    )]
    pub set: Vec<(String, serde_json::Value)>,
}

impl SettingsArgs {
    /// Constructs the [`MeshingSettings`] a session with these args should use, looking for
    /// the default settings file in the current working directory.
    pub fn build_settings(self) -> Result<MeshingSettings, anyhow::Error> {
        let working_directory =
            std::env::current_dir().context("could not determine working directory")?;
        self.build_settings_in(&working_directory)
    }

    /// Constructs the [`MeshingSettings`] a session with these args should use, looking for
    /// the default settings file in `directory`.
    pub fn build_settings_in(self, directory: &Path) -> Result<MeshingSettings, anyhow::Error> {
        let Self {
            config,
            no_config_files,
            set: to_override,
        } = self;

        let mut settings = match config {
            _ if no_config_files => MeshingSettings::default(),
            Some(path) => read_settings_file(&path)?,
            None => {
                let default_path = directory.join(DEFAULT_CONFIG_FILE_NAME);
                if default_path.exists() {
                    read_settings_file(&default_path)?
                } else {
                    log::trace!(
                        "no {DEFAULT_CONFIG_FILE_NAME} in {path}; using default settings",
                        path = directory.display()
                    );
                    MeshingSettings::default()
                }
            }
        };

        if !to_override.is_empty() {
            let Ok(serde_json::Value::Object(mut current_settings)) =
                serde_json::to_value(&settings)
            else {
                unreachable!("settings should appear as a json object");
            };
            for (key, value) in to_override {
                if !current_settings.contains_key(&key) {
                    anyhow::bail!("--set: there is no setting named {key:?}");
                }
                current_settings.insert(key, value);
            }
            settings = serde_json::from_value(serde_json::Value::Object(current_settings))
                .context("--set did not produce valid settings")?;
        }

        Ok(settings)
    }
}

fn parse_configure(arg: &str) -> Result<(String, serde_json::Value), anyhow::Error> {
    let (key, value) = arg.split_once('=').ok_or_else(|| anyhow::anyhow!("missing '='"))?;
    let value = serde_json::from_str(value)?;
    Ok((key.to_owned(), value))
}

// -------------------------------------------------------------------------------------------------

/// Reads settings from a JSON file. Settings the file does not mention keep their defaults.
pub fn read_settings_file(path: &Path) -> Result<MeshingSettings, anyhow::Error> {
    let file = File::open(path)
        .with_context(|| format!("could not open settings file {}", path.display()))?;
    let settings = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("syntax error in settings file {}", path.display()))?;
    log::trace!("Loaded settings from {path}", path = path.display());
    Ok(settings)
}
