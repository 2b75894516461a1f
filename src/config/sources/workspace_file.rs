//! Workspace config file source: <workspace>/grove.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::{Path, PathBuf};

/// Name of the per-workspace config file
pub const WORKSPACE_CONFIG_FILE: &str = "grove.toml";

pub fn workspace_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(WORKSPACE_CONFIG_FILE)
}

/// Add the workspace config file to builder when it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = workspace_config_path(workspace_root);
    if !path.is_file() {
        return Ok(builder);
    }
    let path_str = path.to_string_lossy().into_owned();
    Ok(builder.add_source(File::new(&path_str, FileFormat::Toml).required(false)))
}
