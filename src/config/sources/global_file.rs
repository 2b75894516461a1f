//! Global config file source: $XDG_CONFIG_HOME/grove/config.toml

use crate::config::paths::xdg_root;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use tracing::debug;

/// Add the global config file to builder when it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(path) = xdg_root::global_config_path() else {
        return Ok(builder);
    };
    if !path.is_file() {
        return Ok(builder);
    }
    debug!(path = %path.display(), "Using global config file");
    let path_str = path.to_string_lossy().into_owned();
    Ok(builder.add_source(File::new(&path_str, FileFormat::Toml).required(false)))
}
