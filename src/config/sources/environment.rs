//! Environment variable source: GROVE__* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Prefix of environment overrides, e.g. `GROVE__STORE__LIMIT=50`
pub const ENV_PREFIX: &str = "GROVE";

/// Add environment variable overlay to builder.
/// Uses GROVE prefix and __ as separator for nested keys.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("store.primary_keys")
            .try_parsing(true),
    );
    Ok(builder)
}
