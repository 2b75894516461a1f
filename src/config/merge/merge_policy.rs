//! Built-in defaults that every merge starts from.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Builder seeded with the defaults a config file may omit.
///
/// Struct-level serde defaults cover everything else; these keys are the
/// ones environment overrides most often address, so they must exist as
/// tables for nested `GROVE__STORE__*` keys to merge cleanly.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("store.remote_sort", false)?
        .set_default("store.remote_filter", false)?
        .set_default("store.remote_expand", false)?
        .set_default("store.filter_mode", "AND")?
        .set_default("store.children_field", crate::schema::DEFAULT_CHILDREN_FIELD)?
        .set_default("remote.records_field", "records")?
        .set_default("remote.total_field", "total")?
        .set_default("logging.level", "warn")
}
