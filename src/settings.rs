//! Settings read through the `config` crate.
//!
//! Sources, later ones overriding earlier ones:
//! * built-in defaults,
//! * an optional `invoker_config.{toml,json,yaml,...}` file in the working directory,
//! * `INVOKER_*` environment variables, nested keys joined by `__`
//!   (`INVOKER_SEARCH__PRIMARY_SCOPE=Game`, lists comma separated).
//!
//! The enum separator and the array delimiters are not configurable.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::catalog::SearchOrder;
use crate::error::Result;

pub const DEFAULT_CONFIG_NAME: &str = "invoker_config";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchOrder,
    /// Marks where the invocation stream starts among the host's tokens.
    pub entry_marker: String,
    /// Filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchOrder::default(),
            entry_marker: "-invoke".into(),
            log_level: "info".into(),
        }
    }
}

impl Settings {
    /// Defaults, then `invoker_config.*` if present, then the environment.
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(DEFAULT_CONFIG_NAME).required(false))
    }
    /// Defaults, then the given file which must exist, then the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }
    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("INVOKER")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("search.secondary_scopes")
                    .with_list_parse_key("search.reserved_prefixes")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize::<Settings>()?)
    }
}
