//! Settings for the command line tool.
//!
//! Layered, later layers win: built-in defaults, then `xapidb.toml` in the
//! working directory (or the file given explicitly), then `XAPIDB_*`
//! environment variables.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::persist::DEFAULT_PRIMARY_KEY;

pub const DEFAULT_CONFIG_NAME: &str = "xapidb";
pub const ENV_PREFIX: &str = "XAPIDB";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Filter for the log output when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Spaces per indentation level of the JSON output.
    pub json_indent: usize,
    /// Column used as primary key in the SQL output.
    pub primary_key: String,
    /// Always include the version under `_version`.
    pub print_db_version: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            json_indent: 2,
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            print_db_version: false,
        }
    }
}

impl Settings {
    /// Load the settings. An explicit `path` has to exist, the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        let settings = Config::builder()
            .set_default("log_filter", defaults.log_filter)?
            .set_default("json_indent", defaults.json_indent as u64)?
            .set_default("primary_key", defaults.primary_key)?
            .set_default("print_db_version", defaults.print_db_version)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
