//! Configuration module for the declaration graph.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.declgraph/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DG_` and use double underscores
//! to separate nested levels:
//! - `DG_BUILDER__PARALLEL_THREADS=8` sets `builder.parallel_threads`
//! - `DG_BUILDER__JOIN_DECLARATIONS=false` sets `builder.join_declarations`
//! - `DG_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".declgraph";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Graph building
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Matcher traversal
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Merge declarations with the same merge identity across units.
    /// When off, units share only the global namespace.
    #[serde(default = "default_true")]
    pub join_declarations: bool,

    /// Record on each class the typedefs that alias it
    #[serde(default = "default_true")]
    pub bind_aliases: bool,

    /// Worker threads for the per-unit allocate/resolve stages
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Prefix of the internal names given to anonymous scopes
    #[serde(default = "default_anonymous_prefix")]
    pub anonymous_prefix: String,

    /// Attach declarations without a `context` to the global namespace
    /// instead of rejecting the unit
    #[serde(default = "default_true")]
    pub lenient_context: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QueryConfig {
    /// Seed traversals from the by-name index when a matcher pins a name
    #[serde(default = "default_true")]
    pub name_index: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Maximum level: error, warn, info, debug or trace
    #[serde(default = "default_level")]
    pub level: String,

    /// Shortcut for `level = "debug"`
    #[serde(default = "default_false")]
    pub debug: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_anonymous_prefix() -> String {
    "__anon".to_string()
}
fn default_level() -> String {
    "warn".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            builder: BuilderConfig::default(),
            query: QueryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            join_declarations: true,
            bind_aliases: true,
            parallel_threads: default_parallel_threads(),
            anonymous_prefix: default_anonymous_prefix(),
            lenient_context: true,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { name_index: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            debug: false,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring `DG_` overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting levels; single underscores
            // stay inside field names
            .merge(Env::prefixed("DG_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.declgraph/settings.toml` searching from the current directory up
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Effective tracing level, with `debug = true` winning over `level`
    pub fn log_level(&self) -> &str {
        if self.logging.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }
}
