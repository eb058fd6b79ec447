//! Configuration system for the Trek terrain viewer.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE_NAME, Config, DebugConfig, InteractionConfig, LayerConfig, TerrainConfig,
};
pub use error::ConfigError;

/// Default location of the config directory (`<platform config dir>/trek`).
pub fn default_config_dir() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("trek"))
}
