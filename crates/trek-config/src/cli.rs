//! Command-line argument parsing for the Trek terrain viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Trek command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "trek", about = "Trek planetary terrain viewer")]
pub struct CliArgs {
    /// Initial terrain height exaggeration.
    #[arg(long)]
    pub height_exaggeration: Option<f32>,

    /// Number of globe LOD levels (excluding LOD 0).
    #[arg(long)]
    pub lod_levels: Option<u32>,

    /// Start with textures disabled.
    #[arg(long)]
    pub no_textures: bool,

    /// Number of update ticks to simulate before exiting.
    #[arg(long, default_value_t = 240)]
    pub ticks: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(scale) = args.height_exaggeration {
            self.terrain.height_exaggeration = scale;
        }
        if let Some(levels) = args.lod_levels {
            self.terrain.globe_lod_levels = levels;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            height_exaggeration: Some(2.5),
            lod_levels: Some(4),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.terrain.height_exaggeration, 2.5);
        assert_eq!(config.terrain.globe_lod_levels, 4);
        // Non-overridden fields retain defaults
        assert_eq!(config.terrain.local_lod_levels, 2);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["trek", "--height-exaggeration", "3", "--no-textures"]);
        assert_eq!(args.height_exaggeration, Some(3.0));
        assert!(args.no_textures);
        assert_eq!(args.ticks, 240);
    }
}
