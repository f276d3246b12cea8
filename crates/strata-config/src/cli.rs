//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Streamed tileset level-of-detail selection")]
pub struct CliArgs {
    /// Viewport width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Maximum screen-space error in pixels.
    #[arg(long)]
    pub max_sse: Option<f64>,

    /// Enable or disable the level-skipping traversal.
    #[arg(long)]
    pub skip_lod: Option<bool>,

    /// Request every sibling of a skipped-to tile.
    #[arg(long)]
    pub load_siblings: Option<bool>,

    /// Cache budget in megabytes.
    #[arg(long)]
    pub cache_mb: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 240)]
    pub frames: u32,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.view.width = w;
        }
        if let Some(h) = args.height {
            self.view.height = h;
        }
        if let Some(sse) = args.max_sse {
            self.traversal.maximum_screen_space_error = sse;
        }
        if let Some(skip) = args.skip_lod {
            self.traversal.skip_level_of_detail = skip;
        }
        if let Some(siblings) = args.load_siblings {
            self.traversal.load_siblings = siblings;
        }
        if let Some(mb) = args.cache_mb {
            self.cache.maximum_memory_usage_mb = mb;
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
            width: Some(1920),
            max_sse: Some(4.0),
            skip_lod: Some(true),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.view.width, 1920);
        assert_eq!(config.traversal.maximum_screen_space_error, 4.0);
        assert!(config.traversal.skip_level_of_detail);
        // Non-overridden fields retain defaults
        assert_eq!(config.view.height, 720);
        assert!(!config.traversal.load_siblings);
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
        let args = CliArgs::parse_from(["strata", "--skip-lod", "true", "--cache-mb", "64"]);
        assert_eq!(args.skip_lod, Some(true));
        assert_eq!(args.cache_mb, Some(64));
        assert_eq!(args.frames, 240);
    }
}
