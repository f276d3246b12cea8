//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tile selection settings.
    pub traversal: TraversalConfig,
    /// Content cache settings.
    pub cache: CacheConfig,
    /// Viewport and camera settings.
    pub view: ViewConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Level-of-detail traversal settings for a single tileset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraversalConfig {
    /// Screen-space error (pixels) a tile may have and still be rendered without refining.
    pub maximum_screen_space_error: f64,
    /// Coarse threshold the hybrid strategy refines to before it starts skipping levels.
    pub base_screen_space_error: f64,
    /// Enable the level-skipping traversal.
    pub skip_level_of_detail: bool,
    /// Minimum number of levels between a loaded ancestor and a tile it may skip to.
    pub skip_levels: u32,
    /// Minimum error reduction between a loaded ancestor and a tile it may skip to.
    pub skip_screen_space_error_factor: f64,
    /// Only request the tiles that meet the error budget, ignoring loaded ancestors.
    pub immediately_load_desired_level_of_detail: bool,
    /// Request all siblings of a tile picked by the skip traversal.
    pub load_siblings: bool,
    /// Relax the error of distant tiles using a height-dependent fog model.
    pub dynamic_screen_space_error: bool,
    /// Fog density at the horizon for the dynamic error model.
    pub dynamic_screen_space_error_density: f64,
    /// Scale applied to the fog term before it is subtracted from the error.
    pub dynamic_screen_space_error_factor: f64,
    /// Fraction of the tileset height at which the fog starts to thin out.
    pub dynamic_screen_space_error_height_falloff: f64,
    /// Cull replace-refined tiles whose children are all outside the frustum.
    pub cull_with_children_bounds: bool,
    /// Keep the previous frame's selection instead of traversing.
    pub debug_freeze_frame: bool,
}

/// Content cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum bytes of loaded content kept resident, in megabytes.
    pub maximum_memory_usage_mb: u64,
    /// Maximum number of content requests the loader accepts per frame.
    pub max_requests_per_frame: u32,
}

/// Viewport and camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f64,
    /// Near clip plane distance.
    pub near: f64,
    /// Far clip plane distance.
    pub far: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Emit per-frame traversal statistics.
    pub log_statistics: bool,
}

// --- Default implementations ---

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            maximum_screen_space_error: 16.0,
            base_screen_space_error: 1024.0,
            skip_level_of_detail: false,
            skip_levels: 1,
            skip_screen_space_error_factor: 16.0,
            immediately_load_desired_level_of_detail: false,
            load_siblings: false,
            dynamic_screen_space_error: false,
            dynamic_screen_space_error_density: 0.00278,
            dynamic_screen_space_error_factor: 4.0,
            dynamic_screen_space_error_height_falloff: 0.25,
            cull_with_children_bounds: true,
            debug_freeze_frame: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            maximum_memory_usage_mb: 512,
            max_requests_per_frame: 16,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov_y_degrees: 60.0,
            near: 0.1,
            far: 100_000.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_statistics: false,
        }
    }
}

impl TraversalConfig {
    /// Check that every option is inside the range the traversal supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.maximum_screen_space_error.is_finite() && self.maximum_screen_space_error >= 0.0)
        {
            return Err(ConfigError::Invalid {
                field: "maximum_screen_space_error",
                reason: "must be a finite, non-negative number of pixels",
            });
        }
        if !(self.base_screen_space_error >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "base_screen_space_error",
                reason: "must be non-negative",
            });
        }
        if !(self.skip_screen_space_error_factor > 1.0) {
            return Err(ConfigError::Invalid {
                field: "skip_screen_space_error_factor",
                reason: "must be greater than 1",
            });
        }
        if !(self.dynamic_screen_space_error_density >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "dynamic_screen_space_error_density",
                reason: "must be non-negative",
            });
        }
        if !(0.0..=1.0).contains(&self.dynamic_screen_space_error_height_falloff) {
            return Err(ConfigError::Invalid {
                field: "dynamic_screen_space_error_height_falloff",
                reason: "must be within [0, 1]",
            });
        }
        Ok(())
    }
}

impl CacheConfig {
    /// Cache budget in bytes.
    pub fn maximum_memory_usage_bytes(&self) -> u64 {
        self.maximum_memory_usage_mb.saturating_mul(1024 * 1024)
    }
}

/// Default directory for `config.ron`, falling back to the working directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("strata"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.traversal.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.traversal.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("maximum_screen_space_error: 16.0"));
        assert!(ron_str.contains("width: 1280"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.traversal.skip_level_of_detail = true;
        config.traversal.skip_levels = 3;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(traversal: (maximum_screen_space_error: 8.0))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.traversal.maximum_screen_space_error, 8.0);
        assert_eq!(config.traversal.skip_levels, 1);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_traversal_is_valid() {
        assert!(TraversalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_skip_factor_must_exceed_one() {
        let traversal = TraversalConfig {
            skip_screen_space_error_factor: 1.0,
            ..TraversalConfig::default()
        };
        let err = traversal.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "skip_screen_space_error_factor",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_error_budget_rejected() {
        let traversal = TraversalConfig {
            maximum_screen_space_error: -1.0,
            ..TraversalConfig::default()
        };
        assert!(traversal.validate().is_err());

        let traversal = TraversalConfig {
            maximum_screen_space_error: f64::NAN,
            ..TraversalConfig::default()
        };
        assert!(traversal.validate().is_err());
    }

    #[test]
    fn test_cache_budget_in_bytes() {
        let cache = CacheConfig {
            maximum_memory_usage_mb: 2,
            ..CacheConfig::default()
        };
        assert_eq!(cache.maximum_memory_usage_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.traversal.maximum_screen_space_error = 2.0;
        config.view.width = 1920;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ron"),
            "(traversal: (skip_screen_space_error_factor: 0.5))",
        )
        .unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.traversal.load_siblings = true;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.unwrap().traversal.load_siblings);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
