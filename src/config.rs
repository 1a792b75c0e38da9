use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Plugin configuration, read from `plugins.media-drag` in `tauri.conf.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Shortest edge of the drag shadow, in density-independent units.
    pub min_shadow_dp: f64,
    /// Longest edge of the drag shadow, in density-independent units.
    pub max_shadow_dp: f64,
    /// Appended to the app identifier to form the provider authority.
    pub authority_suffix: String,
    pub clip_label: String,
    /// Subdirectory of the app cache that receives remote downloads.
    pub cache_dir_name: String,
    /// Extra provider roots on top of `cache` and `files`.
    pub roots: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_shadow_dp: 200.0,
            max_shadow_dp: 400.0,
            authority_suffix: "provider".to_string(),
            clip_label: "Dragged Image".to_string(),
            cache_dir_name: "drag-cache".to_string(),
            roots: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn shadow_bounds(&self) -> Result<ShadowBounds, ConfigError> {
        ShadowBounds::new(self.min_shadow_dp, self.max_shadow_dp)
    }
}

/// Largest edge a shadow may be configured with, in dp.
pub const MAX_SHADOW_DP: f64 = 4096.0;

/// Minimum and maximum shadow edge lengths in density-independent units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowBounds {
    min_dp: f64,
    max_dp: f64,
}

impl ShadowBounds {
    pub fn new(min_dp: f64, max_dp: f64) -> Result<Self, ConfigError> {
        let usable = |dp: f64| dp.is_finite() && dp > 0.0 && dp <= MAX_SHADOW_DP;
        if !usable(min_dp) || !usable(max_dp) {
            return Err(ConfigError::InvalidBounds {
                min: min_dp,
                max: max_dp,
            });
        }
        if min_dp > max_dp {
            return Err(ConfigError::InvertedBounds {
                min: min_dp,
                max: max_dp,
            });
        }
        Ok(Self { min_dp, max_dp })
    }

    /// Bounds in physical pixels for the given display density.
    pub fn to_px(self, density: f64) -> (f64, f64) {
        let density = if density.is_finite() && density > 0.0 {
            density
        } else {
            1.0
        };
        (self.min_dp * density, self.max_dp * density)
    }

    pub fn min_dp(&self) -> f64 {
        self.min_dp
    }

    pub fn max_dp(&self) -> f64 {
        self.max_dp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        let bounds = config.shadow_bounds().expect("default bounds");
        assert_eq!(bounds.min_dp(), 200.0);
        assert_eq!(bounds.max_dp(), 400.0);
        assert_eq!(config.authority_suffix, "provider");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "minShadowDp": 50, "maxShadowDp": 120 }"#).unwrap();
        assert_eq!(config.min_shadow_dp, 50.0);
        assert_eq!(config.max_shadow_dp, 120.0);
        assert_eq!(config.cache_dir_name, "drag-cache");
    }

    #[test]
    fn rejects_inverted_and_non_positive_bounds() {
        assert!(matches!(
            ShadowBounds::new(300.0, 100.0),
            Err(ConfigError::InvertedBounds { .. })
        ));
        assert!(matches!(
            ShadowBounds::new(0.0, 100.0),
            Err(ConfigError::InvalidBounds { .. })
        ));
        assert!(matches!(
            ShadowBounds::new(10.0, f64::NAN),
            Err(ConfigError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn rejects_bounds_above_ceiling() {
        assert!(matches!(
            ShadowBounds::new(1e12, 1e12),
            Err(ConfigError::InvalidBounds { .. })
        ));
        assert!(matches!(
            ShadowBounds::new(200.0, MAX_SHADOW_DP + 1.0),
            Err(ConfigError::InvalidBounds { .. })
        ));
        assert!(ShadowBounds::new(MAX_SHADOW_DP, MAX_SHADOW_DP).is_ok());

        let config: Config = serde_json::from_str(r#"{ "minShadowDp": 1e12 }"#).unwrap();
        assert!(config.shadow_bounds().is_err());
    }

    #[test]
    fn converts_to_pixels_with_density() {
        let bounds = ShadowBounds::new(50.0, 120.0).unwrap();
        assert_eq!(bounds.to_px(2.0), (100.0, 240.0));
        // A bogus density is treated as 1x
        assert_eq!(bounds.to_px(0.0), (50.0, 120.0));
    }
}
