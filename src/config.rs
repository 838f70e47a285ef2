//! Sticker configuration: which assets to load and a few tunables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::Color;

/// Cross-fade duration, in seconds, between any two animations.
pub const DEFAULT_MIX: f32 = 0.5;

/// Vertical half-extent of the orthographic projection, in world units.
pub const WORLD_HALF_EXTENT: f32 = 1000.0;

/// The files that make up one sticker, plus the animation to loop.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StickerAssets {
    /// Texture atlas description (`.atlas`).
    pub atlas_path: PathBuf,
    /// Skeleton definition exported as JSON.
    pub skeleton_path: PathBuf,
    /// The atlas page image.
    pub texture_path: PathBuf,
    /// Animation queued on track 0, looping.
    pub default_animation: String,
}

/// Everything needed to build a [`Sticker`](crate::Sticker).
///
/// Deserializes from JSON; every field except `assets` has a default:
///
/// ```json
/// {
///   "assets": {
///     "atlas_path": "/sdcard/sticker/raptor.atlas",
///     "skeleton_path": "/sdcard/sticker/raptor.json",
///     "texture_path": "/sdcard/sticker/raptor.png",
///     "default_animation": "walk"
///   },
///   "default_mix": 0.5
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StickerConfig {
    /// Asset files and default animation.
    pub assets: StickerAssets,
    /// See [`DEFAULT_MIX`].
    #[serde(default = "default_mix")]
    pub default_mix: f32,
    /// See [`WORLD_HALF_EXTENT`].
    #[serde(default = "world_half_extent")]
    pub world_half_extent: f32,
    /// Color the surface is cleared to before each frame.
    #[serde(default = "clear_color")]
    pub clear_color: Color,
}

fn default_mix() -> f32 {
    DEFAULT_MIX
}

fn world_half_extent() -> f32 {
    WORLD_HALF_EXTENT
}

fn clear_color() -> Color {
    Color::TRANSPARENT
}

impl StickerConfig {
    /// A config with default tunables.
    #[must_use]
    pub fn new(assets: StickerAssets) -> Self {
        Self {
            assets,
            default_mix: DEFAULT_MIX,
            world_half_extent: WORLD_HALF_EXTENT,
            clear_color: Color::TRANSPARENT,
        }
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_mix.is_finite() && self.default_mix >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "default_mix must be a non-negative number, got {}",
                self.default_mix
            )));
        }
        if !(self.world_half_extent.is_finite() && self.world_half_extent > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "world_half_extent must be positive, got {}",
                self.world_half_extent
            )));
        }
        if self.assets.default_animation.is_empty() {
            return Err(ConfigError::Invalid(
                "default_animation must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "assets": {
            "atlas_path": "raptor.atlas",
            "skeleton_path": "raptor.json",
            "texture_path": "raptor.png",
            "default_animation": "walk"
        }
    }"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = StickerConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(config.assets.default_animation, "walk");
        assert_eq!(config.assets.atlas_path, PathBuf::from("raptor.atlas"));
        assert!((config.default_mix - DEFAULT_MIX).abs() < f32::EPSILON);
        assert!((config.world_half_extent - WORLD_HALF_EXTENT).abs() < f32::EPSILON);
        assert_eq!(config.clear_color, Color::TRANSPARENT);
        assert_eq!(config, StickerConfig::new(config.assets.clone()));
    }

    #[test]
    fn overrides_are_read() {
        let json = r#"{
            "assets": {
                "atlas_path": "a", "skeleton_path": "s",
                "texture_path": "t", "default_animation": "jump"
            },
            "default_mix": 0.2,
            "world_half_extent": 500.0,
            "clear_color": { "r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0 }
        }"#;
        let config = StickerConfig::from_json_str(json).unwrap();
        assert!((config.default_mix - 0.2).abs() < f32::EPSILON);
        assert!((config.world_half_extent - 500.0).abs() < f32::EPSILON);
        assert_eq!(config.clear_color, Color::WHITE);
    }

    #[test]
    fn rejects_missing_assets() {
        let err = StickerConfig::from_json_str("{}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_non_positive_extent() {
        let json = MINIMAL.replacen('{', r#"{ "world_half_extent": 0.0,"#, 1);
        let err = StickerConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StickerConfig::from_json_file(Path::new("/nonexistent/sticker.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
