use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, types::BackgroundStyle};

/// Per-instance editor configuration, passed in at construction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of raster snapshots kept for undo/redo
    #[schemars(range(min = 1))]
    pub history_capacity: usize,
    pub viewport: ViewportConfig,
    pub brush: BrushConfig,
    pub magic: MagicConfig,
    pub lasso: LassoConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Multiplier applied by the zoom in/out controls
    pub zoom_step: f32,
    /// Exponential zoom rate per wheel delta unit
    pub wheel_zoom_speed: f32,
    /// Rendered element pixels per canvas pixel at scale 1
    pub display_ratio: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct BrushConfig {
    pub default_size: u32,
    pub min_size: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct MagicConfig {
    pub default_threshold: f32,
    pub min_threshold: f32,
    pub max_threshold: f32,
    /// Half-width of the square averaged when sampling the reference color
    pub sample_radius: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct LassoConfig {
    /// Clicking within this many canvas pixels of the first vertex closes the polygon
    pub close_radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct DisplayConfig {
    pub background: BackgroundStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            viewport: ViewportConfig::default(),
            brush: BrushConfig::default(),
            magic: MagicConfig::default(),
            lasso: LassoConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            zoom_step: 1.2,
            wheel_zoom_speed: 0.0015,
            display_ratio: 1.0,
        }
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self { default_size: 20, min_size: 1, max_size: 200 }
    }
}

impl Default for MagicConfig {
    fn default() -> Self {
        Self {
            default_threshold: 30.0,
            min_threshold: 5.0,
            max_threshold: 150.0,
            sample_radius: 1,
        }
    }
}

impl Default for LassoConfig {
    fn default() -> Self {
        Self { close_radius: 10.0 }
    }
}

impl EditorConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON schema describing every configuration field
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EditorConfig)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1".into()));
        }
        let v = &self.viewport;
        if !(v.min_scale > 0.0 && v.min_scale <= v.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "viewport scale range [{}, {}] is invalid",
                v.min_scale, v.max_scale
            )));
        }
        if !(v.zoom_step > 1.0) {
            return Err(ConfigError::Invalid("viewport.zoom_step must be greater than 1".into()));
        }
        if !(v.display_ratio > 0.0) {
            return Err(ConfigError::Invalid("viewport.display_ratio must be positive".into()));
        }
        let b = &self.brush;
        if b.min_size == 0 || b.min_size > b.max_size {
            return Err(ConfigError::Invalid(format!(
                "brush size range [{}, {}] is invalid",
                b.min_size, b.max_size
            )));
        }
        let m = &self.magic;
        if !(m.min_threshold >= 0.0 && m.min_threshold <= m.max_threshold) {
            return Err(ConfigError::Invalid(format!(
                "magic threshold range [{}, {}] is invalid",
                m.min_threshold, m.max_threshold
            )));
        }
        if self.lasso.close_radius < 0.0 {
            return Err(ConfigError::Invalid("lasso.close_radius must not be negative".into()));
        }
        Ok(())
    }

    pub fn clamp_brush_size(&self, size: u32) -> u32 {
        size.max(self.brush.min_size).min(self.brush.max_size)
    }

    pub fn clamp_threshold(&self, threshold: f32) -> f32 {
        threshold.max(self.magic.min_threshold).min(self.magic.max_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EditorConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.viewport.min_scale, 0.1);
        assert_eq!(config.viewport.max_scale, 5.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = EditorConfig::from_toml(
            r#"
            history_capacity = 5

            [magic]
            default_threshold = 12.0

            [display]
            background = "dark"
            "#,
        )
        .expect("should parse");
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.magic.default_threshold, 12.0);
        assert_eq!(config.magic.max_threshold, 150.0);
        assert_eq!(config.display.background, BackgroundStyle::Dark);
        assert_eq!(config.brush, BrushConfig::default());
    }

    #[test]
    fn json_round_trip() {
        let config = EditorConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn rejects_inverted_scale_range() {
        let err = EditorConfig::from_json(r#"{"viewport": {"min_scale": 4.0, "max_scale": 2.0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = EditorConfig::from_toml("history_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = EditorConfig::from_file("editor.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFileFormat));
    }

    #[test]
    fn clamps_user_values() {
        let config = EditorConfig::default();
        assert_eq!(config.clamp_brush_size(0), 1);
        assert_eq!(config.clamp_brush_size(1000), 200);
        assert_eq!(config.clamp_threshold(1.0), 5.0);
        assert_eq!(config.clamp_threshold(90.0), 90.0);
    }
}
