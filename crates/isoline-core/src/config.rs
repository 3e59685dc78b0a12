//! Scene configuration: the JSON-loadable starting state of a session.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::contour::ContourTextureConfig;
use crate::error::{IsolineError, Result};
use crate::params::TerrainParameters;

pub const DEFAULT_CLEAR_COLOR: &str = "#000324";

/// Initial parameter values for a session. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    /// Seed for the elevation noise.
    pub seed: u32,
    pub terrain: TerrainParameters,
    pub contour: ContourTextureConfig,
    pub clear_color: String,
    /// Active view preset.
    pub view_index: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            terrain: TerrainParameters::default(),
            contour: ContourTextureConfig::default(),
            clear_color: DEFAULT_CLEAR_COLOR.to_string(),
            view_index: 0,
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: SceneConfig = serde_json::from_str(json)?;
        cfg.sanitized()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn clear_color_rgb(&self) -> Result<Rgb> {
        Rgb::from_hex(&self.clear_color).map_err(|e| IsolineError::Param(e.into()))
    }

    /// Pass every tunable through the same clamping as panel writes. A session
    /// always starts at `time = 0`, so a stored time is dropped.
    ///
    /// Fails only on a malformed clear color.
    pub fn sanitized(mut self) -> Result<Self> {
        let before = self.terrain;
        self.terrain = self.terrain.clamped();
        self.terrain.time = 0.0;
        if self.terrain != before {
            warn!("scene config held out-of-range terrain values or a start time; sanitized");
        }

        self.contour = self.contour.clamped();

        self.clear_color_rgb()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let cfg = SceneConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, SceneConfig::default());
        assert_eq!(cfg.terrain.elevation, 2.0);
        assert_eq!(cfg.contour.lines_count, 5);
        assert_eq!(cfg.contour.height, 128);
    }

    #[test]
    fn partial_json_overrides_named_fields_only() {
        let cfg = SceneConfig::from_json_str(
            r#"{ "terrain": { "elevation": 3.5, "hslHue": 0.4 }, "contour": { "linesCount": 8 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.terrain.elevation, 3.5);
        assert_eq!(cfg.terrain.hsl_hue, 0.4);
        assert_eq!(cfg.terrain.texture_offset, 0.585);
        assert_eq!(cfg.contour.lines_count, 8);
        assert_eq!(cfg.contour.big_line_width, 0.08);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = SceneConfig::from_json_str(
            r#"{ "terrain": { "elevation": 7, "time": -3 }, "contour": { "linesCount": 40, "smallLineAlpha": 2 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.terrain.elevation, 5.0);
        assert_eq!(cfg.terrain.time, 0.0);
        assert_eq!(cfg.contour.lines_count, 10);
        assert_eq!(cfg.contour.small_line_alpha, 1.0);
    }

    #[test]
    fn stored_time_is_reset_to_session_start() {
        let cfg = SceneConfig::from_json_str(r#"{ "terrain": { "time": 100 } }"#).unwrap();
        assert_eq!(cfg.terrain.time, 0.0);
    }

    #[test]
    fn bad_clear_color_is_an_error() {
        let err = SceneConfig::from_json_str(r#"{ "clearColor": "navy" }"#).unwrap_err();
        assert!(matches!(err, IsolineError::Param(_)), "{err}");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = SceneConfig::from_json_str("{ terrain: }").unwrap_err();
        assert!(matches!(err, IsolineError::Config(_)));
    }

    #[test]
    fn json_round_trip_keeps_values() {
        let cfg = SceneConfig { seed: 9, view_index: 2, ..Default::default() };
        let back = SceneConfig::from_json_str(&cfg.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}
