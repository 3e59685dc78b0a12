//! Terrain parameters and the tunable parameter table.
//!
//! `PARAMS` is the single description of the control surface: names, panel
//! labels, declared ranges, and which stage has to react when a field changes.
//! Shader-consumed fields need no reaction (they are read fresh every frame);
//! texture-consumed fields require the contour raster to be regenerated.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

// ── Parameter values ──────────────────────────────────────────────────────────

/// Deformation and shading parameters. Both render stages read this every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerrainParameters {
    /// Overall vertical scale applied after the octaves are combined.
    pub elevation: f32,
    /// Amplitude of the valley term.
    pub elevation_valley: f32,
    pub elevation_valley_frequency: f32,
    pub elevation_general: f32,
    pub elevation_general_frequency: f32,
    pub elevation_details: f32,
    pub elevation_details_frequency: f32,
    /// Elevation → contour coordinate scale.
    pub texture_frequency: f32,
    pub texture_offset: f32,
    pub hsl_hue: f32,
    pub hsl_hue_offset: f32,
    pub hsl_hue_frequency: f32,
    pub hsl_time_frequency: f32,
    pub hsl_lightness: f32,
    pub hsl_lightness_variation: f32,
    pub hsl_lightness_frequency: f32,
    /// Seconds since the animation started. Written only through `TimeWriter`.
    pub time: f32,
}

impl Default for TerrainParameters {
    fn default() -> Self {
        Self {
            elevation: 2.0,
            elevation_valley: 0.4,
            elevation_valley_frequency: 1.5,
            elevation_general: 0.2,
            elevation_general_frequency: 0.2,
            elevation_details: 0.248,
            elevation_details_frequency: 0.729,
            texture_frequency: 10.0,
            texture_offset: 0.585,
            hsl_hue: 0.12,
            hsl_hue_offset: 0.5,
            hsl_hue_frequency: 10.0,
            hsl_time_frequency: 0.05,
            hsl_lightness: 0.75,
            hsl_lightness_variation: 0.25,
            hsl_lightness_frequency: 20.0,
            time: 0.0,
        }
    }
}

impl TerrainParameters {
    /// Mutable access to a material field. `None` for ids that live elsewhere
    /// (contour config, clear color).
    pub fn field_mut(&mut self, id: ParamId) -> Option<&mut f32> {
        use ParamId::*;
        Some(match id {
            Elevation => &mut self.elevation,
            ElevationValley => &mut self.elevation_valley,
            ElevationValleyFrequency => &mut self.elevation_valley_frequency,
            ElevationGeneral => &mut self.elevation_general,
            ElevationGeneralFrequency => &mut self.elevation_general_frequency,
            ElevationDetails => &mut self.elevation_details,
            ElevationDetailsFrequency => &mut self.elevation_details_frequency,
            TextureFrequency => &mut self.texture_frequency,
            TextureOffset => &mut self.texture_offset,
            HslHue => &mut self.hsl_hue,
            HslHueOffset => &mut self.hsl_hue_offset,
            HslHueFrequency => &mut self.hsl_hue_frequency,
            HslTimeFrequency => &mut self.hsl_time_frequency,
            HslLightness => &mut self.hsl_lightness,
            HslLightnessVariation => &mut self.hsl_lightness_variation,
            HslLightnessFrequency => &mut self.hsl_lightness_frequency,
            ContourVisible | ContourLinesCount | ContourBigLineWidth | ContourSmallLineWidth
            | ContourSmallLineAlpha | ClearColor => return None,
        })
    }

    pub fn field(&self, id: ParamId) -> Option<f32> {
        let mut copy = *self;
        copy.field_mut(id).map(|v| *v)
    }

    /// Clamp every material field into its declared range. Non-finite fields
    /// take their default. `time` is left alone.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        for spec in PARAMS.iter().filter(|s| s.group == ParamGroup::TerrainMaterial) {
            let fallback = defaults.field(spec.id);
            if let (Some(v), Some(fallback)) = (self.field_mut(spec.id), fallback) {
                *v = if v.is_finite() { spec.clamp(*v) } else { fallback };
            }
        }
        self
    }
}

/// A value read back from the store by parameter id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f32),
    Color(Rgb),
}

// ── Parameter table ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamId {
    ContourVisible,
    ContourLinesCount,
    ContourBigLineWidth,
    ContourSmallLineWidth,
    ContourSmallLineAlpha,
    Elevation,
    ElevationValley,
    ElevationValleyFrequency,
    ElevationGeneral,
    ElevationGeneralFrequency,
    ElevationDetails,
    ElevationDetailsFrequency,
    TextureFrequency,
    TextureOffset,
    HslHue,
    HslHueOffset,
    HslHueFrequency,
    HslTimeFrequency,
    HslLightness,
    HslLightnessVariation,
    HslLightnessFrequency,
    ClearColor,
}

/// Panel folder a parameter is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamGroup {
    TerrainTexture,
    TerrainMaterial,
    Renderer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamKind {
    Bool,
    Integer,
    Real,
    Color,
}

/// What has to happen, beyond storing the value, when a parameter changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reaction {
    /// Read by the render stages on the next frame; nothing to do.
    None,
    /// The contour raster must be rebuilt before the next draw.
    RegenerateTexture,
    /// Show or hide the on-screen contour strip. No regeneration.
    TogglePreview,
    /// The presentation surface clear color changes.
    UpdateClearColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub id: ParamId,
    /// Canonical camelCase name, as used in scene config files.
    pub name: &'static str,
    /// Label shown on the debug panel.
    pub label: &'static str,
    pub group: ParamGroup,
    pub kind: ParamKind,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub reaction: Reaction,
}

impl ParamSpec {
    /// Clamp into `[min, max]`; integer parameters are then rounded.
    pub fn clamp(&self, value: f32) -> f32 {
        let v = value.clamp(self.min, self.max);
        match self.kind {
            ParamKind::Integer => v.round(),
            _ => v,
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

const fn spec(
    id: ParamId,
    name: &'static str,
    label: &'static str,
    group: ParamGroup,
    kind: ParamKind,
    range: (f32, f32, f32),
    reaction: Reaction,
) -> ParamSpec {
    ParamSpec { id, name, label, group, kind, min: range.0, max: range.1, step: range.2, reaction }
}

/// Indexed by `ParamId as usize`.
pub static PARAMS: [ParamSpec; 22] = {
    use ParamGroup::{Renderer, TerrainMaterial as Mat, TerrainTexture as Tex};
    use ParamKind::{Bool, Color, Integer, Real};
    [
        spec(ParamId::ContourVisible, "visible", "visible", Tex, Bool, (0.0, 1.0, 1.0), Reaction::TogglePreview),
        spec(ParamId::ContourLinesCount, "linesCount", "linesCount", Tex, Integer, (1.0, 10.0, 1.0), Reaction::RegenerateTexture),
        spec(ParamId::ContourBigLineWidth, "bigLineWidth", "bigLineWidth", Tex, Real, (0.0, 0.5, 0.0001), Reaction::RegenerateTexture),
        spec(ParamId::ContourSmallLineWidth, "smallLineWidth", "smallLineWidth", Tex, Real, (0.0, 0.1, 0.0001), Reaction::RegenerateTexture),
        spec(ParamId::ContourSmallLineAlpha, "smallLineAlpha", "smallLineAlpha", Tex, Real, (0.0, 1.0, 0.001), Reaction::RegenerateTexture),
        spec(ParamId::Elevation, "elevation", "uElevation", Mat, Real, (0.0, 5.0, 0.001), Reaction::None),
        spec(ParamId::ElevationValley, "elevationValley", "uElevationValley", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::ElevationValleyFrequency, "elevationValleyFrequency", "uElevationValleyFrequency", Mat, Real, (0.0, 10.0, 0.001), Reaction::None),
        spec(ParamId::ElevationGeneral, "elevationGeneral", "uElevationGeneral", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::ElevationGeneralFrequency, "elevationGeneralFrequency", "uElevationGeneralFrequency", Mat, Real, (0.0, 10.0, 0.001), Reaction::None),
        spec(ParamId::ElevationDetails, "elevationDetails", "uElevationDetails", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::ElevationDetailsFrequency, "elevationDetailsFrequency", "uElevationDetailsFrequency", Mat, Real, (0.0, 10.0, 0.001), Reaction::None),
        spec(ParamId::TextureFrequency, "textureFrequency", "uTextureFrequency", Mat, Real, (0.01, 50.0, 0.01), Reaction::None),
        spec(ParamId::TextureOffset, "textureOffset", "uTextureOffset", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::HslHue, "hslHue", "uHslHue", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::HslHueOffset, "hslHueOffset", "uHslHueOffset", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::HslHueFrequency, "hslHueFrequency", "uHslHueFrequency", Mat, Real, (0.0, 50.0, 0.01), Reaction::None),
        spec(ParamId::HslTimeFrequency, "hslTimeFrequency", "uHslTimeFrequency", Mat, Real, (0.0, 0.2, 0.001), Reaction::None),
        spec(ParamId::HslLightness, "hslLightness", "uHslLightness", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::HslLightnessVariation, "hslLightnessVariation", "uHslLightnessVariation", Mat, Real, (0.0, 1.0, 0.001), Reaction::None),
        spec(ParamId::HslLightnessFrequency, "hslLightnessFrequency", "uHslLightnessFrequency", Mat, Real, (0.0, 50.0, 0.01), Reaction::None),
        spec(ParamId::ClearColor, "clearColor", "clearColor", Renderer, Color, (0.0, 0.0, 0.0), Reaction::UpdateClearColor),
    ]
};

impl ParamId {
    pub fn spec(self) -> &'static ParamSpec {
        &PARAMS[self as usize]
    }

    /// Look up by canonical name (`elevation`) or panel label (`uElevation`).
    pub fn from_name(name: &str) -> Option<ParamId> {
        PARAMS
            .iter()
            .find(|s| s.name == name || s.label == name)
            .map(|s| s.id)
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn reaction(self) -> Reaction {
        self.spec().reaction
    }

    pub fn all() -> impl Iterator<Item = ParamId> {
        PARAMS.iter().map(|s| s.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_id() {
        for (i, s) in PARAMS.iter().enumerate() {
            assert_eq!(s.id as usize, i, "PARAMS[{i}] holds {:?}", s.id);
        }
    }

    #[test]
    fn names_and_labels_resolve() {
        assert_eq!(ParamId::from_name("elevation"), Some(ParamId::Elevation));
        assert_eq!(ParamId::from_name("uElevation"), Some(ParamId::Elevation));
        assert_eq!(ParamId::from_name("linesCount"), Some(ParamId::ContourLinesCount));
        assert_eq!(ParamId::from_name("time"), None);
        assert_eq!(ParamId::from_name("nope"), None);
    }

    #[test]
    fn elevation_clamps_to_declared_max() {
        assert_eq!(ParamId::Elevation.spec().clamp(7.0), 5.0);
        assert_eq!(ParamId::Elevation.spec().clamp(-1.0), 0.0);
    }

    #[test]
    fn lines_count_is_rounded_after_clamping() {
        let s = ParamId::ContourLinesCount.spec();
        assert_eq!(s.clamp(3.4), 3.0);
        assert_eq!(s.clamp(0.0), 1.0);
        assert_eq!(s.clamp(42.0), 10.0);
    }

    #[test]
    fn only_texture_fields_regenerate() {
        let regen: Vec<_> = ParamId::all()
            .filter(|id| id.reaction() == Reaction::RegenerateTexture)
            .collect();
        assert_eq!(
            regen,
            vec![
                ParamId::ContourLinesCount,
                ParamId::ContourBigLineWidth,
                ParamId::ContourSmallLineWidth,
                ParamId::ContourSmallLineAlpha,
            ]
        );
        assert_eq!(ParamId::ContourVisible.reaction(), Reaction::TogglePreview);
    }

    #[test]
    fn defaults_lie_inside_declared_ranges() {
        let p = TerrainParameters::default();
        for s in PARAMS.iter().filter(|s| s.group == ParamGroup::TerrainMaterial) {
            let v = p.field(s.id).unwrap();
            assert!(s.contains(v), "{} default {v} outside [{}, {}]", s.name, s.min, s.max);
        }
    }

    #[test]
    fn clamped_leaves_time_untouched() {
        let p = TerrainParameters { elevation: 9.0, texture_frequency: 0.0, time: 123.0, ..Default::default() };
        let c = p.clamped();
        assert_eq!(c.elevation, 5.0);
        assert_eq!(c.texture_frequency, 0.01);
        assert_eq!(c.time, 123.0);
    }

    #[test]
    fn non_finite_fields_fall_back_to_defaults() {
        let p = TerrainParameters { elevation: f32::NAN, hsl_hue: f32::INFINITY, ..Default::default() };
        let c = p.clamped();
        assert_eq!(c.elevation, 2.0);
        assert_eq!(c.hsl_hue, 0.12);
    }
}
