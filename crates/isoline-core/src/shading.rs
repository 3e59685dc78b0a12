//! Per-fragment shading: HSL color from elevation and time, tinted by the
//! contour strip.
//!
//! 1. `v = elevation · textureFrequency + textureOffset`, wrapped, selects a
//!    contour texel.
//! 2. `hue = hslHue + hslHueOffset · f(elevation · hslHueFrequency + time · hslTimeFrequency)`
//! 3. `lightness = clamp(hslLightness + hslLightnessVariation · f(elevation · hslLightnessFrequency), 0, 1)`
//! 4. The HSL color (fixed saturation) is multiplied by the texel color; the
//!    texel alpha becomes the fragment alpha, so the material shows only where
//!    a band is painted.
//!
//! `f(x) = sin(2πx)`: one period per unit, bounded in `[-1, 1]`.

use std::f32::consts::TAU;

use serde::Serialize;

use crate::color::{Hsl, Rgb};
use crate::contour::ContourTexture;
use crate::params::TerrainParameters;

pub const SATURATION: f32 = 1.0;

/// Shared periodic function of the color model.
#[inline]
pub fn periodic(x: f32) -> f32 {
    (x * TAU).sin()
}

/// Output of the shading stage before blending against the clear color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fragment {
    pub color: Rgb,
    pub alpha: f32,
}

impl Fragment {
    /// Standard alpha blend over an opaque background.
    pub fn over(self, background: Rgb) -> Rgb {
        background.mix(self.color, self.alpha)
    }
}

/// Wrapped contour coordinate for `elevation`.
pub fn contour_coordinate(elevation: f32, p: &TerrainParameters) -> f32 {
    let v = (elevation * p.texture_frequency + p.texture_offset).rem_euclid(1.0);
    // rem_euclid rounds tiny negatives up to exactly 1.0.
    if v >= 1.0 { 0.0 } else { v }
}

pub fn hue(elevation: f32, p: &TerrainParameters) -> f32 {
    p.hsl_hue + p.hsl_hue_offset * periodic(elevation * p.hsl_hue_frequency + p.time * p.hsl_time_frequency)
}

pub fn lightness(elevation: f32, p: &TerrainParameters) -> f32 {
    (p.hsl_lightness + p.hsl_lightness_variation * periodic(elevation * p.hsl_lightness_frequency)).clamp(0.0, 1.0)
}

/// Untinted surface color at `elevation`.
pub fn base_color(elevation: f32, p: &TerrainParameters) -> Rgb {
    Hsl::new(hue(elevation, p), SATURATION, lightness(elevation, p)).to_rgb()
}

pub fn shade(elevation: f32, p: &TerrainParameters, contour: &ContourTexture) -> Fragment {
    let [r, g, b, a] = contour.sample(contour_coordinate(elevation, p));
    let base = base_color(elevation, p);
    Fragment {
        color: Rgb::new(base.r * r, base.g * g, base.b * b),
        alpha: a,
    }
}
