//! Contour texture synthesis.
//!
//! The contour texture is a 1×128 RGBA strip: one thick opaque white band at
//! the top, then `lines_count - 1` thin accent bands spread over the remaining
//! height. The shading stage samples it with repeat wrapping and nearest
//! filtering, so the strip tiles infinitely along elevation.
//!
//! Painting follows 2-D canvas `fillRect` semantics: integer-rounded rows,
//! a global alpha per band and source-over compositing onto a cleared raster.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::TextureError;
use crate::params::ParamId;

pub const CONTOUR_WIDTH: usize = 1;
pub const CONTOUR_HEIGHT: usize = 128;

/// Color of the thin bands (`#00ffff`).
const ACCENT: [f32; 3] = [0.0, 1.0, 1.0];
const BIG_LINE: [f32; 3] = [1.0, 1.0, 1.0];

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContourTextureConfig {
    /// Show the raster as an on-screen strip. Display only; never regenerates.
    pub visible: bool,
    /// Number of segments below the big line (≥ 1).
    pub lines_count: u32,
    /// Big line height as a fraction of the raster height.
    pub big_line_width: f32,
    /// Thin band height as a fraction of the raster height.
    pub small_line_width: f32,
    pub small_line_alpha: f32,
    #[serde(skip, default = "default_width")]
    pub width: usize,
    #[serde(skip, default = "default_height")]
    pub height: usize,
}

fn default_width() -> usize {
    CONTOUR_WIDTH
}

fn default_height() -> usize {
    CONTOUR_HEIGHT
}

impl Default for ContourTextureConfig {
    fn default() -> Self {
        Self {
            visible: false,
            lines_count: 5,
            big_line_width: 0.08,
            small_line_width: 0.01,
            small_line_alpha: 0.5,
            width: CONTOUR_WIDTH,
            height: CONTOUR_HEIGHT,
        }
    }
}

impl ContourTextureConfig {
    /// Clamp the tunable fields into their declared ranges. Non-finite values
    /// take their default; `lines_count` is rounded.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        let fix = |id: ParamId, v: f32, fallback: f32| if v.is_finite() { id.spec().clamp(v) } else { fallback };
        self.lines_count = ParamId::ContourLinesCount.spec().clamp(self.lines_count as f32) as u32;
        self.big_line_width = fix(ParamId::ContourBigLineWidth, self.big_line_width, defaults.big_line_width);
        self.small_line_width = fix(ParamId::ContourSmallLineWidth, self.small_line_width, defaults.small_line_width);
        self.small_line_alpha = fix(ParamId::ContourSmallLineAlpha, self.small_line_alpha, defaults.small_line_alpha);
        self
    }

    /// True when `other` would paint a different raster. `visible` is ignored.
    pub fn raster_differs(&self, other: &Self) -> bool {
        self.lines_count != other.lines_count
            || self.big_line_width != other.big_line_width
            || self.small_line_width != other.small_line_width
            || self.small_line_alpha != other.small_line_alpha
            || self.width != other.width
            || self.height != other.height
    }

    /// Height in rows of the big line.
    pub fn big_line_rows(&self) -> usize {
        (self.height as f64 * self.big_line_width as f64).round().max(0.0) as usize
    }

    pub fn small_line_rows(&self) -> usize {
        (self.height as f64 * self.small_line_width as f64).round().max(0.0) as usize
    }

    /// First row of each thin band, top to bottom. May lie past the raster end.
    pub fn small_line_starts(&self) -> Vec<usize> {
        let big = self.big_line_rows();
        let lines = self.lines_count.max(1) as usize;
        let remaining = self.height.saturating_sub(big) as f64;
        let segment = (remaining / lines as f64).round() as usize;
        (1..lines).map(|i| big + segment * i).collect()
    }
}

// ── Sampler state ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Filter {
    Nearest,
    Linear,
}

/// How the GPU samples the contour raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplerState {
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub mag_filter: Filter,
    /// Raster row 0 is uploaded at the top of texture space (v → 1).
    pub flip_y: bool,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
            mag_filter: Filter::Nearest,
            flip_y: true,
        }
    }
}

// ── Raster ────────────────────────────────────────────────────────────────────

/// Unpremultiplied RGBA8 raster, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourTexture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 4]>,
    /// Incremented on every regeneration; the backend re-uploads when it changes.
    pub version: u64,
    pub sampler: SamplerState,
}

impl ContourTexture {
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> [u8; 4] {
        self.pixels[row * self.width + col]
    }

    /// Raw RGBA bytes, row-major, ready for upload.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }

    /// Nearest sample at texture coordinate `v` (column 0), honouring wrap and flip.
    ///
    /// Returns normalized `[r, g, b, a]`.
    pub fn sample(&self, v: f32) -> [f32; 4] {
        let t = match self.sampler.wrap_t {
            Wrap::Repeat => v.rem_euclid(1.0),
            Wrap::ClampToEdge => v.clamp(0.0, 1.0),
        };
        let texel = ((t * self.height as f32).floor() as usize).min(self.height - 1);
        let row = if self.sampler.flip_y { self.height - 1 - texel } else { texel };
        let [r, g, b, a] = self.get(row, 0);
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0]
    }

    /// Widen the strip to `scale_x` columns for on-screen or PNG display.
    pub fn preview_rgba(&self, scale_x: usize) -> Vec<u8> {
        let scale_x = scale_x.max(1);
        let mut out = Vec::with_capacity(self.width * scale_x * self.height * 4);
        for row in 0..self.height {
            for col in 0..self.width {
                let px = self.get(row, col);
                for _ in 0..scale_x {
                    out.extend_from_slice(&px);
                }
            }
        }
        out
    }
}

/// Paint a full raster for `config`. Pure: the same config gives the same bytes.
pub fn rasterize(config: &ContourTextureConfig) -> Result<Vec<[u8; 4]>, TextureError> {
    let (w, h) = (config.width, config.height);
    if w == 0 || h == 0 {
        return Err(TextureError::ZeroSized { width: w, height: h });
    }
    let n = w * h;
    let mut rgba: Vec<[f32; 4]> = Vec::new();
    rgba.try_reserve_exact(n)
        .map_err(|_| TextureError::Allocation { bytes: n * 16 })?;
    rgba.resize(n, [0.0; 4]);

    // Big line.
    let big = config.big_line_rows();
    fill_rows(&mut rgba, w, h, 0, big, BIG_LINE, 1.0);

    // Thin bands at the start of each segment after the first.
    let thickness = config.small_line_rows();
    let alpha = config.small_line_alpha.clamp(0.0, 1.0);
    for start in config.small_line_starts() {
        fill_rows(&mut rgba, w, h, start, thickness, ACCENT, alpha);
    }

    Ok(rgba.into_iter().map(quantize).collect())
}

/// Source-over fill of rows `[start, start + rows)`, clipped to the raster.
fn fill_rows(
    rgba: &mut [[f32; 4]],
    width: usize,
    height: usize,
    start: usize,
    rows: usize,
    color: [f32; 3],
    alpha: f32,
) {
    let end = start.saturating_add(rows).min(height);
    for row in start.min(height)..end {
        for px in &mut rgba[row * width..(row + 1) * width] {
            let dst_a = px[3];
            let out_a = alpha + dst_a * (1.0 - alpha);
            if out_a <= 0.0 {
                *px = [0.0; 4];
                continue;
            }
            for c in 0..3 {
                px[c] = (color[c] * alpha + px[c] * dst_a * (1.0 - alpha)) / out_a;
            }
            px[3] = out_a;
        }
    }
}

fn quantize(px: [f32; 4]) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(px[0]), q(px[1]), q(px[2]), q(px[3])]
}

// ── Synthesizer ───────────────────────────────────────────────────────────────

/// Exclusive owner of the contour raster.
///
/// Regeneration builds a complete new raster and swaps it in, so a sampler
/// never observes a half-painted strip. On failure the previous raster stays.
#[derive(Debug)]
pub struct ContourSynthesizer {
    texture: ContourTexture,
    config: ContourTextureConfig,
    /// Store revision the current raster was painted for.
    revision: Option<u64>,
}

impl ContourSynthesizer {
    pub fn new(config: ContourTextureConfig) -> Result<Self, TextureError> {
        let pixels = rasterize(&config)?;
        debug!("contour texture created: {config:?}");
        Ok(Self {
            texture: ContourTexture {
                width: config.width,
                height: config.height,
                pixels,
                version: 1,
                sampler: SamplerState::default(),
            },
            config,
            revision: None,
        })
    }

    /// Paint for `config`, recording it as current for store `revision`.
    pub fn for_revision(config: ContourTextureConfig, revision: u64) -> Result<Self, TextureError> {
        let mut s = Self::new(config)?;
        s.revision = Some(revision);
        Ok(s)
    }

    pub fn texture(&self) -> &ContourTexture {
        &self.texture
    }

    pub fn config(&self) -> &ContourTextureConfig {
        &self.config
    }

    /// Repaint for `config` and mark the texture for upload.
    ///
    /// Always repaints the whole raster, even for an unchanged config.
    pub fn regenerate(&mut self, config: ContourTextureConfig) -> Result<&ContourTexture, TextureError> {
        let pixels = rasterize(&config)?;
        self.texture = ContourTexture {
            width: config.width,
            height: config.height,
            pixels,
            version: self.texture.version + 1,
            sampler: self.texture.sampler,
        };
        self.config = config;
        debug!(
            "contour texture regenerated: v{} lines={} big={} small={} alpha={}",
            self.texture.version,
            config.lines_count,
            config.big_line_width,
            config.small_line_width,
            config.small_line_alpha
        );
        Ok(&self.texture)
    }

    /// Regenerate if the store's contour revision moved since the last paint.
    ///
    /// Returns true when a new raster was produced. Failures are logged and the
    /// previous raster stays bound.
    pub fn sync(&mut self, revision: u64, config: ContourTextureConfig) -> bool {
        if self.revision == Some(revision) {
            return false;
        }
        match self.regenerate(config) {
            Ok(_) => {
                self.revision = Some(revision);
                true
            }
            Err(e) => {
                warn!("contour regeneration failed, keeping v{}: {e}", self.texture.version);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    fn column(c: &ContourTextureConfig) -> Vec<[u8; 4]> {
        rasterize(c).unwrap()
    }

    #[test]
    fn default_layout_matches_canvas_rounding() {
        let px = column(&ContourTextureConfig::default());
        // round(128 × 0.08) = 10 rows of big line.
        for row in 0..10 {
            assert_eq!(px[row], WHITE, "row {row} should be big line");
        }
        // Segment = round((128 − 10) / 5) = 24 → first band at row 34.
        for row in 10..34 {
            assert_eq!(px[row], CLEAR, "row {row} should be transparent");
        }
        assert_eq!(px[34], [0, 255, 255, 128]);
        assert_eq!(px[35], CLEAR);
    }

    #[test]
    fn band_starts_follow_segments() {
        let c = ContourTextureConfig::default();
        assert_eq!(c.small_line_starts(), vec![34, 58, 82, 106]);
        let px = column(&c);
        for start in [34, 58, 82, 106] {
            assert_eq!(px[start][3], 128, "band at {start}");
        }
    }

    #[test]
    fn single_line_has_no_small_bands() {
        let c = ContourTextureConfig { lines_count: 1, ..Default::default() };
        assert!(c.small_line_starts().is_empty());
        let px = column(&c);
        assert!(px[10..].iter().all(|p| *p == CLEAR));
    }

    #[test]
    fn zero_widths_paint_nothing() {
        let c = ContourTextureConfig { big_line_width: 0.0, small_line_width: 0.0, ..Default::default() };
        assert!(column(&c).iter().all(|p| *p == CLEAR));
    }

    #[test]
    fn overlapping_bands_composite_source_over() {
        // 64-row big line, segment = round(64 / 10) = 6, bands 13 rows thick.
        let c = ContourTextureConfig {
            lines_count: 10,
            big_line_width: 0.5,
            small_line_width: 0.1,
            small_line_alpha: 0.5,
            ..Default::default()
        };
        assert_eq!(c.small_line_starts()[..2], [70, 76]);
        let px = column(&c);
        assert_eq!(px[70], [0, 255, 255, 128]);
        // Row 76 is covered by the first two bands: 0.5 + 0.5 × 0.5 = 0.75.
        assert_eq!(px[76], [0, 255, 255, 191]);
    }

    #[test]
    fn bands_past_the_end_are_clipped() {
        let c = ContourTextureConfig {
            lines_count: 10,
            big_line_width: 0.5,
            small_line_width: 0.1,
            ..Default::default()
        };
        // Last band starts at 64 + 6 × 9 = 118 and would run to row 131.
        assert_eq!(c.small_line_starts().last(), Some(&118));
        let px = column(&c);
        assert_eq!(px.len(), CONTOUR_HEIGHT);
        assert!(px[127][3] > 0);
    }

    #[test]
    fn regeneration_is_idempotent_and_bumps_version() {
        let mut s = ContourSynthesizer::new(ContourTextureConfig::default()).unwrap();
        let v0 = s.texture().version;
        let first = s.regenerate(ContourTextureConfig::default()).unwrap().pixels.clone();
        let second = s.regenerate(ContourTextureConfig::default()).unwrap().pixels.clone();
        assert_eq!(first, second);
        assert_eq!(s.texture().version, v0 + 2);
    }

    #[test]
    fn failed_regeneration_keeps_previous_raster() {
        let mut s = ContourSynthesizer::new(ContourTextureConfig::default()).unwrap();
        let before = s.texture().clone();
        let bad = ContourTextureConfig { height: 0, ..Default::default() };
        assert_eq!(
            s.regenerate(bad).unwrap_err(),
            TextureError::ZeroSized { width: 1, height: 0 }
        );
        assert_eq!(s.texture(), &before);
        assert!(!s.sync(7, bad));
        assert_eq!(s.texture(), &before);
    }

    #[test]
    fn sync_regenerates_only_on_new_revision() {
        let mut s = ContourSynthesizer::new(ContourTextureConfig::default()).unwrap();
        assert!(s.sync(1, ContourTextureConfig::default()));
        assert!(!s.sync(1, ContourTextureConfig::default()));
        let thicker = ContourTextureConfig { big_line_width: 0.2, ..Default::default() };
        assert!(s.sync(2, thicker));
        assert_eq!(s.config().big_line_width, 0.2);
    }

    #[test]
    fn sampling_wraps_and_flips() {
        let s = ContourSynthesizer::new(ContourTextureConfig::default()).unwrap();
        let t = s.texture();
        // v just below 1 hits raster row 0 (big line) because of flip_y.
        assert_eq!(t.sample(0.999)[3], 1.0);
        assert_eq!(t.sample(1.999), t.sample(0.999));
        assert_eq!(t.sample(-0.001), t.sample(0.999));
        // v = 0 is the bottom row, which is transparent by default.
        assert_eq!(t.sample(0.0)[3], 0.0);
    }

    #[test]
    fn preview_widens_each_row() {
        let s = ContourSynthesizer::new(ContourTextureConfig::default()).unwrap();
        let img = s.texture().preview_rgba(50);
        assert_eq!(img.len(), 50 * CONTOUR_HEIGHT * 4);
        assert_eq!(&img[..4], &WHITE);
        assert_eq!(&img[49 * 4..50 * 4], &WHITE);
    }

    #[test]
    fn clamped_config_stays_in_declared_ranges() {
        let cfg = ContourTextureConfig {
            lines_count: 0,
            big_line_width: 0.9,
            small_line_width: f32::NAN,
            small_line_alpha: 7.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(cfg.lines_count, 1);
        assert_eq!(cfg.big_line_width, 0.5);
        assert_eq!(cfg.small_line_width, 0.01);
        assert_eq!(cfg.small_line_alpha, 1.0);
    }
}
