//! The terrain grid: a flat, finely subdivided plane lying in the xz plane.
//!
//! The mesh is built once and never changes. Displacement happens per frame
//! from `TerrainParameters`; the helpers here evaluate it in bulk on the CPU
//! for previews and regression snapshots.

use serde::{Deserialize, Serialize};

use crate::displacement::Displacement;
use crate::params::TerrainParameters;

pub const TERRAIN_SIZE: f32 = 1.0;
pub const TERRAIN_SEGMENTS: u32 = 1000;
/// Model scale applied to the unit plane.
pub const TERRAIN_SCALE: f32 = 10.0;

/// Render-state flags of the terrain material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaterialFlags {
    /// Blended with the background using the fragment alpha.
    pub transparent: bool,
    /// No face culling: both sides of the sheet are drawn.
    pub double_sided: bool,
}

impl Default for MaterialFlags {
    fn default() -> Self {
        Self { transparent: true, double_sided: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    size: f32,
    segments: u32,
    scale: f32,
    material: MaterialFlags,
}

impl TerrainMesh {
    /// Square plane of side `size` split into `segments × segments` quads,
    /// rotated to face +y and scaled by `scale`.
    pub fn plane(size: f32, segments: u32, scale: f32) -> Self {
        Self { size, segments: segments.max(1), scale, material: MaterialFlags::default() }
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn material(&self) -> MaterialFlags {
        self.material
    }

    /// Vertices per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.segments as usize + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.stride() * self.stride()
    }

    pub fn triangle_count(&self) -> usize {
        2 * (self.segments as usize) * (self.segments as usize)
    }

    /// Position of vertex `i` in model space (y = 0 before displacement).
    ///
    /// Rows run from z = −size/2 to +size/2, columns from x = −size/2 to +size/2.
    pub fn local_position(&self, i: usize) -> [f32; 3] {
        let row = i / self.stride();
        let col = i % self.stride();
        let step = self.size / self.segments as f32;
        let half = self.size * 0.5;
        // Built in the xy plane with y falling per row, then turned −90° about x: (x, y, 0) → (x, 0, −y).
        let x = col as f32 * step - half;
        let y = half - row as f32 * step;
        [x, 0.0, -y]
    }

    pub fn world_position(&self, i: usize) -> [f32; 3] {
        let [x, y, z] = self.local_position(i);
        [x * self.scale, y * self.scale, z * self.scale]
    }

    pub fn uv(&self, i: usize) -> [f32; 2] {
        let row = i / self.stride();
        let col = i % self.stride();
        let n = self.segments as f32;
        [col as f32 / n, 1.0 - row as f32 / n]
    }

    /// Triangle list, two per quad, counter-clockwise seen from +y.
    pub fn indices(&self) -> Vec<u32> {
        let s = self.stride() as u32;
        let mut out = Vec::with_capacity(self.triangle_count() * 3);
        for iy in 0..self.segments {
            for ix in 0..self.segments {
                let a = ix + s * iy;
                let b = ix + s * (iy + 1);
                let c = (ix + 1) + s * (iy + 1);
                let d = (ix + 1) + s * iy;
                out.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        out
    }

    /// World-space positions after displacement, row-major.
    pub fn displaced_positions(&self, d: &Displacement, p: &TerrainParameters) -> Vec<[f32; 3]> {
        let displace = |i: usize| d.displace(self.world_position(i), p).0;

        #[cfg(feature = "threading")]
        {
            use rayon::prelude::*;
            (0..self.vertex_count()).into_par_iter().map(displace).collect()
        }
        #[cfg(not(feature = "threading"))]
        {
            (0..self.vertex_count()).map(displace).collect()
        }
    }

    /// Decimated displaced positions: every `stride`-th vertex along both axes.
    pub fn snapshot(&self, d: &Displacement, p: &TerrainParameters, stride: usize) -> VertexSnapshot {
        let stride = stride.max(1);
        let mut positions = Vec::new();
        for row in (0..self.stride()).step_by(stride) {
            for col in (0..self.stride()).step_by(stride) {
                let i = row * self.stride() + col;
                positions.push(d.displace(self.world_position(i), p).0);
            }
        }
        VertexSnapshot {
            seed: d.seed(),
            segments: self.segments,
            scale: self.scale,
            stride,
            params: *p,
            positions,
        }
    }
}

impl Default for TerrainMesh {
    fn default() -> Self {
        Self::plane(TERRAIN_SIZE, TERRAIN_SEGMENTS, TERRAIN_SCALE)
    }
}

/// Stored vertex positions for regression checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexSnapshot {
    pub seed: u32,
    pub segments: u32,
    pub scale: f32,
    pub stride: usize,
    pub params: TerrainParameters,
    pub positions: Vec<[f32; 3]>,
}

impl VertexSnapshot {
    /// Largest per-component difference, or `None` when the layouts differ.
    pub fn max_deviation(&self, other: &VertexSnapshot) -> Option<f32> {
        if self.segments != other.segments
            || self.stride != other.stride
            || self.positions.len() != other.positions.len()
        {
            return None;
        }
        let worst = self
            .positions
            .iter()
            .zip(&other.positions)
            .flat_map(|(a, b)| (0..3).map(move |k| (a[k] - b[k]).abs()))
            .fold(0.0f32, f32::max);
        Some(worst)
    }
}
