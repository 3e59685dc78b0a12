//! Per-vertex displacement: layered Perlin noise shaped by a valley profile.
//!
//! elevation = valley · valleyAmp
//!           + (general · N_g(p · generalFreq) + details · N_d(p · detailsFreq)) · (valley + 0.1)
//! final     = elevation · uElevation
//!
//! `valley` is a cosine trough across the z axis in `[0, 1]`: 0 on the valley
//! floor at z = 0, rising to 1 on the ridges. The noise octaves are damped on
//! the floor and full-strength on the ridges; the 0.1 floor keeps some relief
//! everywhere. `N_g`/`N_d` are independent Perlin fields with fixed seeds
//! derived from the session seed.
use std::f64::consts::PI;

use noise::{NoiseFn, Perlin};

use crate::params::TerrainParameters;

/// Noise amplitude kept on the valley floor.
const VALLEY_FLOOR_RELIEF: f64 = 0.1;

/// Breakdown of one elevation sample, before the overall `uElevation` scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationTerms {
    /// Valley profile in `[0, 1]`.
    pub valley: f64,
    /// `general · N_g`, unmodulated.
    pub general: f64,
    /// `details · N_d`, unmodulated.
    pub details: f64,
}

impl ElevationTerms {
    pub fn combine(&self, valley_amplitude: f64) -> f64 {
        self.valley * valley_amplitude + (self.general + self.details) * (self.valley + VALLEY_FLOOR_RELIEF)
    }
}

/// Elevation function. Holds only the seeded noise sources, no per-frame state.
#[derive(Debug, Clone)]
pub struct Displacement {
    seed: u32,
    general: Perlin,
    details: Perlin,
}

impl Displacement {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            general: Perlin::new(seed ^ 0x6E01),
            details: Perlin::new(seed ^ 0xD37A),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Valley profile at depth `z`: `cos(z · f + π) · 0.5 + 0.5`.
    pub fn valley(z: f64, frequency: f64) -> f64 {
        (z * frequency + PI).cos() * 0.5 + 0.5
    }

    pub fn terms(&self, x: f32, z: f32, p: &TerrainParameters) -> ElevationTerms {
        let (x, z) = (x as f64, z as f64);

        let gf = p.elevation_general_frequency as f64;
        let general = p.elevation_general as f64 * self.general.get([x * gf, z * gf]);

        let df = p.elevation_details_frequency as f64;
        let details = p.elevation_details as f64 * self.details.get([x * df, z * df]);

        ElevationTerms {
            valley: Self::valley(z, p.elevation_valley_frequency as f64),
            general,
            details,
        }
    }

    /// Final vertical displacement at planar world position `(x, z)`.
    pub fn elevation(&self, x: f32, z: f32, p: &TerrainParameters) -> f32 {
        let e = self.terms(x, z, p).combine(p.elevation_valley as f64);
        (e * p.elevation as f64) as f32
    }

    /// Displace a world-space vertex along +y. Returns the new position and
    /// the elevation forwarded to shading.
    pub fn displace(&self, position: [f32; 3], p: &TerrainParameters) -> ([f32; 3], f32) {
        let e = self.elevation(position[0], position[2], p);
        ([position[0], position[1] + e, position[2]], e)
    }
}

impl Default for Displacement {
    fn default() -> Self {
        Self::new(0)
    }
}
