//! Camera anchor poses for pointer parallax.
//!
//! The poses are data only. Nothing in the frame loop blends between them
//! yet; a host that wants pointer-driven parallax installs a `ParallaxHook`
//! on the animation driver and receives the active preset every tick.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewPreset {
    pub position: Vec3,
    /// Euler angles (XYZ order), radians.
    pub rotation: Vec3,
    /// Focus distance.
    pub focus: f32,
    /// Scale of camera offset per unit of pointer movement.
    pub parallax_multiplier: f32,
}

/// The four anchor poses, in presentation order.
pub fn default_presets() -> [ViewPreset; 4] {
    [
        ViewPreset {
            position: Vec3::new(0.0, 2.124, -0.172),
            rotation: Vec3::new(-1.489, -PI, 0.0),
            focus: 2.14,
            parallax_multiplier: 0.25,
        },
        ViewPreset {
            position: Vec3::new(1.0, 1.1, 0.0),
            rotation: Vec3::new(-0.833, 1.596, 1.651),
            focus: 1.1,
            parallax_multiplier: 0.12,
        },
        ViewPreset {
            position: Vec3::new(1.0, 0.87, -0.97),
            rotation: Vec3::new(-0.638, 2.33, 0.0),
            focus: 1.36,
            parallax_multiplier: 0.12,
        },
        ViewPreset {
            position: Vec3::new(-1.43, 0.33, -0.144),
            rotation: Vec3::new(-0.312, -1.67, 0.0),
            focus: 1.25,
            parallax_multiplier: 0.12,
        },
    ]
}

/// Read-only preset list plus the index of the active one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPresets {
    index: usize,
    presets: [ViewPreset; 4],
}

impl ViewPresets {
    pub fn new(index: usize) -> Self {
        let mut v = Self { index: 0, presets: default_presets() };
        v.select(index);
        v
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn active(&self) -> &ViewPreset {
        &self.presets[self.index]
    }

    pub fn all(&self) -> &[ViewPreset] {
        &self.presets
    }

    /// Make `index` active. Out-of-range indices select the last preset.
    pub fn select(&mut self, index: usize) -> &ViewPreset {
        self.index = index.min(self.presets.len() - 1);
        &self.presets[self.index]
    }
}

impl Default for ViewPresets {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Extension point for pointer parallax.
///
/// `pointer` is the normalized pointer position in `[-0.5, 0.5]²`, or zero
/// when the host does not track one.
pub trait ParallaxHook {
    fn apply(&mut self, preset: &ViewPreset, pointer: Vec2);
}
