//! Viewport sizing and the perspective camera.

use glam::{Mat4, Vec3};
use serde::Serialize;

/// Device pixel ratios above this are rendered at this density.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

pub const CAMERA_FOV_DEG: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;
pub const CAMERA_START: Vec3 = Vec3::new(0.0, 2.124, -0.172);

/// Presentation size in CSS/logical pixels plus the pixel density to render at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sizes {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Sizes {
    /// Zero dimensions become 1; the pixel ratio is capped at `MAX_PIXEL_RATIO`
    /// and non-positive or non-finite ratios fall back to 1.
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        let pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        };
        Self { width: width.max(1), height: height.max(1), pixel_ratio }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Backing-buffer resolution in device pixels (never below 1×1).
    pub fn physical(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).floor() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

impl Default for Sizes {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    aspect: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(aspect: f32) -> Self {
        let mut cam = Self {
            fov_deg: CAMERA_FOV_DEG,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            position: CAMERA_START,
            target: Vec3::ZERO,
            aspect,
            projection: Mat4::IDENTITY,
        };
        cam.update_projection();
        cam
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Set the aspect ratio and rebuild the projection in one step.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection();
    }

    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far);
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }
}
