//! Render seam: frame description, compositing passes and the renderer that
//! keeps camera, surface and compositor buffers the same size.
//!
//! The GPU work itself belongs to a `RenderBackend` implementation supplied by
//! the host. This module decides *what* is drawn each tick and in which order.

use glam::Mat4;
use log::info;
use serde::Serialize;

use crate::camera::{PerspectiveCamera, Sizes};
use crate::color::Rgb;
use crate::contour::ContourTexture;
use crate::mesh::TerrainMesh;
use crate::params::TerrainParameters;

// ── Frame ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputEncoding {
    Linear,
    Srgb,
}

/// Uniform names in the order `uniform_block` lays them out.
pub const UNIFORM_NAMES: [&str; 17] = [
    "uElevation",
    "uElevationValley",
    "uElevationValleyFrequency",
    "uElevationGeneral",
    "uElevationGeneralFrequency",
    "uElevationDetails",
    "uElevationDetailsFrequency",
    "uTextureFrequency",
    "uTextureOffset",
    "uTime",
    "uHslHue",
    "uHslHueOffset",
    "uHslHueFrequency",
    "uHslTimeFrequency",
    "uHslLightness",
    "uHslLightnessVariation",
    "uHslLightnessFrequency",
];

/// Flatten the parameters into the uniform layout named by `UNIFORM_NAMES`.
pub fn uniform_block(p: &TerrainParameters) -> [f32; 17] {
    [
        p.elevation,
        p.elevation_valley,
        p.elevation_valley_frequency,
        p.elevation_general,
        p.elevation_general_frequency,
        p.elevation_details,
        p.elevation_details_frequency,
        p.texture_frequency,
        p.texture_offset,
        p.time,
        p.hsl_hue,
        p.hsl_hue_offset,
        p.hsl_hue_frequency,
        p.hsl_time_frequency,
        p.hsl_lightness,
        p.hsl_lightness_variation,
        p.hsl_lightness_frequency,
    ]
}

/// Everything one draw needs. Borrowed for the duration of a single tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub params: &'a TerrainParameters,
    pub contour: &'a ContourTexture,
    pub mesh: &'a TerrainMesh,
    pub view: Mat4,
    pub projection: Mat4,
    pub clear_color: Rgb,
    pub sizes: Sizes,
    pub encoding: OutputEncoding,
}

// ── Backend seam ──────────────────────────────────────────────────────────────

/// Where a pass writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The compositor's offscreen buffer.
    Offscreen,
    /// The presentation surface.
    Screen,
}

/// GPU-side collaborator. Implemented by the host (WebGL, wgpu, a test recorder).
pub trait RenderBackend {
    /// Resize the presentation surface.
    fn set_surface_size(&mut self, sizes: Sizes);
    /// Resize the compositor's offscreen buffers.
    fn set_buffer_size(&mut self, sizes: Sizes);
    /// Replace the whole contour texture on the GPU.
    fn upload_contour(&mut self, texture: &ContourTexture);
    /// Draw the terrain scene into `target`.
    fn draw_scene(&mut self, frame: &Frame<'_>, target: Target);
}

/// One full-screen stage of the compositor.
pub trait Pass {
    fn name(&self) -> &str;
    fn set_size(&mut self, sizes: Sizes);
    /// `last` is true for the final pass, which writes to the screen.
    fn render(&mut self, backend: &mut dyn RenderBackend, frame: &Frame<'_>, last: bool);
}

/// Draws the scene as-is.
#[derive(Debug, Default)]
pub struct RenderPass {
    sizes: Option<Sizes>,
}

impl RenderPass {
    pub fn sizes(&self) -> Option<Sizes> {
        self.sizes
    }
}

impl Pass for RenderPass {
    fn name(&self) -> &str {
        "render"
    }

    fn set_size(&mut self, sizes: Sizes) {
        self.sizes = Some(sizes);
    }

    fn render(&mut self, backend: &mut dyn RenderBackend, frame: &Frame<'_>, last: bool) {
        let target = if last { Target::Screen } else { Target::Offscreen };
        backend.draw_scene(frame, target);
    }
}

/// Ordered list of passes run once per frame.
pub struct Composer {
    passes: Vec<Box<dyn Pass>>,
    sizes: Sizes,
}

impl Composer {
    /// A composer with the default single `RenderPass`.
    pub fn new(sizes: Sizes) -> Self {
        let mut c = Self { passes: Vec::new(), sizes };
        c.add_pass(Box::new(RenderPass::default()));
        c
    }

    pub fn add_pass(&mut self, mut pass: Box<dyn Pass>) {
        pass.set_size(self.sizes);
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn sizes(&self) -> Sizes {
        self.sizes
    }

    fn set_size(&mut self, backend: &mut dyn RenderBackend, sizes: Sizes) {
        self.sizes = sizes;
        backend.set_buffer_size(sizes);
        for pass in &mut self.passes {
            pass.set_size(sizes);
        }
    }

    fn render(&mut self, backend: &mut dyn RenderBackend, frame: &Frame<'_>) {
        let n = self.passes.len();
        for (i, pass) in self.passes.iter_mut().enumerate() {
            pass.render(backend, frame, i + 1 == n);
        }
    }
}

// ── Renderer ──────────────────────────────────────────────────────────────────

/// Owns the backend, compositor and camera so a resize can update all three
/// before any further frame is drawn.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    composer: Composer,
    camera: PerspectiveCamera,
    sizes: Sizes,
    clear_color: Rgb,
    encoding: OutputEncoding,
    uploaded_version: Option<u64>,
}

impl<B: RenderBackend> Renderer<B> {
    pub fn new(mut backend: B, sizes: Sizes, clear_color: Rgb) -> Self {
        backend.set_surface_size(sizes);
        let mut composer = Composer::new(sizes);
        composer.set_size(&mut backend, sizes);
        Self {
            backend,
            composer,
            camera: PerspectiveCamera::new(sizes.aspect()),
            sizes,
            clear_color,
            encoding: OutputEncoding::Srgb,
            uploaded_version: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn sizes(&self) -> Sizes {
        self.sizes
    }

    pub fn clear_color(&self) -> Rgb {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Rgb) {
        self.clear_color = color;
    }

    /// Apply a host window resize: camera aspect and projection, surface size,
    /// compositor buffer size. Degenerate sizes are clamped to 1×1.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) -> Sizes {
        let sizes = Sizes::new(width, height, device_pixel_ratio);
        self.camera.set_aspect(sizes.aspect());
        self.backend.set_surface_size(sizes);
        self.composer.set_size(&mut self.backend, sizes);
        self.sizes = sizes;
        info!("resized to {}x{} @{}x", sizes.width, sizes.height, sizes.pixel_ratio);
        sizes
    }

    /// Draw one frame. Re-uploads the contour texture first if its version moved.
    pub fn render(&mut self, params: &TerrainParameters, contour: &ContourTexture, mesh: &TerrainMesh) {
        if self.uploaded_version != Some(contour.version) {
            self.backend.upload_contour(contour);
            self.uploaded_version = Some(contour.version);
        }
        let frame = Frame {
            params,
            contour,
            mesh,
            view: self.camera.view(),
            projection: self.camera.projection(),
            clear_color: self.clear_color,
            sizes: self.sizes,
            encoding: self.encoding,
        };
        self.composer.render(&mut self.backend, &frame);
    }
}

// ── Recording backend ─────────────────────────────────────────────────────────

/// Backend that records calls instead of drawing. Used by headless runs and tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingBackend {
    pub surface: Option<Sizes>,
    pub buffer: Option<Sizes>,
    pub uploads: Vec<u64>,
    pub draws: Vec<DrawRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRecord {
    pub target: Target,
    pub time: f32,
    pub contour_version: u64,
    pub aspect: f32,
    pub surface: Option<Sizes>,
    pub buffer: Option<Sizes>,
    pub frame_sizes: Sizes,
}

impl RenderBackend for RecordingBackend {
    fn set_surface_size(&mut self, sizes: Sizes) {
        self.surface = Some(sizes);
    }

    fn set_buffer_size(&mut self, sizes: Sizes) {
        self.buffer = Some(sizes);
    }

    fn upload_contour(&mut self, texture: &ContourTexture) {
        self.uploads.push(texture.version);
    }

    fn draw_scene(&mut self, frame: &Frame<'_>, target: Target) {
        // Recover the aspect the camera projected with: proj.y / proj.x.
        let aspect = frame.projection.y_axis.y / frame.projection.x_axis.x;
        self.draws.push(DrawRecord {
            target,
            time: frame.params.time,
            contour_version: frame.contour.version,
            aspect,
            surface: self.surface,
            buffer: self.buffer,
            frame_sizes: frame.sizes,
        });
    }
}
