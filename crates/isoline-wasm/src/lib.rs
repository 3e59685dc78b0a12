//! Browser bindings.
//!
//! The host page owns the WebGL scene, the orbit controls and the debug
//! panel. Once per `requestAnimationFrame` it calls `tick(elapsed)` and then
//! reads back what changed: the uniform block, the camera matrices, the clear
//! color and, when its version moved, the contour raster to upload.

use isoline_core::camera::Sizes;
use isoline_core::contour::ContourTexture;
use isoline_core::params::{ParamValue, Reaction, PARAMS};
use isoline_core::render::{uniform_block, Frame, RenderBackend, Renderer, Target, UNIFORM_NAMES};
use isoline_core::{
    AnimationDriver, ManualClock, PanelWriter, ParamInput, SceneConfig, StopSignal, TerrainScene, TickReport,
    WriteOutcome,
};
use log::info;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ── Host backend ──────────────────────────────────────────────────────────────

/// Collects what the host needs to issue the draw itself.
#[derive(Debug, Default)]
struct HostBackend {
    uniforms: [f32; 17],
    view_projection: [f32; 16],
    clear_color: [f32; 3],
    surface: Option<Sizes>,
    buffer: Option<Sizes>,
    contour: Vec<u8>,
    contour_version: u64,
    contour_pending: bool,
    draws: u64,
}

impl RenderBackend for HostBackend {
    fn set_surface_size(&mut self, sizes: Sizes) {
        self.surface = Some(sizes);
    }

    fn set_buffer_size(&mut self, sizes: Sizes) {
        self.buffer = Some(sizes);
    }

    fn upload_contour(&mut self, texture: &ContourTexture) {
        self.contour = texture.as_bytes();
        self.contour_version = texture.version;
        self.contour_pending = true;
    }

    fn draw_scene(&mut self, frame: &Frame<'_>, target: Target) {
        if target != Target::Screen {
            return;
        }
        self.uniforms = uniform_block(frame.params);
        self.view_projection = (frame.projection * frame.view).to_cols_array();
        self.clear_color = frame.clear_color.to_array();
        self.draws += 1;
    }
}

// ── Session core ──────────────────────────────────────────────────────────────

/// Everything behind `TerrainSession` that does not touch `JsValue`.
struct SessionCore {
    driver: AnimationDriver<HostBackend, ManualClock>,
    panel: PanelWriter,
    stop: StopSignal,
}

impl SessionCore {
    fn new(config: &SceneConfig, width: u32, height: u32, pixel_ratio: f32) -> isoline_core::Result<Self> {
        let (scene, panel, time) = TerrainScene::from_config(config)?;
        let renderer = Renderer::new(HostBackend::default(), Sizes::new(width, height, pixel_ratio), scene.clear_color());
        info!("terrain session created at {width}x{height}");
        Ok(Self {
            driver: AnimationDriver::new(scene, time, renderer, ManualClock::default()),
            panel,
            stop: StopSignal::new(),
        })
    }

    fn set_param(&mut self, name: &str, value: ParamInput<'_>) -> Result<WriteOutcome, isoline_core::ParamError> {
        let outcome = self.panel.set_by_name(name, value)?;
        self.driver.scene_mut().apply(&outcome);
        Ok(outcome)
    }

    fn tick(&mut self, elapsed: f64) -> Option<TickReport> {
        if self.stop.is_raised() {
            return None;
        }
        self.driver.clock_mut().set(elapsed);
        Some(self.driver.tick())
    }

    fn backend(&self) -> &HostBackend {
        self.driver.renderer().backend()
    }

    fn take_contour_upload(&mut self) -> Option<Vec<u8>> {
        let backend = self.driver.renderer_mut().backend_mut();
        if !backend.contour_pending {
            return None;
        }
        backend.contour_pending = false;
        Some(backend.contour.clone())
    }
}

/// `setParam` result as seen by the host: a plain object.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteReport {
    value: ParamValue,
    clamped: bool,
    changed: bool,
    reaction: Reaction,
}

impl From<WriteOutcome> for WriteReport {
    fn from(o: WriteOutcome) -> Self {
        Self { value: o.value, clamped: o.clamped, changed: o.changed, reaction: o.reaction }
    }
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ── Exports ───────────────────────────────────────────────────────────────────

#[wasm_bindgen]
pub struct TerrainSession {
    core: SessionCore,
}

#[wasm_bindgen]
impl TerrainSession {
    /// `config_json` may be empty for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, width: u32, height: u32, pixel_ratio: f32) -> Result<TerrainSession, JsValue> {
        let config = if config_json.trim().is_empty() {
            SceneConfig::default()
        } else {
            SceneConfig::from_json_str(config_json).map_err(|e| js_err(format!("Invalid config: {e}")))?
        };
        let core = SessionCore::new(&config, width, height, pixel_ratio).map_err(js_err)?;
        Ok(TerrainSession { core })
    }

    /// Write a parameter by name or panel label. Returns the write outcome
    /// (stored value, whether it was clamped, the reaction).
    #[wasm_bindgen(js_name = setParam)]
    pub fn set_param(&mut self, name: &str, value: JsValue) -> Result<JsValue, JsValue> {
        let text;
        let input = if let Some(b) = value.as_bool() {
            ParamInput::Bool(b)
        } else if let Some(n) = value.as_f64() {
            ParamInput::Number(n)
        } else if let Some(s) = value.as_string() {
            text = s;
            ParamInput::Text(&text)
        } else {
            return Err(js_err(format!("{name}: expected a number, boolean or color string")));
        };
        let outcome = self.core.set_param(name, input).map_err(js_err)?;
        serde_wasm_bindgen::to_value(&WriteReport::from(outcome)).map_err(js_err)
    }

    /// Current value of one parameter.
    pub fn param(&self, name: &str) -> Result<JsValue, JsValue> {
        let v = self.core.driver.scene().store().get_by_name(name).map_err(js_err)?;
        serde_wasm_bindgen::to_value(&v).map_err(js_err)
    }

    /// The whole store as one object.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.core.driver.scene().store().snapshot()).map_err(js_err)
    }

    /// Name, label, group, kind, range and step of every tunable.
    #[wasm_bindgen(js_name = paramTable)]
    pub fn param_table() -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&PARAMS.to_vec()).map_err(js_err)
    }

    /// Advance to `elapsed` seconds and prepare one frame. Returns `null` once stopped.
    pub fn tick(&mut self, elapsed: f64) -> Result<JsValue, JsValue> {
        match self.core.tick(elapsed) {
            Some(report) => serde_wasm_bindgen::to_value(&report).map_err(js_err),
            None => Ok(JsValue::NULL),
        }
    }

    /// Stop the loop; later `tick` calls do nothing.
    pub fn stop(&self) {
        self.core.stop.raise();
    }

    #[wasm_bindgen(getter)]
    pub fn stopped(&self) -> bool {
        self.core.stop.is_raised()
    }

    /// Apply a window resize. Returns `[width, height, pixelRatio]` as actually used.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> js_sys::Float32Array {
        let s = self.core.driver.renderer_mut().resize(width, height, pixel_ratio);
        js_sys::Float32Array::from(&[s.width as f32, s.height as f32, s.pixel_ratio][..])
    }

    /// Uniform values of the last frame, in `uniformNames()` order.
    pub fn uniforms(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(&self.core.backend().uniforms[..])
    }

    #[wasm_bindgen(js_name = uniformNames)]
    pub fn uniform_names() -> js_sys::Array {
        UNIFORM_NAMES.iter().map(|n| JsValue::from_str(n)).collect()
    }

    /// Column-major view-projection matrix of the last frame.
    #[wasm_bindgen(js_name = viewProjection)]
    pub fn view_projection(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(&self.core.backend().view_projection[..])
    }

    #[wasm_bindgen(js_name = clearColor)]
    pub fn clear_color(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(&self.core.backend().clear_color[..])
    }

    #[wasm_bindgen(js_name = contourVersion)]
    pub fn contour_version(&self) -> f64 {
        self.core.backend().contour_version as f64
    }

    /// RGBA bytes of the contour strip if it changed since the last call.
    #[wasm_bindgen(js_name = takeContourUpload)]
    pub fn take_contour_upload(&mut self) -> Option<js_sys::Uint8Array> {
        self.core.take_contour_upload().map(|bytes| js_sys::Uint8Array::from(&bytes[..]))
    }

    /// The strip widened to `scale_x` pixels for the on-screen debug preview.
    #[wasm_bindgen(js_name = contourPreview)]
    pub fn contour_preview(&self, scale_x: usize) -> js_sys::Uint8Array {
        let rgba = self.core.driver.scene().contour().texture().preview_rgba(scale_x);
        js_sys::Uint8Array::from(&rgba[..])
    }

    #[wasm_bindgen(js_name = previewVisible)]
    pub fn preview_visible(&self) -> bool {
        self.core.driver.scene().preview_visible()
    }

    pub fn presets(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.core.driver.scene().presets()).map_err(js_err)
    }

    /// Select the active view preset; out-of-range indices pick the last one.
    #[wasm_bindgen(js_name = selectPreset)]
    pub fn select_preset(&mut self, index: usize) -> usize {
        let presets = self.core.driver.scene_mut().presets_mut();
        presets.select(index);
        presets.index()
    }
}
