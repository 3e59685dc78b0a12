//! Frame loop.
//!
//! Each tick reads the clock into `time`, advances the camera controller,
//! brings the contour raster up to date and draws once. `run` repeats ticks
//! until the host raises the stop signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use log::info;
use serde::Serialize;

use crate::camera::PerspectiveCamera;
use crate::render::{RenderBackend, Renderer};
use crate::scene::TerrainScene;
use crate::store::TimeWriter;
use crate::view::ParallaxHook;

// ── Clocks ────────────────────────────────────────────────────────────────────

/// Seconds since the animation started.
pub trait Clock {
    fn elapsed(&mut self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn elapsed(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock the host sets by hand (browser timestamps, headless runs, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self { now }
    }

    pub fn set(&mut self, seconds: f64) {
        self.now = seconds;
    }

    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }
}

impl Clock for ManualClock {
    fn elapsed(&mut self) -> f64 {
        self.now
    }
}

// ── Camera controls ───────────────────────────────────────────────────────────

/// Damped camera controller advanced once per tick.
pub trait CameraControls {
    fn update(&mut self, camera: &mut PerspectiveCamera);
}

/// Leaves the camera where it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticControls;

impl CameraControls for StaticControls {
    fn update(&mut self, _camera: &mut PerspectiveCamera) {}
}

// ── Stop signal ───────────────────────────────────────────────────────────────

/// Cancels `AnimationDriver::run` from the host side. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub frame: u64,
    pub time: f32,
    pub contour_version: u64,
    pub repainted: bool,
}

pub struct AnimationDriver<B: RenderBackend, C: Clock> {
    scene: TerrainScene,
    time: TimeWriter,
    renderer: Renderer<B>,
    clock: C,
    controls: Box<dyn CameraControls>,
    parallax: Option<Box<dyn ParallaxHook>>,
    pointer: Vec2,
    frames: u64,
}

impl<B: RenderBackend, C: Clock> AnimationDriver<B, C> {
    /// Takes the store's `TimeWriter`: the driver is the only writer of `time`.
    pub fn new(scene: TerrainScene, time: TimeWriter, renderer: Renderer<B>, clock: C) -> Self {
        Self {
            scene,
            time,
            renderer,
            clock,
            controls: Box::new(StaticControls),
            parallax: None,
            pointer: Vec2::ZERO,
            frames: 0,
        }
    }

    pub fn with_controls(mut self, controls: Box<dyn CameraControls>) -> Self {
        self.controls = controls;
        self
    }

    pub fn set_parallax_hook(&mut self, hook: Option<Box<dyn ParallaxHook>>) {
        self.parallax = hook;
    }

    /// Normalized pointer position handed to the parallax hook.
    pub fn set_pointer(&mut self, pointer: Vec2) {
        self.pointer = pointer;
    }

    pub fn scene(&self) -> &TerrainScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut TerrainScene {
        &mut self.scene
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    /// Tear the driver down, keeping the scene.
    pub fn into_scene(self) -> TerrainScene {
        self.scene
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One frame: clock → `time`, controls, contour sync, draw.
    pub fn tick(&mut self) -> TickReport {
        let time = self.time.set(self.clock.elapsed());
        self.controls.update(self.renderer.camera_mut());
        if let Some(hook) = self.parallax.as_mut() {
            hook.apply(self.scene.presets().active(), self.pointer);
        }

        let repainted = self.scene.sync();
        self.renderer.set_clear_color(self.scene.clear_color());
        let params = self.scene.params();
        self.renderer.render(&params, self.scene.contour().texture(), self.scene.mesh());

        self.frames += 1;
        TickReport {
            frame: self.frames,
            time,
            contour_version: self.scene.contour().texture().version,
            repainted,
        }
    }

    /// Tick until `stop` is raised, calling `wait_for_refresh` between frames.
    ///
    /// Returns the number of frames drawn by this call.
    pub fn run(&mut self, stop: &StopSignal, mut wait_for_refresh: impl FnMut(&mut Self)) -> u64 {
        info!("animation started at frame {}", self.frames);
        let first = self.frames;
        while !stop.is_raised() {
            self.tick();
            wait_for_refresh(self);
        }
        let drawn = self.frames - first;
        info!("animation stopped after {drawn} frames");
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Sizes;
    use crate::color::Rgb;
    use crate::config::SceneConfig;
    use crate::mesh::TerrainMesh;
    use crate::params::ParamId;
    use crate::render::RecordingBackend;
    use crate::store::PanelWriter;
    use crate::view::ViewPreset;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Driver = AnimationDriver<RecordingBackend, ManualClock>;

    fn driver() -> (Driver, PanelWriter) {
        let (scene, panel, time) =
            TerrainScene::with_mesh(&SceneConfig::default(), TerrainMesh::plane(1.0, 4, 10.0)).unwrap();
        let renderer = Renderer::new(RecordingBackend::default(), Sizes::new(800, 600, 1.0), Rgb::BLACK);
        (AnimationDriver::new(scene, time, renderer, ManualClock::default()), panel)
    }

    #[test]
    fn tick_writes_clock_into_time_and_draws_once() {
        let (mut d, _) = driver();
        d.clock_mut().set(1.25);
        let r = d.tick();
        assert_eq!(r.frame, 1);
        assert_eq!(r.time, 1.25);
        assert_eq!(d.scene().params().time, 1.25);
        let draws = &d.renderer().backend().draws;
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].time, 1.25);
    }

    #[test]
    fn time_never_decreases_over_jittery_clock() {
        let (mut d, _) = driver();
        let mut rng = StdRng::seed_from_u64(11);
        let mut last = 0.0f32;
        for _ in 0..200 {
            let jitter: f64 = rng.gen_range(-0.05..0.1);
            d.clock_mut().advance(jitter);
            let t = d.tick().time;
            assert!(t >= last, "{t} < {last}");
            last = t;
        }
    }

    #[test]
    fn contour_change_is_repainted_and_uploaded_before_the_draw() {
        let (mut d, mut panel) = driver();
        d.tick();
        panel.set(ParamId::ContourSmallLineAlpha, 0.9).unwrap();
        let r = d.tick();
        assert!(r.repainted);
        let backend = d.renderer().backend();
        assert_eq!(backend.draws.last().unwrap().contour_version, r.contour_version);
        assert_eq!(*backend.uploads.last().unwrap(), r.contour_version);
    }

    #[test]
    fn clear_color_write_reaches_the_renderer_next_tick() {
        let (mut d, mut panel) = driver();
        panel.set_color(ParamId::ClearColor, "#ff0000").unwrap();
        d.tick();
        assert_eq!(d.renderer().clear_color(), Rgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn run_stops_when_signal_is_raised() {
        let (mut d, _) = driver();
        let stop = StopSignal::new();
        let host = stop.clone();
        let drawn = d.run(&stop, |d| {
            d.clock_mut().advance(1.0 / 60.0);
            if d.frames() == 5 {
                host.raise();
            }
        });
        assert_eq!(drawn, 5);
        assert_eq!(d.renderer().backend().draws.len(), 5);
    }

    #[test]
    fn raised_signal_draws_nothing() {
        let (mut d, _) = driver();
        let stop = StopSignal::new();
        stop.raise();
        assert_eq!(d.run(&stop, |_| {}), 0);
    }

    struct CountingControls(Rc<RefCell<u32>>);

    impl CameraControls for CountingControls {
        fn update(&mut self, _camera: &mut PerspectiveCamera) {
            *self.0.borrow_mut() += 1;
        }
    }

    struct RecordingHook(Rc<RefCell<Vec<(f32, Vec2)>>>);

    impl ParallaxHook for RecordingHook {
        fn apply(&mut self, preset: &ViewPreset, pointer: Vec2) {
            self.0.borrow_mut().push((preset.parallax_multiplier, pointer));
        }
    }

    #[test]
    fn controls_and_parallax_hook_run_every_tick() {
        let (d, _) = driver();
        let updates = Rc::new(RefCell::new(0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut d = d.with_controls(Box::new(CountingControls(Rc::clone(&updates))));
        d.set_parallax_hook(Some(Box::new(RecordingHook(Rc::clone(&seen)))));
        d.set_pointer(Vec2::new(0.25, -0.5));
        d.tick();
        d.scene_mut().presets_mut().select(2);
        d.tick();
        assert_eq!(*updates.borrow(), 2);
        assert_eq!(*seen.borrow(), vec![(0.25, Vec2::new(0.25, -0.5)), (0.12, Vec2::new(0.25, -0.5))]);
    }

    #[test]
    fn resize_between_ticks_is_seen_whole_by_the_next_draw() {
        let (mut d, _) = driver();
        d.tick();
        let sizes = d.renderer_mut().resize(1024, 256, 1.0);
        d.tick();
        let last = *d.renderer().backend().draws.last().unwrap();
        assert_eq!((last.surface, last.buffer, last.frame_sizes), (Some(sizes), Some(sizes), sizes));
        assert!((last.aspect - 4.0).abs() < 1e-4);
    }
}
