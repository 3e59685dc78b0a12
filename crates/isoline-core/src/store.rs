//! Live parameter store.
//!
//! One shared state, three kinds of handle:
//!
//! * `ParameterStore`: read access, cloneable, handed to every stage.
//! * `PanelWriter`: the only way to change tunables. Clamps to the declared
//!   range before storing, so the store never holds an out-of-range value.
//! * `TimeWriter`: the only way to change `time`. Never moves it backwards.
//!
//! Exactly one writer of each kind exists per store and neither is `Clone`.
//! Writes are visible to the very next read; there is no buffering. The store
//! is single-threaded: all stages run inside one frame tick.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use serde::Serialize;

use crate::color::Rgb;
use crate::config::SceneConfig;
use crate::contour::ContourTextureConfig;
use crate::error::{ParamError, Result};
use crate::params::{ParamId, ParamKind, ParamValue, Reaction, TerrainParameters};

#[derive(Debug)]
struct StoreState {
    terrain: TerrainParameters,
    contour: ContourTextureConfig,
    clear_color: Rgb,
    /// Bumped whenever a field that shapes the contour raster changes.
    contour_revision: u64,
}

/// Everything a frame reads from the store, copied out at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub terrain: TerrainParameters,
    pub contour: ContourTextureConfig,
    pub clear_color: Rgb,
    pub contour_revision: u64,
}

/// Result of one panel write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteOutcome {
    pub id: ParamId,
    /// Value actually stored.
    pub value: ParamValue,
    /// The requested value was outside the declared range.
    pub clamped: bool,
    /// The stored value differs from the previous one.
    pub changed: bool,
    pub reaction: Reaction,
}

/// Loosely-typed value coming from a host UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamInput<'a> {
    Number(f64),
    Bool(bool),
    Text(&'a str),
}

impl ParamInput<'_> {
    fn kind(&self) -> ParamKind {
        match self {
            ParamInput::Number(_) => ParamKind::Real,
            ParamInput::Bool(_) => ParamKind::Bool,
            ParamInput::Text(_) => ParamKind::Color,
        }
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ParameterStore {
    state: Rc<RefCell<StoreState>>,
}

impl ParameterStore {
    /// Create a store and its two writers.
    ///
    /// Every tunable is clamped into its declared range (non-finite values take
    /// their default) and `time` starts at 0.
    pub fn new(
        terrain: TerrainParameters,
        contour: ContourTextureConfig,
        clear_color: Rgb,
    ) -> (ParameterStore, PanelWriter, TimeWriter) {
        let mut terrain = terrain.clamped();
        terrain.time = 0.0;
        let channel = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        let state = Rc::new(RefCell::new(StoreState {
            terrain,
            contour: contour.clamped(),
            clear_color: Rgb::new(channel(clear_color.r), channel(clear_color.g), channel(clear_color.b)),
            contour_revision: 0,
        }));
        (
            ParameterStore { state: Rc::clone(&state) },
            PanelWriter { state: Rc::clone(&state) },
            TimeWriter { state },
        )
    }

    pub fn from_config(config: &SceneConfig) -> Result<(ParameterStore, PanelWriter, TimeWriter)> {
        let config = config.clone().sanitized()?;
        let clear = config.clear_color_rgb()?;
        Ok(Self::new(config.terrain, config.contour, clear))
    }

    pub fn terrain(&self) -> TerrainParameters {
        self.state.borrow().terrain
    }

    pub fn contour(&self) -> ContourTextureConfig {
        self.state.borrow().contour
    }

    pub fn clear_color(&self) -> Rgb {
        self.state.borrow().clear_color
    }

    pub fn time(&self) -> f32 {
        self.state.borrow().terrain.time
    }

    pub fn contour_revision(&self) -> u64 {
        self.state.borrow().contour_revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let s = self.state.borrow();
        StoreSnapshot {
            terrain: s.terrain,
            contour: s.contour,
            clear_color: s.clear_color,
            contour_revision: s.contour_revision,
        }
    }

    pub fn get(&self, id: ParamId) -> ParamValue {
        let s = self.state.borrow();
        read_field(&s, id)
    }

    pub fn get_by_name(&self, name: &str) -> Result<ParamValue, ParamError> {
        let id = ParamId::from_name(name).ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        Ok(self.get(id))
    }
}

fn read_field(s: &StoreState, id: ParamId) -> ParamValue {
    match id {
        ParamId::ContourVisible => ParamValue::Bool(s.contour.visible),
        ParamId::ContourLinesCount => ParamValue::Number(s.contour.lines_count as f32),
        ParamId::ContourBigLineWidth => ParamValue::Number(s.contour.big_line_width),
        ParamId::ContourSmallLineWidth => ParamValue::Number(s.contour.small_line_width),
        ParamId::ContourSmallLineAlpha => ParamValue::Number(s.contour.small_line_alpha),
        ParamId::ClearColor => ParamValue::Color(s.clear_color),
        material => ParamValue::Number(s.terrain.field(material).unwrap_or_default()),
    }
}

// ── Panel writer ──────────────────────────────────────────────────────────────

/// Sole writer of the tunable parameters.
#[derive(Debug)]
pub struct PanelWriter {
    state: Rc<RefCell<StoreState>>,
}

impl PanelWriter {
    /// Write a numeric parameter, clamping to its declared range.
    pub fn set(&mut self, id: ParamId, value: f64) -> Result<WriteOutcome, ParamError> {
        let spec = id.spec();
        if !matches!(spec.kind, ParamKind::Real | ParamKind::Integer) {
            return Err(ParamError::WrongKind { name: spec.name, expected: spec.kind, given: ParamKind::Real });
        }
        if !value.is_finite() {
            return Err(ParamError::NotFinite { name: spec.name, value });
        }
        let requested = value as f32;
        let stored = spec.clamp(requested);
        let clamped = !spec.contains(requested);
        if clamped {
            warn!("{} = {value} outside [{}, {}]; clamped to {stored}", spec.name, spec.min, spec.max);
        }

        let mut s = self.state.borrow_mut();
        let before = read_field(&s, id);
        match id {
            ParamId::ContourLinesCount => s.contour.lines_count = stored as u32,
            ParamId::ContourBigLineWidth => s.contour.big_line_width = stored,
            ParamId::ContourSmallLineWidth => s.contour.small_line_width = stored,
            ParamId::ContourSmallLineAlpha => s.contour.small_line_alpha = stored,
            material => {
                if let Some(field) = s.terrain.field_mut(material) {
                    *field = stored;
                }
            }
        }
        Ok(finish(&mut s, id, before, clamped))
    }

    pub fn set_bool(&mut self, id: ParamId, value: bool) -> Result<WriteOutcome, ParamError> {
        let spec = id.spec();
        if spec.kind != ParamKind::Bool {
            return Err(ParamError::WrongKind { name: spec.name, expected: spec.kind, given: ParamKind::Bool });
        }
        let mut s = self.state.borrow_mut();
        let before = read_field(&s, id);
        s.contour.visible = value;
        Ok(finish(&mut s, id, before, false))
    }

    /// Write a color parameter from a `#rrggbb` string.
    pub fn set_color(&mut self, id: ParamId, hex: &str) -> Result<WriteOutcome, ParamError> {
        let spec = id.spec();
        if spec.kind != ParamKind::Color {
            return Err(ParamError::WrongKind { name: spec.name, expected: spec.kind, given: ParamKind::Color });
        }
        let color = Rgb::from_hex(hex)?;
        let mut s = self.state.borrow_mut();
        let before = read_field(&s, id);
        s.clear_color = color;
        Ok(finish(&mut s, id, before, false))
    }

    /// Dispatch a host-supplied value by parameter name or panel label.
    pub fn set_by_name(&mut self, name: &str, value: ParamInput<'_>) -> Result<WriteOutcome, ParamError> {
        let id = ParamId::from_name(name).ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        match value {
            ParamInput::Number(v) => self.set(id, v),
            ParamInput::Bool(b) => self.set_bool(id, b),
            ParamInput::Text(t) if id.spec().kind == ParamKind::Color => self.set_color(id, t),
            other => Err(ParamError::WrongKind {
                name: id.spec().name,
                expected: id.spec().kind,
                given: other.kind(),
            }),
        }
    }
}

fn finish(s: &mut StoreState, id: ParamId, before: ParamValue, clamped: bool) -> WriteOutcome {
    let value = read_field(s, id);
    let changed = value != before;
    let reaction = id.reaction();
    if changed && reaction == Reaction::RegenerateTexture {
        s.contour_revision += 1;
    }
    WriteOutcome { id, value, clamped, changed, reaction }
}

// ── Time writer ───────────────────────────────────────────────────────────────

/// Sole writer of `time`.
#[derive(Debug)]
pub struct TimeWriter {
    state: Rc<RefCell<StoreState>>,
}

impl TimeWriter {
    /// Store `elapsed` seconds unless it would move time backwards.
    ///
    /// Returns the value now held by the store.
    pub fn set(&mut self, elapsed: f64) -> f32 {
        let mut s = self.state.borrow_mut();
        let current = s.terrain.time;
        let next = elapsed as f32;
        if !next.is_finite() || next < current {
            warn!("clock reported {elapsed}s, behind stored time {current}s; keeping {current}s");
            return current;
        }
        s.terrain.time = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ParameterStore, PanelWriter, TimeWriter) {
        ParameterStore::from_config(&SceneConfig::default()).unwrap()
    }

    #[test]
    fn writes_are_visible_immediately() {
        let (reader, mut panel, _) = store();
        let other_reader = reader.clone();
        panel.set(ParamId::ElevationDetails, 0.5).unwrap();
        assert_eq!(reader.terrain().elevation_details, 0.5);
        assert_eq!(other_reader.get(ParamId::ElevationDetails), ParamValue::Number(0.5));
    }

    #[test]
    fn out_of_range_write_is_clamped_to_max() {
        let (reader, mut panel, _) = store();
        let out = panel.set(ParamId::Elevation, 7.0).unwrap();
        assert!(out.clamped);
        assert_eq!(out.value, ParamValue::Number(5.0));
        assert_eq!(reader.terrain().elevation, 5.0);
    }

    #[test]
    fn direct_construction_clamps_every_field() {
        let terrain = TerrainParameters { elevation: f32::NAN, hsl_hue_frequency: 80.0, time: 100.0, ..Default::default() };
        let contour = ContourTextureConfig {
            lines_count: 0,
            big_line_width: 0.9,
            small_line_alpha: 7.0,
            ..Default::default()
        };
        let (reader, _, mut time) = ParameterStore::new(terrain, contour, Rgb::new(2.0, f32::NAN, 0.5));

        for id in ParamId::all() {
            if let ParamValue::Number(v) = reader.get(id) {
                assert!(id.spec().contains(v), "{} = {v} outside its range", id.name());
            }
        }
        assert_eq!(reader.terrain().elevation, 2.0);
        assert_eq!(reader.contour().lines_count, 1);
        assert_eq!(reader.contour().big_line_width, 0.5);
        assert_eq!(reader.contour().small_line_alpha, 1.0);
        assert_eq!(reader.clear_color(), Rgb::new(1.0, 0.0, 0.5));

        // Session time starts at zero, so an early clock reading is accepted.
        assert_eq!(reader.time(), 0.0);
        assert_eq!(time.set(0.5), 0.5);
    }

    #[test]
    fn non_finite_write_is_rejected() {
        let (reader, mut panel, _) = store();
        let err = panel.set(ParamId::Elevation, f64::NAN).unwrap_err();
        assert!(matches!(err, ParamError::NotFinite { .. }));
        assert_eq!(reader.terrain().elevation, 2.0);
    }

    #[test]
    fn texture_fields_bump_revision_only_on_change() {
        let (reader, mut panel, _) = store();
        let r0 = reader.contour_revision();

        panel.set(ParamId::ContourLinesCount, 5.0).unwrap();
        assert_eq!(reader.contour_revision(), r0, "same value must not bump");

        let out = panel.set(ParamId::ContourLinesCount, 7.0).unwrap();
        assert_eq!(out.reaction, Reaction::RegenerateTexture);
        assert_eq!(reader.contour_revision(), r0 + 1);

        panel.set(ParamId::Elevation, 1.0).unwrap();
        assert_eq!(reader.contour_revision(), r0 + 1, "material fields never bump");
    }

    #[test]
    fn toggling_visibility_does_not_bump_revision() {
        let (reader, mut panel, _) = store();
        let r0 = reader.contour_revision();
        let out = panel.set_bool(ParamId::ContourVisible, true).unwrap();
        assert!(out.changed);
        assert_eq!(out.reaction, Reaction::TogglePreview);
        assert_eq!(reader.contour_revision(), r0);
        assert!(reader.contour().visible);
    }

    #[test]
    fn kinds_are_checked() {
        let (_, mut panel, _) = store();
        assert!(matches!(panel.set(ParamId::ContourVisible, 1.0), Err(ParamError::WrongKind { .. })));
        assert!(matches!(panel.set_bool(ParamId::Elevation, true), Err(ParamError::WrongKind { .. })));
        assert!(matches!(
            panel.set_by_name("uElevation", ParamInput::Text("#fff")),
            Err(ParamError::WrongKind { .. })
        ));
    }

    #[test]
    fn set_by_name_accepts_labels_and_colors() {
        let (reader, mut panel, _) = store();
        panel.set_by_name("uHslHue", ParamInput::Number(0.3)).unwrap();
        assert!((reader.terrain().hsl_hue - 0.3).abs() < 1e-6);

        let out = panel.set_by_name("clearColor", ParamInput::Text("#ff0000")).unwrap();
        assert_eq!(out.reaction, Reaction::UpdateClearColor);
        assert_eq!(reader.clear_color(), Rgb::new(1.0, 0.0, 0.0));

        assert!(matches!(
            panel.set_by_name("time", ParamInput::Number(3.0)),
            Err(ParamError::Unknown(_))
        ));
    }

    #[test]
    fn time_never_decreases() {
        let (reader, _, mut clock) = store();
        assert_eq!(clock.set(1.5), 1.5);
        assert_eq!(clock.set(1.0), 1.5);
        assert_eq!(clock.set(f64::NAN), 1.5);
        assert_eq!(clock.set(2.0), 2.0);
        assert_eq!(reader.time(), 2.0);
    }

    #[test]
    fn random_writes_stay_in_range() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let (reader, mut panel, _) = store();
        let mut rng = StdRng::seed_from_u64(7);
        let numeric: Vec<ParamId> = ParamId::all()
            .filter(|id| matches!(id.spec().kind, ParamKind::Real | ParamKind::Integer))
            .collect();
        for _ in 0..2000 {
            let id = numeric[rng.gen_range(0..numeric.len())];
            panel.set(id, rng.gen_range(-100.0..100.0)).unwrap();
            let spec = id.spec();
            match reader.get(id) {
                ParamValue::Number(v) => assert!(spec.contains(v), "{} = {v}", spec.name),
                other => panic!("{} read back as {other:?}", spec.name),
            }
        }
    }
}
