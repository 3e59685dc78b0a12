//! The terrain scene: every stage wired to one parameter store.

use log::info;

use crate::color::Rgb;
use crate::config::SceneConfig;
use crate::contour::ContourSynthesizer;
use crate::displacement::Displacement;
use crate::error::Result;
use crate::mesh::TerrainMesh;
use crate::params::{Reaction, TerrainParameters};
use crate::shading::{self, Fragment};
use crate::store::{PanelWriter, ParameterStore, TimeWriter, WriteOutcome};
use crate::view::ViewPresets;

/// Stage state for one session. The mesh and presets are fixed at creation;
/// the contour raster follows the store.
#[derive(Debug)]
pub struct TerrainScene {
    store: ParameterStore,
    contour: ContourSynthesizer,
    displacement: Displacement,
    mesh: TerrainMesh,
    presets: ViewPresets,
    preview_visible: bool,
}

impl TerrainScene {
    /// Build a scene from `config`, returning it with the store's two writers.
    pub fn from_config(config: &SceneConfig) -> Result<(Self, PanelWriter, TimeWriter)> {
        Self::with_mesh(config, TerrainMesh::default())
    }

    /// Same as `from_config` with a caller-chosen grid (previews, tests).
    pub fn with_mesh(config: &SceneConfig, mesh: TerrainMesh) -> Result<(Self, PanelWriter, TimeWriter)> {
        let (store, panel, time) = ParameterStore::from_config(config)?;
        let contour = ContourSynthesizer::for_revision(store.contour(), store.contour_revision())?;
        info!(
            "scene ready: seed={} grid={}x{} view={}",
            config.seed,
            mesh.segments(),
            mesh.segments(),
            config.view_index
        );
        let scene = Self {
            preview_visible: store.contour().visible,
            store,
            contour,
            displacement: Displacement::new(config.seed),
            mesh,
            presets: ViewPresets::new(config.view_index),
        };
        Ok((scene, panel, time))
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn contour(&self) -> &ContourSynthesizer {
        &self.contour
    }

    pub fn displacement(&self) -> &Displacement {
        &self.displacement
    }

    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    pub fn presets(&self) -> &ViewPresets {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut ViewPresets {
        &mut self.presets
    }

    /// Whether the host should show the contour strip on screen.
    pub fn preview_visible(&self) -> bool {
        self.preview_visible
    }

    /// Bring derived state up to date with the store before a draw.
    ///
    /// Returns true when the contour raster was repainted.
    pub fn sync(&mut self) -> bool {
        self.preview_visible = self.store.contour().visible;
        self.contour.sync(self.store.contour_revision(), self.store.contour())
    }

    /// React to a panel write right away instead of waiting for the next draw.
    pub fn apply(&mut self, outcome: &WriteOutcome) {
        match outcome.reaction {
            Reaction::RegenerateTexture | Reaction::TogglePreview => {
                self.sync();
            }
            Reaction::UpdateClearColor | Reaction::None => {}
        }
    }

    pub fn params(&self) -> TerrainParameters {
        self.store.terrain()
    }

    pub fn clear_color(&self) -> Rgb {
        self.store.clear_color()
    }

    /// Displaced elevation at world `(x, z)` for the current parameters.
    pub fn elevation(&self, x: f32, z: f32) -> f32 {
        self.displacement.elevation(x, z, &self.store.terrain())
    }

    /// Shaded fragment at world `(x, z)`.
    pub fn fragment(&self, x: f32, z: f32, p: &TerrainParameters) -> Fragment {
        let e = self.displacement.elevation(x, z, p);
        shading::shade(e, p, self.contour.texture())
    }

    /// Final color at world `(x, z)` blended over the clear color.
    pub fn color_at(&self, x: f32, z: f32) -> Rgb {
        let p = self.store.terrain();
        self.fragment(x, z, &p).over(self.store.clear_color())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamId;
    use crate::store::ParamInput;

    fn scene() -> (TerrainScene, PanelWriter, TimeWriter) {
        TerrainScene::with_mesh(&SceneConfig::default(), TerrainMesh::plane(1.0, 8, 10.0)).unwrap()
    }

    #[test]
    fn default_scene_is_finite_and_not_flat() {
        let (s, _, _) = scene();
        let a = s.elevation(0.0, 0.0);
        let b = s.elevation(1.0, 1.0);
        assert!(a.is_finite() && b.is_finite());
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_scene_needs_no_repaint() {
        let (mut s, _, _) = scene();
        let v = s.contour().texture().version;
        assert!(!s.sync());
        assert_eq!(s.contour().texture().version, v);
    }

    #[test]
    fn contour_write_repaints_on_next_sync() {
        let (mut s, mut panel, _) = scene();
        let v = s.contour().texture().version;
        panel.set(ParamId::ContourLinesCount, 3.0).unwrap();
        assert!(s.sync());
        assert_eq!(s.contour().texture().version, v + 1);
        assert_eq!(s.contour().config().lines_count, 3);
        assert!(!s.sync());
    }

    #[test]
    fn visibility_toggle_does_not_repaint() {
        let (mut s, mut panel, _) = scene();
        let v = s.contour().texture().version;
        let out = panel.set_bool(ParamId::ContourVisible, true).unwrap();
        s.apply(&out);
        assert!(s.preview_visible());
        assert_eq!(s.contour().texture().version, v);
    }

    #[test]
    fn material_write_changes_geometry_immediately() {
        let (s, mut panel, _) = scene();
        let before = s.elevation(0.3, 0.7);
        panel.set_by_name("uElevation", ParamInput::Number(4.0)).unwrap();
        let after = s.elevation(0.3, 0.7);
        assert!((after - before * 2.0).abs() < 1e-5);
    }

    #[test]
    fn clear_color_shows_where_no_band_is_painted() {
        let (s, mut panel, _) = scene();
        panel.set_color(ParamId::ClearColor, "#102030").unwrap();
        let bg = Rgb::from_hex("#102030").unwrap();
        let p = s.params();
        // Find a point that falls between bands.
        let hit = (0..400)
            .map(|i| (i as f32 * 0.0137 - 2.0, i as f32 * 0.0071))
            .find(|&(x, z)| s.fragment(x, z, &p).alpha == 0.0);
        let (x, z) = hit.unwrap();
        assert_eq!(s.color_at(x, z), bg);
    }
}
