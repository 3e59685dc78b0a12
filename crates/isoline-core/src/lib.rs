//! Procedural contour-line terrain.
//!
//! A fixed grid is displaced by layered noise and shaded with an HSL model
//! driven by elevation and time, then banded by a synthesized contour strip.
//! All tunables live in one `ParameterStore`; the `AnimationDriver` writes
//! `time` and issues one draw per tick through a host `RenderBackend`.

pub mod animation;
pub mod camera;
pub mod color;
pub mod config;
pub mod contour;
pub mod displacement;
pub mod error;
pub mod mesh;
pub mod params;
pub mod render;
pub mod scene;
pub mod shading;
pub mod store;
pub mod view;

pub use animation::{AnimationDriver, CameraControls, Clock, ManualClock, StaticControls, StopSignal, SystemClock, TickReport};
pub use camera::{PerspectiveCamera, Sizes};
pub use color::{Hsl, Rgb};
pub use config::SceneConfig;
pub use contour::{ContourSynthesizer, ContourTexture, ContourTextureConfig};
pub use displacement::Displacement;
pub use error::{ColorError, IsolineError, ParamError, Result, TextureError};
pub use mesh::{TerrainMesh, VertexSnapshot};
pub use params::{ParamId, ParamValue, Reaction, TerrainParameters};
pub use render::{Composer, OutputEncoding, RecordingBackend, RenderBackend, RenderPass, Renderer};
pub use scene::TerrainScene;
pub use store::{PanelWriter, ParamInput, ParameterStore, TimeWriter, WriteOutcome};
pub use view::{ParallaxHook, ViewPreset, ViewPresets};
