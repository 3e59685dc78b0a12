//! Error types for the terrain core.
//!
//! The render loop itself never surfaces these: a failed write or regeneration
//! is logged and the previous state stays in effect. They reach callers only at
//! the boundaries (panel writes, config loading, direct synthesizer calls).

use thiserror::Error;

use crate::params::ParamKind;

/// Rejected write through the tunable parameter surface.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),
    #[error("parameter `{name}` is a {expected:?} value, not {given:?}")]
    WrongKind {
        name: &'static str,
        expected: ParamKind,
        given: ParamKind,
    },
    #[error("parameter `{name}` must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },
    #[error(transparent)]
    Color(#[from] ColorError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("color `{0}` must start with `#`")]
    MissingHash(String),
    #[error("color `{0}` must have 3 or 6 hex digits")]
    BadLength(String),
    #[error("color `{0}` contains a non-hex digit")]
    BadDigit(String),
}

/// Contour raster could not be produced. The previously bound raster stays valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("contour raster must be at least 1x1, got {width}x{height}")]
    ZeroSized { width: usize, height: usize },
    #[error("could not allocate {bytes} bytes for the contour raster")]
    Allocation { bytes: usize },
}

/// Crate-level error for callers that mix config loading with parameter writes.
#[derive(Debug, Error)]
pub enum IsolineError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error("invalid scene config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("cannot read scene config: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = IsolineError> = std::result::Result<T, E>;
