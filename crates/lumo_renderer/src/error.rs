//! Renderer error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::TextureError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Foundation(#[from] lumo_foundation::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("failed to write image")]
    Image(#[from] image::ImageError),

    #[error("camera resolution {camera_width}x{camera_height} does not match frame {frame_width}x{frame_height}")]
    ResolutionMismatch {
        camera_width: u32,
        camera_height: u32,
        frame_width: u32,
        frame_height: u32,
    },
}

pub type Result<T> = std::result::Result<T, RenderError>;
