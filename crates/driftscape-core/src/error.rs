//! Error types for scene editing and image loading.

use std::path::PathBuf;

use crate::scene::LayerId;

/// Failure to turn an image path into a renderable resource.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("Image path is empty")]
    EmptyPath,

    #[error("Image file not found: {0}")]
    NotFound(PathBuf),

    #[error("Image has zero size: {0}")]
    ZeroSize(PathBuf),

    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Rejected scene mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("Scene already holds the maximum of {0} layers")]
    LayerLimit(usize),

    #[error("Scene already holds the maximum of {0} foreground layers")]
    ForegroundLimit(usize),

    #[error("Z-index {0} is outside 0..=10")]
    ZIndexOutOfRange(i32),

    #[error("Scene already has a background layer")]
    BackgroundExists,

    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),

    #[error("Reorder index {index} is out of range for {len} foreground layers")]
    ReorderOutOfRange { index: usize, len: usize },
}
