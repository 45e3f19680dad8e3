// error.rs — 查看器错误类型

use thiserror::Error;

/// Everything that can go wrong between configuration and a rendered panorama.
///
/// Missing XMP metadata is not represented here: it is reported as `Ok(None)`
/// by the metadata parser and silently falls back to the full-image layout.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),

    #[error("malformed panorama metadata: {0}")]
    MalformedMetadata(String),

    #[error("failed to load panorama: {0}")]
    AssetLoad(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl ViewerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::MalformedMetadata(msg.into())
    }
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
