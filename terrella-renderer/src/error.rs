pub use terrella_scene::ConfigError;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },
    #[error("attachment {index} out of range, target has {count}")]
    AttachmentOutOfRange { index: usize, count: usize },
    #[error("read of {width}x{height} at ({x}, {y}) falls outside the target")]
    ReadOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("expected {expected} bytes of pixel data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("framebuffer is incomplete")]
    IncompleteFramebuffer,
    #[error("render target is not initialized")]
    NotInitialized,
    #[error("{0}")]
    Backend(String),
}

/// Failure of a single imagery request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ImageryError {
    /// The provider has no data for this tile; the material will not retry.
    #[error("no imagery for this tile")]
    NotFound,
    #[error("{0}")]
    Transient(String),
    #[error("could not decode imagery: {0}")]
    Decode(String),
}
