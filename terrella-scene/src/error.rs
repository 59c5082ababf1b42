#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frustum cascade is empty")]
    NoFrustums,
    #[error("frustum {index} has invalid near/far [{near}, {far}]")]
    InvalidFrustum { index: usize, near: f64, far: f64 },
    #[error("view angle {0} is outside (0, 180)")]
    InvalidViewAngle(f64),
    #[error("viewport {width}x{height} has a zero dimension")]
    InvalidViewport { width: u32, height: u32 },
    #[error("{0}")]
    Invalid(String),
}
