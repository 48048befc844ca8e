use crate::config::ConfigError;
use crate::frame::RecordError;
use crate::math::FusionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input document: {0}")]
    Json(#[from] serde_json::Error),
}
