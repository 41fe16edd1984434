use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReelError {
    #[error("capture error: {0}")]
    Capture(String),

    #[error("frame layout error: {0}")]
    Codec(String),

    #[error("invalid recording settings: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoder process error: {0}")]
    Encoder(String),

    #[error("encoder binary not found at {0}")]
    EncoderMissing(PathBuf),

    #[error("download error: {0}")]
    Fetch(String),
}
