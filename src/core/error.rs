// Error handling for the meter pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeterError>;

#[derive(Error, Debug)]
pub enum MeterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Recognizer failed: {0}")]
    Recognizer(String),

    #[error("Frame source failed: {0}")]
    FrameSource(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid region {width}x{height} at ({x}, {y})")]
    InvalidRegion { x: u32, y: u32, width: u32, height: u32 },
}
