use image::ImageError;
use thiserror::Error;

/// Errors produced while turning raw upload bytes into a canonical image.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("image buffer is empty")]
    EmptyInput,

    #[error("failed to decode image: {0}")]
    Decode(#[from] ImageError),

    #[error("decoded image has zero size ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("failed to encode normalized image: {reason}")]
    Encode { reason: String },
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;
