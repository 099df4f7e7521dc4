use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Model is not initialized")]
    NotInitialized,

    #[error("Could not decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
