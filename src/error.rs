//! Error types for swipe prediction

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlideError>;

#[derive(Error, Debug)]
pub enum GlideError {
    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Model schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GlideError {
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::SchemaMismatch(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
