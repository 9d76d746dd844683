//! Error types for keyroll

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyrollError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Note array error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KeyrollError>;
