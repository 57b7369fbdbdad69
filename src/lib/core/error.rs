use thiserror::Error;

use crate::imaging::ImageError;

#[derive(Error, Debug)]
pub enum TodoError {
    #[error("{0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Image generation error: {0}")]
    ImageGeneration(#[from] ImageError),
    #[error("Todo {0} not found")]
    NotFound(uuid::Uuid),
}

impl TodoError {
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        TodoError::Storage(format!("{err:#}"))
    }
}
