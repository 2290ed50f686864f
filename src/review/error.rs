use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Review item not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
