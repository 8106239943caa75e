use thiserror::Error;
use tmining_training::TrainingError;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    /// No model the caller may read matches the reference.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

impl ServiceError {
    /// Errors caused by the request rather than by the system.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            Self::InvalidParameter { .. } => true,
            Self::Training(e) => e.is_invalid_input(),
            Self::Storage(e) => matches!(
                e,
                StorageError::InvalidParameter { .. }
                    | StorageError::DuplicateSubject(_)
                    | StorageError::DuplicateIdentifier(_)
                    | StorageError::DuplicateModel(_)
            ),
            Self::ModelNotFound(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ModelNotFound(_) | Self::Storage(StorageError::UnknownUser(_)) => true,
            Self::Training(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
