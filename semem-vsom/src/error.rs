//! `semem-vsom`'s error enum.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VsomError>;

#[derive(Debug, Error)]
pub enum VsomError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("training was cancelled")]
    Cancelled,
}

impl From<VsomError> for semem_core::CoreError {
    fn from(e: VsomError) -> Self {
        match e {
            VsomError::Validation(msg) => Self::Validation(msg),
            VsomError::Cancelled => Self::Cancelled("train-vsom".to_string()),
        }
    }
}
