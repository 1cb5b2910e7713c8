use thiserror::Error;

use models::errors::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected input keyed by the request field (`name`, `id`, `orderColumn`, ...).
    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ServiceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation { field, message } => Self::validation(field, message),
            ModelError::UnknownField(name) => Self::validation("field", format!("unknown column: {name}")),
            ModelError::Db(msg) => Self::Db(msg),
        }
    }
}
