use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Rejected input, keyed by the request field it came from.
    #[error("validation error: {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ModelError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }
}
