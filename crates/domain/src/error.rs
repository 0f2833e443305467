use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("exercise `{id}` not found in category `{category}`")]
    UnknownExercise { category: String, id: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomainError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }
}
