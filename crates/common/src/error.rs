use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelataError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("connector error: {0}")]
    Connector(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RelataResult<T> = Result<T, RelataError>;
