use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("row not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for persist_core::PersistError {
    fn from(e: StoreError) -> Self {
        persist_core::PersistError::Store(e.to_string())
    }
}
