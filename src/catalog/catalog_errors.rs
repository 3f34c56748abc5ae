use diesel::result::Error as DieselError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Custom error type for catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<DieselError> for CatalogError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => CatalogError::NotFound("Record not found".to_string()),
            _ => CatalogError::DatabaseError(err.to_string()),
        }
    }
}
