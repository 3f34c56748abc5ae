use diesel::result::Error as DieselError;
use thiserror::Error;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the costing core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Catalog operation failed: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("Inbound ledger operation failed: {0}")]
    Inbound(#[from] InboundError),

    #[error("Sales operation failed: {0}")]
    Sales(#[from] SalesError),

    #[error("Allocation operation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Writer lock: {0}")]
    Writer(#[from] WriterError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Stable error kind string exposed on the command surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "StoreError",
            Error::Catalog(crate::catalog::CatalogError::InvalidData(_)) => "InvalidInput",
            Error::Catalog(_) => "CatalogError",
            Error::Inbound(InboundError::InvalidInbound(_)) => "InvalidInbound",
            Error::Inbound(_) => "InboundError",
            Error::Sales(SalesError::InvalidCsv(_)) => "InvalidCsv",
            Error::Sales(SalesError::InvalidMonth(_)) => "InvalidMonth",
            Error::Sales(_) => "SalesError",
            Error::Allocation(_) => "AllocationError",
            Error::Writer(WriterError::Busy(_)) => "BusyWriter",
            Error::Writer(WriterError::Cancelled(_)) => "AbortedByCancel",
            Error::Writer(WriterError::TimedOut(_)) => "AbortedByTimeout",
            Error::Validation(_) => "InvalidInput",
            Error::Config(_) => "ConfigError",
        }
    }

    /// Whether the caller can retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Writer(WriterError::Busy(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] diesel::result::ConnectionError),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(#[from] r2d2::Error),

    #[error("Database query failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Error, Debug)]
pub enum InboundError {
    #[error("Invalid inbound data: {0}")]
    InvalidInbound(String),

    #[error("Batch '{0}' not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DieselError> for InboundError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => InboundError::NotFound("record not found".to_string()),
            _ => InboundError::DatabaseError(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("Invalid CSV: {0}")]
    InvalidCsv(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DieselError> for SalesError {
    fn from(err: DieselError) -> Self {
        SalesError::DatabaseError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Invalid demand: {0}")]
    InvalidDemand(String),

    #[error("Balance underflow for lot ({0}, {1})")]
    BalanceUnderflow(String, String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DieselError> for AllocationError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AllocationError::NotFound("record not found".to_string()),
            _ => AllocationError::DatabaseError(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("another mutating operation is in progress: {0}")]
    Busy(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("operation exceeded its deadline: {0}")]
    TimedOut(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Missing configuration key: {0}")]
    MissingKey(String),
}

// Implement From for DieselError to Error directly
impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        Error::Database(DatabaseError::QueryFailed(err))
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}
