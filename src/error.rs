use thiserror::Error;

#[cfg(feature = "odbc")]
use odbc_api;
#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "mssql")]
use tiberius;

/// Every failure surfaced by a connector.
///
/// Driver errors are forwarded untouched (`#[error(transparent)]`); the string
/// variants are raised by this crate before or around driver calls.
#[derive(Debug, Error)]
pub enum DalError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[cfg(feature = "odbc")]
    #[error(transparent)]
    OdbcError(#[from] odbc_api::Error),

    #[cfg(feature = "oracle")]
    #[error(transparent)]
    OracleError(#[from] ::oracle::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl DalError {
    /// True for errors raised before any connection was attempted because the
    /// connector itself was not configured.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, DalError::ConfigError(_))
    }
}

impl From<tokio::task::JoinError> for DalError {
    fn from(err: tokio::task::JoinError) -> Self {
        DalError::ExecutionError(format!("blocking database task failed: {err}"))
    }
}
