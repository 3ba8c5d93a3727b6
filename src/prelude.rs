//! Common imports.
//!
//! ```rust
//! use sql_dal::prelude::*;
//! ```

pub use crate::config::{ConnectionStrings, install_global};
pub use crate::connector::{Backend, Connector, PersistenceManager};
#[cfg(feature = "odbc")]
pub use crate::connector::OdbcConnector;
#[cfg(feature = "oracle")]
pub use crate::connector::OracleConnector;
#[cfg(feature = "mssql")]
pub use crate::connector::SqlServerConnector;
#[cfg(feature = "sqlite")]
pub use crate::connector::SqliteConnector;
pub use crate::error::DalError;
pub use crate::params::DbParameter;
pub use crate::reader::DataReader;
pub use crate::results::{DataRow, DataSet, DataTable, ProcedureOutcome};
pub use crate::types::{DbType, DbValue, ParameterDirection, Provider};
