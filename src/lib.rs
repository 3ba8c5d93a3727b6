//! Data-access layer over SQL Server, ODBC, Oracle and `SQLite`.
//!
//! A [`Connector`] binds a named connection string and a command text. Each
//! operation opens a connection, runs the command and closes the connection
//! again, except [`Connector::execute_query_data_reader`], whose
//! [`DataReader`] keeps its connection until it is closed or dropped.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sql_dal::prelude::*;
//!
//! # async fn run() -> Result<(), DalError> {
//! let registry = ConnectionStrings::new().with("app", Provider::Sqlite, "app.db");
//! let connector = PersistenceManager::with_command("app", "SELECT id, name FROM t WHERE id = ?")
//!     .with_connection_strings(Arc::new(registry));
//! let id = connector.create_parameter("id", DbType::Int32, 0, 7)?;
//! let mut reader = connector.execute_query_data_reader(&[id]).await?;
//! while let Some(row) = reader.next_row().await? {
//!     println!("{:?}", row.get("name"));
//! }
//! reader.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! Backends are behind features: `sqlite` (default), `mssql`, `odbc` and
//! `oracle`.

pub mod config;
mod connector;
pub mod error;
pub mod mapping;
mod params;
pub mod prelude;
pub mod procedure;
mod reader;
pub mod results;
mod tracker;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "odbc")]
pub mod odbc;
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{ConnectionStringSettings, ConnectionStrings};
pub use connector::{Backend, CommandRequest, ConfiguredBackend, Connector, PersistenceManager};
#[cfg(feature = "odbc")]
pub use connector::OdbcConnector;
#[cfg(feature = "oracle")]
pub use connector::OracleConnector;
#[cfg(feature = "mssql")]
pub use connector::SqlServerConnector;
#[cfg(feature = "sqlite")]
pub use connector::SqliteConnector;
pub use error::DalError;
pub use mapping::NativeType;
pub use params::DbParameter;
pub use procedure::ProcedureCall;
pub use reader::DataReader;
pub use results::{DataRow, DataSet, DataTable, ProcedureOutcome};
pub use types::{DbType, DbValue, ParameterDirection, Provider};
