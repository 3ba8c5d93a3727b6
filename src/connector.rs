//! The connector façade.
//!
//! A [`Connector`] holds a connection-string name and a command text and
//! delegates execution to a [`Backend`]. Every operation opens its own
//! connection; only the streaming reader keeps it past the call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{self, ConnectionStrings};
use crate::error::DalError;
use crate::params::{self, DbParameter};
use crate::procedure::ProcedureCall;
use crate::reader::DataReader;
use crate::results::{DataSet, ProcedureOutcome};
use crate::tracker::{ConnectionLease, ConnectionTracker};
use crate::types::{DbType, DbValue, ParameterDirection, Provider};

#[cfg(feature = "mssql")]
use crate::mssql::SqlServerBackend;
#[cfg(feature = "odbc")]
use crate::odbc::OdbcBackend;
#[cfg(feature = "oracle")]
use crate::oracle::OracleBackend;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteBackend;

/// Everything a backend needs to run one command.
///
/// Built by [`Connector`] after the name, command text and parameters have
/// been validated.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    provider: Provider,
    connection_string: String,
    command_text: String,
    parameters: Vec<DbParameter>,
    tracker: ConnectionTracker,
}

impl CommandRequest {
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    #[must_use]
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    #[must_use]
    pub fn parameters(&self) -> &[DbParameter] {
        &self.parameters
    }

    /// Count a connection against the owning connector until the lease drops.
    pub(crate) fn lease(&self) -> ConnectionLease {
        self.tracker.lease(self.provider)
    }
}

/// One database driver behind the connector.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The provider this backend serves; `None` if it follows configuration.
    fn provider(&self) -> Option<Provider>;

    /// Execute a query and hand its open connection to a reader.
    async fn open_reader(&self, request: CommandRequest) -> Result<DataReader, DalError>;

    /// Execute a query and buffer every result.
    async fn fill_data_set(&self, request: CommandRequest) -> Result<DataSet, DalError>;

    /// Execute a statement and return the affected row count.
    async fn execute_non_query(&self, request: CommandRequest) -> Result<usize, DalError>;

    /// Run a stored procedure.
    async fn execute_procedure(
        &self,
        request: CommandRequest,
        call: ProcedureCall,
    ) -> Result<ProcedureOutcome, DalError>;
}

/// Connection-string name plus command text bound to a backend.
#[derive(Debug, Clone, Default)]
pub struct Connector<B> {
    backend: B,
    connect_string_name: Option<String>,
    command_text: Option<String>,
    registry: Option<Arc<ConnectionStrings>>,
    tracker: ConnectionTracker,
}

impl<B: Backend + Default> Connector<B> {
    /// A connector with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector bound to a connection-string name.
    #[must_use]
    pub fn with_connect_string_name(name: impl Into<String>) -> Self {
        let mut connector = Self::new();
        connector.set_connect_string_name(name);
        connector
    }

    /// A connector with both properties set.
    #[must_use]
    pub fn with_command(name: impl Into<String>, command_text: impl Into<String>) -> Self {
        let mut connector = Self::with_connect_string_name(name);
        connector.set_command_text(command_text);
        connector
    }
}

impl<B: Backend> Connector<B> {
    /// Wrap an explicit backend value.
    #[must_use]
    pub fn from_backend(backend: B) -> Self {
        Self {
            backend,
            connect_string_name: None,
            command_text: None,
            registry: None,
            tracker: ConnectionTracker::default(),
        }
    }

    /// Resolve names against `registry` instead of the process-wide one.
    #[must_use]
    pub fn with_connection_strings(mut self, registry: Arc<ConnectionStrings>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn set_connect_string_name(&mut self, name: impl Into<String>) {
        self.connect_string_name = Some(name.into());
    }

    #[must_use]
    pub fn connect_string_name(&self) -> Option<&str> {
        self.connect_string_name.as_deref()
    }

    pub fn set_command_text(&mut self, command_text: impl Into<String>) {
        self.command_text = Some(command_text.into());
    }

    #[must_use]
    pub fn command_text(&self) -> Option<&str> {
        self.command_text.as_deref()
    }

    /// Connections opened by this connector that are still open.
    ///
    /// Only a live [`DataReader`] keeps one open after an operation returns.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.tracker.open_connections()
    }

    /// Execute the command and return a forward-only reader.
    ///
    /// The reader owns the connection; close or drop it to release it.
    ///
    /// # Errors
    /// Configuration and parameter errors before any I/O, then driver errors
    /// from connecting, preparing or fetching the first row.
    pub async fn execute_query_data_reader(
        &self,
        parameters: &[DbParameter],
    ) -> Result<DataReader, DalError> {
        let request = self.prepare("reader", parameters)?;
        self.backend.open_reader(request).await
    }

    /// Execute the command and buffer every result set.
    ///
    /// # Errors
    /// Configuration and parameter errors before any I/O, then driver errors.
    pub async fn execute_query_data_set(
        &self,
        parameters: &[DbParameter],
    ) -> Result<DataSet, DalError> {
        let request = self.prepare("data set", parameters)?;
        self.backend.fill_data_set(request).await
    }

    /// Execute the command and return the number of affected rows.
    ///
    /// A `{CALL …}` command runs as a stored procedure.
    ///
    /// # Errors
    /// Configuration and parameter errors before any I/O, then driver errors.
    pub async fn execute_non_query(&self, parameters: &[DbParameter]) -> Result<usize, DalError> {
        let request = self.prepare("non-query", parameters)?;
        match ProcedureCall::parse_escape(request.command_text()) {
            Some(call) => {
                call.plan(request.parameters())?;
                let outcome = self.backend.execute_procedure(request, call).await?;
                Ok(outcome.rows_affected)
            }
            None => self.backend.execute_non_query(request).await,
        }
    }

    /// Run the command text as a stored procedure.
    ///
    /// The text is a `{CALL name(?)}` / `{? = CALL name(?)}` escape or a bare
    /// procedure name. Output and return values are read back where the
    /// backend supports them.
    ///
    /// # Errors
    /// Configuration and parameter errors before any I/O, `Unimplemented` for
    /// backends without procedures, then driver errors.
    pub async fn execute_stored_proc(
        &self,
        parameters: &[DbParameter],
    ) -> Result<ProcedureOutcome, DalError> {
        let request = self.prepare("stored procedure", parameters)?;
        let call = ProcedureCall::parse(request.command_text())?;
        call.plan(request.parameters())?;
        self.backend.execute_procedure(request, call).await
    }

    /// Build an input parameter with the backend's native type for `db_type`.
    ///
    /// # Errors
    /// [`DalError::ParameterError`] if the type has no native counterpart;
    /// [`DalError::ConfigError`] if the provider must come from configuration
    /// and cannot be resolved.
    pub fn create_parameter(
        &self,
        name: impl Into<String>,
        db_type: DbType,
        size: usize,
        value: impl Into<DbValue>,
    ) -> Result<DbParameter, DalError> {
        self.create_parameter_with_direction(
            name,
            db_type,
            size,
            value,
            ParameterDirection::Input,
        )
    }

    /// [`create_parameter`](Self::create_parameter) with an explicit direction.
    ///
    /// # Errors
    /// As for `create_parameter`.
    pub fn create_parameter_with_direction(
        &self,
        name: impl Into<String>,
        db_type: DbType,
        size: usize,
        value: impl Into<DbValue>,
        direction: ParameterDirection,
    ) -> Result<DbParameter, DalError> {
        let provider = match self.backend.provider() {
            Some(provider) => provider,
            None => {
                let registry = self.registry();
                registry.resolve(self.name()?)?.provider
            }
        };
        DbParameter::new(provider, name, db_type, size, value, direction)
    }

    fn registry(&self) -> Arc<ConnectionStrings> {
        self.registry.clone().unwrap_or_else(config::global)
    }

    fn name(&self) -> Result<&str, DalError> {
        self.connect_string_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DalError::ConfigError("ConnectStringName : Must be defined".into()))
    }

    /// Validate everything that can be checked without a connection.
    fn prepare(
        &self,
        operation: &'static str,
        parameters: &[DbParameter],
    ) -> Result<CommandRequest, DalError> {
        let name = self.name()?;
        let command_text = self
            .command_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| DalError::ConfigError("Command Text (SQL) : Must be defined".into()))?;

        let registry = self.registry();
        let settings = registry.resolve(name)?;
        if let Some(expected) = self.backend.provider() {
            if expected != settings.provider {
                return Err(DalError::ConfigError(format!(
                    "connection string '{name}' is for {}, not {expected}",
                    settings.provider
                )));
            }
        }
        params::check_provider(parameters, settings.provider)?;

        debug!(
            provider = %settings.provider,
            operation,
            connection = %settings.redacted(),
            command = command_text,
            parameters = parameters.len(),
            "executing command"
        );
        Ok(CommandRequest {
            provider: settings.provider,
            connection_string: settings.connection_string.clone(),
            command_text: command_text.to_string(),
            parameters: parameters.to_vec(),
            tracker: self.tracker.clone(),
        })
    }
}

/// Backend chosen per call from the provider recorded in configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredBackend;

fn not_enabled(provider: Provider) -> DalError {
    DalError::Unimplemented(format!(
        "{provider} support is not enabled in the current build"
    ))
}

#[async_trait]
impl Backend for ConfiguredBackend {
    fn provider(&self) -> Option<Provider> {
        None
    }

    async fn open_reader(&self, request: CommandRequest) -> Result<DataReader, DalError> {
        match request.provider() {
            #[cfg(feature = "sqlite")]
            Provider::Sqlite => SqliteBackend.open_reader(request).await,
            #[cfg(feature = "mssql")]
            Provider::SqlServer => SqlServerBackend.open_reader(request).await,
            #[cfg(feature = "odbc")]
            Provider::Odbc => OdbcBackend.open_reader(request).await,
            #[cfg(feature = "oracle")]
            Provider::Oracle => OracleBackend.open_reader(request).await,
            #[allow(unreachable_patterns)]
            other => Err(not_enabled(other)),
        }
    }

    async fn fill_data_set(&self, request: CommandRequest) -> Result<DataSet, DalError> {
        match request.provider() {
            #[cfg(feature = "sqlite")]
            Provider::Sqlite => SqliteBackend.fill_data_set(request).await,
            #[cfg(feature = "mssql")]
            Provider::SqlServer => SqlServerBackend.fill_data_set(request).await,
            #[cfg(feature = "odbc")]
            Provider::Odbc => OdbcBackend.fill_data_set(request).await,
            #[cfg(feature = "oracle")]
            Provider::Oracle => OracleBackend.fill_data_set(request).await,
            #[allow(unreachable_patterns)]
            other => Err(not_enabled(other)),
        }
    }

    async fn execute_non_query(&self, request: CommandRequest) -> Result<usize, DalError> {
        match request.provider() {
            #[cfg(feature = "sqlite")]
            Provider::Sqlite => SqliteBackend.execute_non_query(request).await,
            #[cfg(feature = "mssql")]
            Provider::SqlServer => SqlServerBackend.execute_non_query(request).await,
            #[cfg(feature = "odbc")]
            Provider::Odbc => OdbcBackend.execute_non_query(request).await,
            #[cfg(feature = "oracle")]
            Provider::Oracle => OracleBackend.execute_non_query(request).await,
            #[allow(unreachable_patterns)]
            other => Err(not_enabled(other)),
        }
    }

    async fn execute_procedure(
        &self,
        request: CommandRequest,
        call: ProcedureCall,
    ) -> Result<ProcedureOutcome, DalError> {
        match request.provider() {
            #[cfg(feature = "sqlite")]
            Provider::Sqlite => SqliteBackend.execute_procedure(request, call).await,
            #[cfg(feature = "mssql")]
            Provider::SqlServer => SqlServerBackend.execute_procedure(request, call).await,
            #[cfg(feature = "odbc")]
            Provider::Odbc => OdbcBackend.execute_procedure(request, call).await,
            #[cfg(feature = "oracle")]
            Provider::Oracle => OracleBackend.execute_procedure(request, call).await,
            #[allow(unreachable_patterns)]
            other => Err(not_enabled(other)),
        }
    }
}

/// Connector whose backend follows the provider in configuration.
pub type PersistenceManager = Connector<ConfiguredBackend>;

#[cfg(feature = "sqlite")]
pub type SqliteConnector = Connector<SqliteBackend>;

#[cfg(feature = "mssql")]
pub type SqlServerConnector = Connector<SqlServerBackend>;

#[cfg(feature = "odbc")]
pub type OdbcConnector = Connector<OdbcBackend>;

#[cfg(feature = "oracle")]
pub type OracleConnector = Connector<OracleBackend>;
