use std::sync::OnceLock;

use odbc_api::{Connection, ConnectionOptions, Environment};
use tracing::debug;

use crate::config::redact;
use crate::connector::CommandRequest;
use crate::error::DalError;
use crate::tracker::ConnectionLease;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// The process-wide ODBC environment, created on first use.
fn environment() -> Result<&'static Environment, DalError> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// An open ODBC connection counted against its connector.
pub(super) struct OdbcSession {
    pub(super) conn: Connection<'static>,
    // after `conn` so the connection closes before the count drops
    _lease: ConnectionLease,
}

/// Connect with an ODBC connection string (`DSN=…` or `Driver={…};…`).
///
/// # Errors
/// Returns the driver manager's error.
pub(super) fn connect(request: &CommandRequest) -> Result<OdbcSession, DalError> {
    let env = environment()?;
    debug!(connection = %redact(request.connection_string()), "connecting through odbc");
    let conn =
        env.connect_with_connection_string(request.connection_string(), ConnectionOptions::default())?;
    Ok(OdbcSession {
        conn,
        _lease: request.lease(),
    })
}
