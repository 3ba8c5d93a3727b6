use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::connector::CommandRequest;
use crate::error::DalError;
use crate::tracker::ConnectionLease;

pub(super) type MssqlClient = Client<Compat<TcpStream>>;

/// An open SQL Server connection counted against its connector.
pub(super) struct MssqlSession {
    pub(super) client: MssqlClient,
    // after `client` so the socket closes before the count drops
    _lease: ConnectionLease,
}

/// Connect with an ADO.NET style connection string.
///
/// # Errors
/// Returns the `tiberius` error for a malformed string or a failed login, and
/// the I/O error if the server cannot be reached.
pub(super) async fn connect(request: &CommandRequest) -> Result<MssqlSession, DalError> {
    let config = Config::from_ado_string(request.connection_string())?;
    let addr = config.get_addr();
    debug!(%addr, "connecting to sql server");

    let tcp = TcpStream::connect(&addr).await?;
    tcp.set_nodelay(true)?;

    let client = Client::connect(config, tcp.compat_write()).await?;
    Ok(MssqlSession {
        client,
        _lease: request.lease(),
    })
}
