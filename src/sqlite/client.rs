use rusqlite::Connection;
use tracing::debug;

use crate::config::{find_value, parse_pairs};
use crate::connector::CommandRequest;
use crate::error::DalError;
use crate::tracker::ConnectionLease;

/// An open connection counted against its connector.
pub(super) struct SqliteSession {
    pub(super) conn: Connection,
    // after `conn` so the connection closes before the count drops
    _lease: ConnectionLease,
}

/// The database path: the whole string, or its `Data Source` value.
fn database_path(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed.starts_with("file:") || !trimmed.contains('=') {
        return trimmed.to_string();
    }
    let pairs = parse_pairs(trimmed);
    find_value(&pairs, &["data source", "datasource", "filename"])
        .unwrap_or(trimmed)
        .to_string()
}

/// Open the database named by the request.
///
/// # Errors
/// Returns the `rusqlite` error if the file cannot be opened.
pub(super) fn open(request: &CommandRequest) -> Result<SqliteSession, DalError> {
    let path = database_path(request.connection_string());
    debug!(path = %path, "opening sqlite database");
    let conn = Connection::open(&path)?;
    Ok(SqliteSession {
        conn,
        _lease: request.lease(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_paths_and_data_source_strings() {
        assert_eq!(database_path(" /tmp/a.db "), "/tmp/a.db");
        assert_eq!(database_path("file:mem?mode=memory"), "file:mem?mode=memory");
        assert_eq!(database_path("Data Source=/var/x.db;Version=3"), "/var/x.db");
    }
}
