use ::oracle::Connection;
use tracing::debug;

use crate::config::{find_value, parse_pairs};
use crate::connector::CommandRequest;
use crate::error::DalError;
use crate::tracker::ConnectionLease;

/// Credentials and connect descriptor from an ODP-style string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct OracleTarget {
    pub(super) user: String,
    pub(super) password: String,
    pub(super) data_source: String,
}

impl OracleTarget {
    /// Parse `User Id=…;Password=…;Data Source=…`.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] naming the first missing key.
    pub(super) fn parse(connection_string: &str) -> Result<Self, DalError> {
        let pairs = parse_pairs(connection_string);
        let required = |keys: &[&str], label: &str| {
            find_value(&pairs, keys)
                .map(str::to_string)
                .ok_or_else(|| {
                    DalError::ConfigError(format!("Oracle connection string has no {label}"))
                })
        };
        Ok(Self {
            user: required(&["user id", "uid", "user"], "User Id")?,
            password: required(&["password", "pwd"], "Password")?,
            data_source: required(&["data source", "server"], "Data Source")?,
        })
    }
}

/// An open Oracle connection counted against its connector.
pub(super) struct OracleSession {
    pub(super) conn: Connection,
    // after `conn` so the connection closes before the count drops
    _lease: ConnectionLease,
}

/// Connect in autocommit mode, as each operation is its own unit of work.
///
/// # Errors
/// Returns [`DalError::ConfigError`] for an incomplete string, otherwise the
/// driver's error.
pub(super) fn connect(request: &CommandRequest) -> Result<OracleSession, DalError> {
    let target = OracleTarget::parse(request.connection_string())?;
    debug!(user = %target.user, data_source = %target.data_source, "connecting to oracle");
    let mut conn = Connection::connect(&target.user, &target.password, &target.data_source)?;
    conn.set_autocommit(true);
    Ok(OracleSession {
        conn,
        _lease: request.lease(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_odp_style_strings() {
        let target =
            OracleTarget::parse("User Id=scott;Password=\"ti;ger\";Data Source=//db:1521/orcl")
                .unwrap();
        assert_eq!(target.user, "scott");
        assert_eq!(target.password, "ti;ger");
        assert_eq!(target.data_source, "//db:1521/orcl");

        let err = OracleTarget::parse("User Id=scott;Data Source=x").unwrap_err();
        assert!(matches!(err, DalError::ConfigError(ref m) if m.contains("Password")));
    }
}
