//! Named connection strings.
//!
//! Connectors hold only a connection-string *name*; it is resolved against a
//! [`ConnectionStrings`] registry when an operation runs. A registry can be
//! given to a connector directly or installed process-wide:
//!
//! ```toml
//! [connection_strings.reporting]
//! provider = "sqlserver"
//! connection_string = "Server=tcp:db01,1433;Database=rpt;User Id=app;Password=secret"
//!
//! [connection_strings.local]
//! provider = "sqlite"
//! connection_string = "/var/lib/app/cache.db"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::DalError;
use crate::types::Provider;

/// Environment variable naming a TOML registry file.
pub const CONFIG_PATH_ENV: &str = "SQL_DAL_CONFIG";

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStringSettings {
    /// Which backend the string is for.
    pub provider: Provider,
    /// Driver connection string (ADO.NET, ODBC, ODP or a `SQLite` path).
    pub connection_string: String,
}

impl ConnectionStringSettings {
    #[must_use]
    pub fn new(provider: Provider, connection_string: impl Into<String>) -> Self {
        Self {
            provider,
            connection_string: connection_string.into(),
        }
    }

    /// The connection string with secrets masked, for logging.
    #[must_use]
    pub fn redacted(&self) -> String {
        redact(&self.connection_string)
    }
}

/// Registry of connection strings keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStrings {
    #[serde(default)]
    connection_strings: BTreeMap<String, ConnectionStringSettings>,
}

impl ConnectionStrings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        provider: Provider,
        connection_string: impl Into<String>,
    ) -> Self {
        self.insert(name, provider, connection_string);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        provider: Provider,
        connection_string: impl Into<String>,
    ) {
        self.connection_strings.insert(
            name.into(),
            ConnectionStringSettings::new(provider, connection_string),
        );
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConnectionStringSettings> {
        self.connection_strings.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connection_strings.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connection_strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connection_strings.is_empty()
    }

    /// Look up `name`.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the name is empty or not registered.
    pub fn resolve(&self, name: &str) -> Result<&ConnectionStringSettings, DalError> {
        if name.trim().is_empty() {
            return Err(DalError::ConfigError(
                "ConnectStringName : Must be defined".to_string(),
            ));
        }
        self.get(name).ok_or_else(|| {
            DalError::ConfigError(format!("connection string '{name}' is not configured"))
        })
    }

    /// Parse a TOML registry.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the document is not a valid registry.
    pub fn from_toml_str(document: &str) -> Result<Self, DalError> {
        let parsed: Self = toml::from_str(document)
            .map_err(|e| DalError::ConfigError(format!("invalid connection string file: {e}")))?;
        if let Some(name) = parsed
            .connection_strings
            .iter()
            .find(|(_, s)| s.connection_string.trim().is_empty())
            .map(|(n, _)| n)
        {
            return Err(DalError::ConfigError(format!(
                "connection string '{name}' is empty"
            )));
        }
        Ok(parsed)
    }

    /// Read a TOML registry file.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DalError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|e| {
            DalError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&document)
    }

    /// Read the file named by [`CONFIG_PATH_ENV`].
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the variable is unset or the file is
    /// unusable.
    pub fn from_env() -> Result<Self, DalError> {
        let path = std::env::var_os(CONFIG_PATH_ENV).ok_or_else(|| {
            DalError::ConfigError(format!("{CONFIG_PATH_ENV} is not set"))
        })?;
        Self::from_file(path)
    }
}

static GLOBAL: LazyLock<RwLock<Arc<ConnectionStrings>>> =
    LazyLock::new(|| RwLock::new(Arc::new(ConnectionStrings::new())));

/// Replace the process-wide registry used by connectors without their own.
pub fn install_global(registry: ConnectionStrings) {
    let mut guard = match GLOBAL.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Arc::new(registry);
}

/// Snapshot of the process-wide registry.
#[must_use]
pub fn global() -> Arc<ConnectionStrings> {
    let guard = match GLOBAL.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    Arc::clone(&guard)
}

/// Split a `key=value;key=value` connection string.
///
/// Keys are lower-cased and trimmed. Values may be wrapped in single or
/// double quotes (doubling the quote escapes it) or in `{}` as ODBC does.
#[must_use]
pub fn parse_pairs(connection_string: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = connection_string.chars().peekable();

    loop {
        let mut key = String::new();
        for c in chars.by_ref() {
            if c == '=' {
                break;
            }
            key.push(c);
        }
        let key = key.trim().to_ascii_lowercase();

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(q @ ('"' | '\'' | '{')) => {
                let close = if q == '{' { '}' } else { q };
                chars.next();
                while let Some(c) = chars.next() {
                    if c == close {
                        if chars.peek() == Some(&close) {
                            chars.next();
                            value.push(c);
                            continue;
                        }
                        break;
                    }
                    value.push(c);
                }
                // skip to the separator
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
            }
            _ => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                }
                value = value.trim().to_string();
            }
        }

        if !key.is_empty() {
            pairs.push((key, value));
        }
        if chars.peek().is_none() {
            break;
        }
    }
    pairs
}

/// First value among `keys` (already lower-case) in a parsed connection string.
#[must_use]
pub fn find_value<'a>(pairs: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| keys.contains(&k.as_str()))
        .map(|(_, v)| v.as_str())
}

const SECRET_KEYS: [&str; 3] = ["password", "pwd", "proxy password"];

/// Mask password values in a `key=value` connection string.
#[must_use]
pub fn redact(connection_string: &str) -> String {
    if !connection_string.contains('=') {
        return connection_string.to_string();
    }
    parse_pairs(connection_string)
        .into_iter()
        .map(|(k, v)| {
            if SECRET_KEYS.contains(&k.as_str()) {
                format!("{k}=***")
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}
