use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values read from a row or bound to a parameter.
///
/// The same enum is used by every backend so calling code never handles driver
/// types:
/// ```rust
/// use sql_dal::prelude::*;
///
/// let values = vec![
///     DbValue::Int(7),
///     DbValue::Text("alice".into()),
///     DbValue::Null,
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// SQL NULL
    Null,
    /// Boolean / bit value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date and time without zone
    Timestamp(NaiveDateTime),
    /// Binary data
    Blob(Vec<u8>),
    /// JSON value, bound as text
    Json(JsonValue),
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let DbValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DbValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DbValue::Bool(value) => Some(*value),
            DbValue::Int(1) => Some(true),
            DbValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let DbValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DbValue::Date(value) => Some(*value),
            DbValue::Timestamp(value) => Some(value.date()),
            DbValue::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            DbValue::Timestamp(value) => Some(*value),
            DbValue::Date(value) => value.and_hms_opt(0, 0, 0),
            DbValue::Text(s) => {
                // "YYYY-MM-DD HH:MM:SS", optional fraction, optional 'T' separator
                ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let DbValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DbValue::Null => "null",
            DbValue::Bool(_) => "bool",
            DbValue::Int(_) => "int",
            DbValue::Float(_) => "float",
            DbValue::Text(_) => "text",
            DbValue::Date(_) => "date",
            DbValue::Time(_) => "time",
            DbValue::Timestamp(_) => "timestamp",
            DbValue::Blob(_) => "blob",
            DbValue::Json(_) => "json",
        }
    }
}

macro_rules! db_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DbValue {
                fn from(value: $ty) -> Self {
                    DbValue::$variant(value.into())
                }
            }
        )*
    };
}

db_value_from!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    Vec<u8> => Blob,
    JsonValue => Json,
);

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// Backend-agnostic parameter type used by callers.
///
/// Each provider translates it through an explicit table in
/// [`crate::mapping`]; there is no positional fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    String,
    StringFixedLength,
    Binary,
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Single,
    Double,
    Decimal,
    Currency,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Guid,
    Xml,
}

impl DbType {
    /// Every generic type, in declaration order.
    pub const ALL: [DbType; 25] = [
        DbType::AnsiString,
        DbType::AnsiStringFixedLength,
        DbType::String,
        DbType::StringFixedLength,
        DbType::Binary,
        DbType::Boolean,
        DbType::Byte,
        DbType::SByte,
        DbType::Int16,
        DbType::Int32,
        DbType::Int64,
        DbType::UInt16,
        DbType::UInt32,
        DbType::UInt64,
        DbType::Single,
        DbType::Double,
        DbType::Decimal,
        DbType::Currency,
        DbType::Date,
        DbType::Time,
        DbType::DateTime,
        DbType::DateTime2,
        DbType::DateTimeOffset,
        DbType::Guid,
        DbType::Xml,
    ];
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl ParameterDirection {
    /// Whether a value is sent to the server.
    #[must_use]
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::InputOutput)
    }

    /// Whether a value is read back after execution.
    #[must_use]
    pub fn is_output(self) -> bool {
        !matches!(self, Self::Input)
    }
}

/// The database vendor a connection string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// SQL Server through `tiberius`
    #[serde(alias = "mssql", alias = "sqlclient")]
    #[value(alias = "mssql")]
    SqlServer,
    /// Any ODBC data source through `odbc-api`
    #[serde(alias = "oledb")]
    Odbc,
    /// Oracle through the `oracle` crate (ODPI-C)
    #[serde(alias = "odp")]
    Oracle,
    /// Embedded `SQLite` through `rusqlite`
    Sqlite,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::SqlServer => "sqlserver",
            Provider::Odbc => "odbc",
            Provider::Oracle => "oracle",
            Provider::Sqlite => "sqlite",
        }
    }

    /// Whether support for this provider was compiled in.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            Provider::SqlServer => cfg!(feature = "mssql"),
            Provider::Odbc => cfg!(feature = "odbc"),
            Provider::Oracle => cfg!(feature = "oracle"),
            Provider::Sqlite => cfg!(feature = "sqlite"),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_becomes_null() {
        let value: DbValue = Option::<i32>::None.into();
        assert!(value.is_null());
        assert_eq!(DbValue::from(Some("x")), DbValue::Text("x".into()));
    }

    #[test]
    fn timestamps_parse_from_text() {
        let value = DbValue::Text("2024-03-01 10:20:30.5".into());
        let ts = value.as_timestamp().unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 10:20:30.500");
        assert_eq!(
            DbValue::Text("2024-03-01T10:20:30".into()).as_timestamp(),
            NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(10, 20, 30))
        );
    }

    #[test]
    fn provider_names_round_trip_through_serde_aliases() {
        let p: Provider = serde_json::from_str("\"mssql\"").unwrap();
        assert_eq!(p, Provider::SqlServer);
        let p: Provider = serde_json::from_str("\"oledb\"").unwrap();
        assert_eq!(p, Provider::Odbc);
        assert_eq!(Provider::Oracle.to_string(), "oracle");
    }
}
