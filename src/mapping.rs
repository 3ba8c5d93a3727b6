//! Generic [`DbType`] to native parameter type tables, one per provider.
//!
//! Every table is an exhaustive `match`: adding a generic type without
//! deciding its native counterpart is a compile error, and a type a backend
//! cannot represent is rejected when the parameter is created.

use std::fmt;

use crate::error::DalError;
use crate::types::{DbType, Provider};

/// SQL Server parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDbType {
    BigInt,
    Binary,
    Bit,
    Char,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Float,
    Int,
    Money,
    NChar,
    NVarChar,
    Real,
    SmallInt,
    Time,
    TinyInt,
    UniqueIdentifier,
    VarBinary,
    VarChar,
    Xml,
}

/// ODBC SQL data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OdbcType {
    BigInt,
    Binary,
    Bit,
    Char,
    Date,
    Decimal,
    Double,
    Guid,
    Integer,
    Numeric,
    Real,
    SmallInt,
    Time,
    Timestamp,
    TinyInt,
    VarBinary,
    VarChar,
    WChar,
    WLongVarChar,
    WVarChar,
}

/// Oracle parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleDbType {
    BinaryDouble,
    BinaryFloat,
    Blob,
    Byte,
    Char,
    Clob,
    Date,
    Decimal,
    Int16,
    Int32,
    Int64,
    NChar,
    NVarchar2,
    Raw,
    TimeStamp,
    TimeStampTZ,
    Varchar2,
    XmlType,
}

/// `SQLite` storage classes (plus NUMERIC affinity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqliteType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

/// A provider-specific parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    SqlServer(SqlDbType),
    Odbc(OdbcType),
    Oracle(OracleDbType),
    Sqlite(SqliteType),
}

impl NativeType {
    /// Map a generic type for `provider`.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] when the provider has no counterpart
    /// for `db_type`.
    pub fn map(provider: Provider, db_type: DbType) -> Result<Self, DalError> {
        let native = match provider {
            Provider::SqlServer => sql_server_type(db_type).map(NativeType::SqlServer),
            Provider::Odbc => odbc_type(db_type).map(NativeType::Odbc),
            Provider::Oracle => oracle_type(db_type).map(NativeType::Oracle),
            Provider::Sqlite => sqlite_type(db_type).map(NativeType::Sqlite),
        };
        native.ok_or_else(|| {
            DalError::ParameterError(format!(
                "DbType::{db_type} has no {provider} parameter type"
            ))
        })
    }

    #[must_use]
    pub fn provider(self) -> Provider {
        match self {
            NativeType::SqlServer(_) => Provider::SqlServer,
            NativeType::Odbc(_) => Provider::Odbc,
            NativeType::Oracle(_) => Provider::Oracle,
            NativeType::Sqlite(_) => Provider::Sqlite,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::SqlServer(t) => write!(f, "SqlDbType::{t:?}"),
            NativeType::Odbc(t) => write!(f, "OdbcType::{t:?}"),
            NativeType::Oracle(t) => write!(f, "OracleDbType::{t:?}"),
            NativeType::Sqlite(t) => write!(f, "SqliteType::{t:?}"),
        }
    }
}

/// SQL Server has no signed byte and no unsigned wider integers.
#[must_use]
pub fn sql_server_type(db_type: DbType) -> Option<SqlDbType> {
    let native = match db_type {
        DbType::AnsiString => SqlDbType::VarChar,
        DbType::AnsiStringFixedLength => SqlDbType::Char,
        DbType::String => SqlDbType::NVarChar,
        DbType::StringFixedLength => SqlDbType::NChar,
        DbType::Binary => SqlDbType::VarBinary,
        DbType::Boolean => SqlDbType::Bit,
        DbType::Byte => SqlDbType::TinyInt,
        DbType::Int16 => SqlDbType::SmallInt,
        DbType::Int32 => SqlDbType::Int,
        DbType::Int64 => SqlDbType::BigInt,
        DbType::Single => SqlDbType::Real,
        DbType::Double => SqlDbType::Float,
        DbType::Decimal => SqlDbType::Decimal,
        DbType::Currency => SqlDbType::Money,
        DbType::Date => SqlDbType::Date,
        DbType::Time => SqlDbType::Time,
        DbType::DateTime => SqlDbType::DateTime,
        DbType::DateTime2 => SqlDbType::DateTime2,
        DbType::DateTimeOffset => SqlDbType::DateTimeOffset,
        DbType::Guid => SqlDbType::UniqueIdentifier,
        DbType::Xml => SqlDbType::Xml,
        DbType::SByte | DbType::UInt16 | DbType::UInt32 | DbType::UInt64 => return None,
    };
    Some(native)
}

/// ODBC defines no SQL type carrying a zone offset.
#[must_use]
pub fn odbc_type(db_type: DbType) -> Option<OdbcType> {
    let native = match db_type {
        DbType::AnsiString | DbType::String => OdbcType::VarChar,
        DbType::AnsiStringFixedLength => OdbcType::Char,
        DbType::StringFixedLength => OdbcType::WChar,
        DbType::Binary => OdbcType::VarBinary,
        DbType::Boolean => OdbcType::Bit,
        DbType::Byte | DbType::SByte => OdbcType::TinyInt,
        DbType::Int16 => OdbcType::SmallInt,
        DbType::Int32 | DbType::UInt16 => OdbcType::Integer,
        DbType::Int64 | DbType::UInt32 => OdbcType::BigInt,
        DbType::UInt64 => OdbcType::Numeric,
        DbType::Single => OdbcType::Real,
        DbType::Double => OdbcType::Double,
        DbType::Decimal | DbType::Currency => OdbcType::Decimal,
        DbType::Date => OdbcType::Date,
        DbType::Time => OdbcType::Time,
        DbType::DateTime | DbType::DateTime2 => OdbcType::Timestamp,
        DbType::Guid => OdbcType::Guid,
        DbType::Xml => OdbcType::WLongVarChar,
        DbType::DateTimeOffset => return None,
    };
    Some(native)
}

/// Oracle has no time-of-day type.
#[must_use]
pub fn oracle_type(db_type: DbType) -> Option<OracleDbType> {
    let native = match db_type {
        DbType::AnsiString | DbType::String => OracleDbType::Varchar2,
        DbType::AnsiStringFixedLength => OracleDbType::Char,
        DbType::StringFixedLength => OracleDbType::NChar,
        DbType::Binary | DbType::Guid => OracleDbType::Raw,
        DbType::Boolean | DbType::SByte | DbType::Int16 => OracleDbType::Int16,
        DbType::Byte => OracleDbType::Byte,
        DbType::Int32 | DbType::UInt16 => OracleDbType::Int32,
        DbType::Int64 | DbType::UInt32 => OracleDbType::Int64,
        DbType::UInt64 | DbType::Decimal | DbType::Currency => OracleDbType::Decimal,
        DbType::Single => OracleDbType::BinaryFloat,
        DbType::Double => OracleDbType::BinaryDouble,
        DbType::Date => OracleDbType::Date,
        DbType::DateTime | DbType::DateTime2 => OracleDbType::TimeStamp,
        DbType::DateTimeOffset => OracleDbType::TimeStampTZ,
        DbType::Xml => OracleDbType::XmlType,
        DbType::Time => return None,
    };
    Some(native)
}

/// `SQLite` integers are signed 64-bit, so `UInt64` does not fit.
#[must_use]
pub fn sqlite_type(db_type: DbType) -> Option<SqliteType> {
    let native = match db_type {
        DbType::AnsiString
        | DbType::AnsiStringFixedLength
        | DbType::String
        | DbType::StringFixedLength
        | DbType::Date
        | DbType::Time
        | DbType::DateTime
        | DbType::DateTime2
        | DbType::DateTimeOffset
        | DbType::Guid
        | DbType::Xml => SqliteType::Text,
        DbType::Binary => SqliteType::Blob,
        DbType::Boolean
        | DbType::Byte
        | DbType::SByte
        | DbType::Int16
        | DbType::Int32
        | DbType::Int64
        | DbType::UInt16
        | DbType::UInt32 => SqliteType::Integer,
        DbType::Single | DbType::Double => SqliteType::Real,
        DbType::Decimal | DbType::Currency => SqliteType::Numeric,
        DbType::UInt64 => return None,
    };
    Some(native)
}
