use rusqlite::types::Value;

use crate::error::DalError;
use crate::mapping::SqliteType;
use crate::params::DbParameter;
use crate::types::{DbType, DbValue};

/// Convert one parameter to the value `rusqlite` binds.
///
/// Integers are range-checked against the generic type; dates are stored as
/// ISO-8601 text.
pub(super) fn to_sqlite_value(param: &DbParameter) -> Result<Value, DalError> {
    let native = match param.native_type() {
        crate::mapping::NativeType::Sqlite(native) => native,
        other => {
            return Err(DalError::ParameterError(format!(
                "parameter '{}' has native type {other}, not a SQLite type",
                param.name()
            )));
        }
    };

    let value = match native {
        SqliteType::Integer => {
            let int = match param.db_type() {
                DbType::Boolean => param.bool_value()?.map(i64::from),
                DbType::Byte => param.narrow_int::<u8>()?.map(i64::from),
                DbType::SByte => param.narrow_int::<i8>()?.map(i64::from),
                DbType::Int16 => param.narrow_int::<i16>()?.map(i64::from),
                DbType::Int32 => param.narrow_int::<i32>()?.map(i64::from),
                DbType::UInt16 => param.narrow_int::<u16>()?.map(i64::from),
                DbType::UInt32 => param.narrow_int::<u32>()?.map(i64::from),
                _ => param.int_value()?,
            };
            int.map(Value::Integer)
        }
        SqliteType::Real => param.float_value()?.map(Value::Real),
        SqliteType::Numeric => match param.value() {
            DbValue::Null => None,
            DbValue::Int(i) => Some(Value::Integer(*i)),
            DbValue::Float(f) => Some(Value::Real(*f)),
            _ => param.text_value()?.map(|t| Value::Text(t.into_owned())),
        },
        SqliteType::Text => match param.db_type() {
            DbType::Date => param
                .date_value()?
                .map(|d| Value::Text(d.format("%F").to_string())),
            DbType::DateTime | DbType::DateTime2 => param
                .timestamp_value()?
                .map(|ts| Value::Text(ts.format("%F %T%.f").to_string())),
            _ => param.text_value()?.map(|t| Value::Text(t.into_owned())),
        },
        SqliteType::Blob => param.bytes_value()?.map(|b| Value::Blob(b.into_owned())),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Convert every parameter, in order.
pub(super) fn bind_values(params: &[DbParameter]) -> Result<Vec<Value>, DalError> {
    params.iter().map(to_sqlite_value).collect()
}
