use ::oracle::sql_type::{OracleType, ToSql};
use ::oracle::Statement;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::DalError;
use crate::mapping::{NativeType, OracleDbType};
use crate::params::DbParameter;
use crate::types::{DbType, DbValue};

fn oracle_db_type(param: &DbParameter) -> Result<OracleDbType, DalError> {
    match param.native_type() {
        NativeType::Oracle(native) => Ok(native),
        other => Err(DalError::ParameterError(format!(
            "parameter '{}' has native type {other}, not an Oracle type",
            param.name()
        ))),
    }
}

/// A parameter value in the Rust type the driver binds for its `OracleDbType`.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum OracleValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Timestamp(Option<NaiveDateTime>),
    TimestampTz(Option<DateTime<FixedOffset>>),
    Bytes(Option<Vec<u8>>),
}

impl OracleValue {
    /// Coerce `param`'s value.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value cannot be coerced.
    pub(super) fn from_parameter(param: &DbParameter) -> Result<Self, DalError> {
        let value = match oracle_db_type(param)? {
            OracleDbType::Byte => OracleValue::Int(param.narrow_int::<u8>()?.map(i64::from)),
            OracleDbType::Int16 => match param.db_type() {
                DbType::Boolean => OracleValue::Int(param.bool_value()?.map(i64::from)),
                DbType::SByte => OracleValue::Int(param.narrow_int::<i8>()?.map(i64::from)),
                _ => OracleValue::Int(param.narrow_int::<i16>()?.map(i64::from)),
            },
            OracleDbType::Int32 => OracleValue::Int(param.narrow_int::<i32>()?.map(i64::from)),
            OracleDbType::Int64 => OracleValue::Int(param.int_value()?),
            OracleDbType::BinaryFloat | OracleDbType::BinaryDouble => {
                OracleValue::Float(param.float_value()?)
            }
            // NUMBER keeps decimal text exact
            OracleDbType::Decimal => match param.value() {
                DbValue::Int(i) => OracleValue::Int(Some(*i)),
                DbValue::Float(f) => OracleValue::Float(Some(*f)),
                _ => OracleValue::Text(param.text_value()?.map(|t| t.into_owned())),
            },
            OracleDbType::Date => OracleValue::Date(param.date_value()?),
            OracleDbType::TimeStamp => OracleValue::Timestamp(param.timestamp_value()?),
            OracleDbType::TimeStampTZ => {
                OracleValue::TimestampTz(param.offset_timestamp_value()?)
            }
            OracleDbType::Raw | OracleDbType::Blob => match param.db_type() {
                DbType::Guid => OracleValue::Bytes(guid_bytes(param)?),
                _ => OracleValue::Bytes(param.bytes_value()?.map(|b| b.into_owned())),
            },
            OracleDbType::Varchar2
            | OracleDbType::NVarchar2
            | OracleDbType::Char
            | OracleDbType::NChar
            | OracleDbType::Clob
            | OracleDbType::XmlType => {
                OracleValue::Text(param.text_value()?.map(|t| t.into_owned()))
            }
        };
        Ok(value)
    }

    pub(super) fn as_to_sql(&self) -> &dyn ToSql {
        match self {
            OracleValue::Int(v) => v,
            OracleValue::Float(v) => v,
            OracleValue::Text(v) => v,
            OracleValue::Date(v) => v,
            OracleValue::Timestamp(v) => v,
            OracleValue::TimestampTz(v) => v,
            OracleValue::Bytes(v) => v,
        }
    }

    /// Bind as an IN OUT parameter with room for a value of `out_type`.
    pub(super) fn bind_in_out(
        &self,
        stmt: &mut Statement,
        position: usize,
        out_type: &OracleType,
    ) -> Result<(), DalError> {
        match self {
            OracleValue::Int(v) => stmt.bind(position, &(v, out_type))?,
            OracleValue::Float(v) => stmt.bind(position, &(v, out_type))?,
            OracleValue::Text(v) => stmt.bind(position, &(v, out_type))?,
            OracleValue::Date(v) => stmt.bind(position, &(v, out_type))?,
            OracleValue::Timestamp(v) => stmt.bind(position, &(v, out_type))?,
            OracleValue::TimestampTz(v) => stmt.bind(position, &(v, out_type))?,
            OracleValue::Bytes(v) => stmt.bind(position, &(v, out_type))?,
        }
        Ok(())
    }
}

/// A GUID as the 16 raw bytes Oracle stores in `RAW(16)`.
fn guid_bytes(param: &DbParameter) -> Result<Option<Vec<u8>>, DalError> {
    let Some(text) = param.text_value()? else {
        return Ok(None);
    };
    let hex: String = text.chars().filter(|c| *c != '-' && *c != '{' && *c != '}').collect();
    if hex.len() != 32 {
        return Err(DalError::ParameterError(format!(
            "parameter '{}': '{text}' is not a GUID",
            param.name()
        )));
    }
    (0..16)
        .map(|i| {
            u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| {
                DalError::ParameterError(format!(
                    "parameter '{}': '{text}' is not a GUID",
                    param.name()
                ))
            })
        })
        .collect::<Result<Vec<u8>, _>>()
        .map(Some)
}

/// Every parameter's value, in order.
pub(super) fn bind_values(params: &[DbParameter]) -> Result<Vec<OracleValue>, DalError> {
    params.iter().map(OracleValue::from_parameter).collect()
}

/// The type an output bind is created with.
pub(super) fn out_type(param: &DbParameter) -> Result<OracleType, DalError> {
    let size = u32::try_from(param.size()).unwrap_or(u32::MAX);
    let or = |default: u32| if size == 0 { default } else { size };
    let ty = match oracle_db_type(param)? {
        OracleDbType::Varchar2 => OracleType::Varchar2(or(4000)),
        OracleDbType::NVarchar2 => OracleType::NVarchar2(or(2000)),
        OracleDbType::Char => OracleType::Char(or(2000)),
        OracleDbType::NChar => OracleType::NChar(or(1000)),
        OracleDbType::Clob | OracleDbType::XmlType => OracleType::CLOB,
        OracleDbType::Byte
        | OracleDbType::Int16
        | OracleDbType::Int32
        | OracleDbType::Int64 => OracleType::Int64,
        OracleDbType::Decimal => OracleType::Number(0, -127),
        OracleDbType::BinaryFloat => OracleType::BinaryFloat,
        OracleDbType::BinaryDouble => OracleType::BinaryDouble,
        OracleDbType::Date => OracleType::Date,
        OracleDbType::TimeStamp => OracleType::Timestamp(9),
        OracleDbType::TimeStampTZ => OracleType::TimestampTZ(9),
        OracleDbType::Raw => OracleType::Raw(or(2000)),
        OracleDbType::Blob => OracleType::BLOB,
    };
    Ok(ty)
}

/// Read an output bind back as a value of the parameter's type.
pub(super) fn read_output(
    stmt: &Statement,
    position: usize,
    param: &DbParameter,
) -> Result<DbValue, DalError> {
    let value = match oracle_db_type(param)? {
        OracleDbType::Byte
        | OracleDbType::Int16
        | OracleDbType::Int32
        | OracleDbType::Int64 => stmt
            .bind_value::<_, Option<i64>>(position)?
            .map(|i| match param.db_type() {
                DbType::Boolean => DbValue::Bool(i != 0),
                _ => DbValue::Int(i),
            }),
        OracleDbType::Decimal | OracleDbType::BinaryFloat | OracleDbType::BinaryDouble => stmt
            .bind_value::<_, Option<f64>>(position)?
            .map(DbValue::Float),
        OracleDbType::Date | OracleDbType::TimeStamp => stmt
            .bind_value::<_, Option<NaiveDateTime>>(position)?
            .map(|ts| match param.db_type() {
                DbType::Date => DbValue::Date(ts.date()),
                _ => DbValue::Timestamp(ts),
            }),
        OracleDbType::Raw | OracleDbType::Blob => stmt
            .bind_value::<_, Option<Vec<u8>>>(position)?
            .map(DbValue::Blob),
        OracleDbType::Varchar2
        | OracleDbType::NVarchar2
        | OracleDbType::Char
        | OracleDbType::NChar
        | OracleDbType::Clob
        | OracleDbType::XmlType => stmt
            .bind_value::<_, Option<String>>(position)?
            .map(DbValue::Text),
        OracleDbType::TimeStampTZ => stmt
            .bind_value::<_, Option<DateTime<FixedOffset>>>(position)?
            .map(|ts| DbValue::Text(ts.to_rfc3339())),
    };
    Ok(value.unwrap_or(DbValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParameterDirection, Provider};

    fn param(db_type: DbType, size: usize, value: impl Into<DbValue>) -> DbParameter {
        DbParameter::new(
            Provider::Oracle,
            "p",
            db_type,
            size,
            value,
            ParameterDirection::Input,
        )
        .unwrap()
    }

    #[test]
    fn values_follow_native_type() {
        assert_eq!(
            OracleValue::from_parameter(&param(DbType::Boolean, 0, true)).unwrap(),
            OracleValue::Int(Some(1))
        );
        assert_eq!(
            OracleValue::from_parameter(&param(DbType::String, 0, "x")).unwrap(),
            OracleValue::Text(Some("x".into()))
        );
        assert!(OracleValue::from_parameter(&param(DbType::Int16, 0, 70_000)).is_err());
    }

    #[test]
    fn guids_become_raw_bytes() {
        let value = OracleValue::from_parameter(&param(
            DbType::Guid,
            16,
            "{00112233-4455-6677-8899-aabbccddeeff}",
        ))
        .unwrap();
        let OracleValue::Bytes(Some(bytes)) = value else {
            panic!("expected bytes");
        };
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[15], 0xff);
    }

    #[test]
    fn output_types_use_declared_size() {
        assert_eq!(
            out_type(&param(DbType::String, 40, DbValue::Null)).unwrap(),
            OracleType::Varchar2(40)
        );
        assert_eq!(
            out_type(&param(DbType::String, 0, DbValue::Null)).unwrap(),
            OracleType::Varchar2(4000)
        );
    }

    #[test]
    fn offset_timestamps_bind_as_zoned_values() {
        let value = OracleValue::from_parameter(&param(
            DbType::DateTimeOffset,
            0,
            "2024-01-01T00:00:00+02:00",
        ))
        .unwrap();
        let OracleValue::TimestampTz(Some(ts)) = value else {
            panic!("expected a zoned timestamp");
        };
        assert_eq!(ts.offset().local_minus_utc(), 7200);
        assert!(
            OracleValue::from_parameter(&param(DbType::DateTimeOffset, 0, "01-JAN-24")).is_err()
        );
    }
}
