use odbc_api::parameter::{InputParameter, VarBinaryBox, VarCharBox};
use odbc_api::{Bit, Nullable};

use crate::error::DalError;
use crate::mapping::{NativeType, OdbcType};
use crate::params::DbParameter;
use crate::types::DbType;

pub(super) type OdbcParams = Vec<Box<dyn InputParameter>>;

fn odbc_type(param: &DbParameter) -> Result<OdbcType, DalError> {
    match param.native_type() {
        NativeType::Odbc(native) => Ok(native),
        other => Err(DalError::ParameterError(format!(
            "parameter '{}' has native type {other}, not an ODBC type",
            param.name()
        ))),
    }
}

macro_rules! nullable {
    ($value:expr) => {
        $value.map_or_else(Nullable::null, Nullable::new)
    };
}

/// A `Byte` value, range checked as `u8` and sent as a small integer since
/// ODBC has no unsigned C type to bind it with.
fn unsigned_tiny_int(param: &DbParameter) -> Result<Option<i16>, DalError> {
    Ok(param.narrow_int::<u8>()?.map(i16::from))
}

/// Box one parameter for `odbc-api`.
///
/// Numbers are sent as their C types; dates, times and decimals go as
/// ISO-8601 or decimal text and are converted by the driver.
fn to_odbc_parameter(param: &DbParameter) -> Result<Box<dyn InputParameter>, DalError> {
    let boxed: Box<dyn InputParameter> = match odbc_type(param)? {
        OdbcType::TinyInt => match param.db_type() {
            DbType::SByte => Box::new(nullable!(param.narrow_int::<i8>()?)),
            _ => Box::new(nullable!(unsigned_tiny_int(param)?)),
        },
        OdbcType::SmallInt => Box::new(nullable!(param.narrow_int::<i16>()?)),
        OdbcType::Integer => Box::new(nullable!(param.narrow_int::<i32>()?)),
        OdbcType::BigInt => Box::new(nullable!(param.int_value()?)),
        #[allow(clippy::cast_possible_truncation)]
        OdbcType::Real => Box::new(nullable!(param.float_value()?.map(|f| f as f32))),
        OdbcType::Double => Box::new(nullable!(param.float_value()?)),
        OdbcType::Bit => Box::new(nullable!(param.bool_value()?.map(Bit::from_bool))),
        OdbcType::Binary | OdbcType::VarBinary => {
            Box::new(match param.bytes_value()? {
                Some(bytes) => VarBinaryBox::from_vec(bytes.into_owned()),
                None => VarBinaryBox::null(),
            })
        }
        OdbcType::Date
        | OdbcType::Time
        | OdbcType::Timestamp
        | OdbcType::Decimal
        | OdbcType::Numeric
        | OdbcType::Guid
        | OdbcType::Char
        | OdbcType::VarChar
        | OdbcType::WChar
        | OdbcType::WVarChar
        | OdbcType::WLongVarChar => {
            Box::new(match param.text_value()? {
                Some(text) => VarCharBox::from_string(text.into_owned()),
                None => VarCharBox::null(),
            })
        }
    };
    Ok(boxed)
}

/// Box every parameter, in order.
pub(super) fn bind_params(params: &[DbParameter]) -> Result<OdbcParams, DalError> {
    params.iter().map(to_odbc_parameter).collect()
}
