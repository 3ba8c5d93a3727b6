use tiberius::{Query, Uuid};

use crate::error::DalError;
use crate::mapping::{NativeType, SqlDbType};
use crate::params::DbParameter;
use crate::types::DbValue;

fn sql_db_type(param: &DbParameter) -> Result<SqlDbType, DalError> {
    match param.native_type() {
        NativeType::SqlServer(native) => Ok(native),
        other => Err(DalError::ParameterError(format!(
            "parameter '{}' has native type {other}, not a SQL Server type",
            param.name()
        ))),
    }
}

/// Bind `param` as the next `@Pn` of `query`.
///
/// Values are coerced to the Rust type `tiberius` sends for the parameter's
/// `SqlDbType`; NULL is bound as a typed `None`.
///
/// # Errors
/// Returns [`DalError::ParameterError`] if the value cannot be coerced.
pub(super) fn bind_parameter(query: &mut Query<'_>, param: &DbParameter) -> Result<(), DalError> {
    match sql_db_type(param)? {
        SqlDbType::BigInt => query.bind(param.int_value()?),
        SqlDbType::Int => query.bind(param.narrow_int::<i32>()?),
        SqlDbType::SmallInt => query.bind(param.narrow_int::<i16>()?),
        SqlDbType::TinyInt => query.bind(param.narrow_int::<u8>()?),
        SqlDbType::Bit => query.bind(param.bool_value()?),
        #[allow(clippy::cast_possible_truncation)]
        SqlDbType::Real => query.bind(param.float_value()?.map(|f| f as f32)),
        SqlDbType::Float => query.bind(param.float_value()?),
        SqlDbType::Decimal | SqlDbType::Money => match param.value() {
            // the server converts to the declared precision
            DbValue::Int(i) => query.bind(*i),
            DbValue::Float(f) => query.bind(*f),
            DbValue::Null => query.bind(Option::<f64>::None),
            _ => query.bind(param.text_value()?.map(|t| t.into_owned())),
        },
        SqlDbType::Char
        | SqlDbType::VarChar
        | SqlDbType::NChar
        | SqlDbType::NVarChar
        | SqlDbType::Xml => query.bind(param.text_value()?.map(|t| t.into_owned())),
        SqlDbType::Binary | SqlDbType::VarBinary => {
            query.bind(param.bytes_value()?.map(|b| b.into_owned()));
        }
        SqlDbType::UniqueIdentifier => query.bind(guid_value(param)?),
        SqlDbType::Date => query.bind(param.date_value()?),
        SqlDbType::Time => query.bind(param.time_value()?),
        SqlDbType::DateTime | SqlDbType::DateTime2 => query.bind(param.timestamp_value()?),
        SqlDbType::DateTimeOffset => query.bind(param.offset_timestamp_value()?),
    }
    Ok(())
}

fn guid_value(param: &DbParameter) -> Result<Option<Uuid>, DalError> {
    param
        .text_value()?
        .map(|text| {
            Uuid::parse_str(text.trim()).map_err(|e| {
                DalError::ParameterError(format!(
                    "parameter '{}': '{text}' is not a GUID: {e}",
                    param.name()
                ))
            })
        })
        .transpose()
}

/// T-SQL type used to declare a variable for an output parameter.
pub(super) fn type_declaration(native: SqlDbType, size: usize) -> String {
    let sized = |name: &str, fixed: bool| match (size, fixed) {
        (0, true) => format!("{name}(1)"),
        (0, false) => format!("{name}(MAX)"),
        (n, _) => format!("{name}({n})"),
    };
    match native {
        SqlDbType::BigInt => "BIGINT".into(),
        SqlDbType::Binary => sized("BINARY", true),
        SqlDbType::Bit => "BIT".into(),
        SqlDbType::Char => sized("CHAR", true),
        SqlDbType::Date => "DATE".into(),
        SqlDbType::DateTime => "DATETIME".into(),
        SqlDbType::DateTime2 => "DATETIME2".into(),
        SqlDbType::DateTimeOffset => "DATETIMEOFFSET".into(),
        SqlDbType::Decimal => "DECIMAL(38, 10)".into(),
        SqlDbType::Float => "FLOAT".into(),
        SqlDbType::Int => "INT".into(),
        SqlDbType::Money => "MONEY".into(),
        SqlDbType::NChar => sized("NCHAR", true),
        SqlDbType::NVarChar => sized("NVARCHAR", false),
        SqlDbType::Real => "REAL".into(),
        SqlDbType::SmallInt => "SMALLINT".into(),
        SqlDbType::Time => "TIME".into(),
        SqlDbType::TinyInt => "TINYINT".into(),
        SqlDbType::UniqueIdentifier => "UNIQUEIDENTIFIER".into(),
        SqlDbType::VarBinary => sized("VARBINARY", false),
        SqlDbType::VarChar => sized("VARCHAR", false),
        SqlDbType::Xml => "XML".into(),
    }
}

/// Declared type of an output parameter's variable.
pub(super) fn declaration_for(param: &DbParameter) -> Result<String, DalError> {
    Ok(type_declaration(sql_db_type(param)?, param.size()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_respect_size() {
        assert_eq!(type_declaration(SqlDbType::NVarChar, 40), "NVARCHAR(40)");
        assert_eq!(type_declaration(SqlDbType::NVarChar, 0), "NVARCHAR(MAX)");
        assert_eq!(type_declaration(SqlDbType::Char, 0), "CHAR(1)");
        assert_eq!(type_declaration(SqlDbType::Int, 8), "INT");
    }
}
