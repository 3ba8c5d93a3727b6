use ::oracle::sql_type::OracleType;
use ::oracle::{ResultSet, Row, SqlValue};
use chrono::NaiveDateTime;

use crate::error::DalError;
use crate::results::DataSet;
use crate::types::DbValue;

/// Convert one column value by its Oracle type.
///
/// # Errors
/// Returns the driver's conversion error.
pub(super) fn to_db_value(value: &SqlValue) -> Result<DbValue, DalError> {
    if value.is_null()? {
        return Ok(DbValue::Null);
    }
    let converted = match value.oracle_type()? {
        OracleType::Number(precision, 0) if *precision > 0 && *precision <= 18 => {
            DbValue::Int(value.get::<i64>()?)
        }
        OracleType::Int64 => DbValue::Int(value.get::<i64>()?),
        OracleType::Number(..)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => DbValue::Float(value.get::<f64>()?),
        OracleType::Date | OracleType::Timestamp(_) => {
            DbValue::Timestamp(value.get::<NaiveDateTime>()?)
        }
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
            DbValue::Blob(value.get::<Vec<u8>>()?)
        }
        OracleType::Boolean => DbValue::Bool(value.get::<bool>()?),
        _ => DbValue::Text(value.get::<String>()?),
    };
    Ok(converted)
}

pub(super) fn extract_row(row: &Row) -> Result<Vec<DbValue>, DalError> {
    row.sql_values().iter().map(to_db_value).collect()
}

pub(super) fn column_names(rows: &ResultSet<'_, Row>) -> Vec<String> {
    rows.column_info()
        .iter()
        .map(|col| col.name().to_string())
        .collect()
}

/// Buffer a query's rows into a single-table data set.
///
/// # Errors
/// Returns the driver's error.
pub(super) fn collect_data_set(rows: ResultSet<'_, Row>) -> Result<DataSet, DalError> {
    let mut data_set = DataSet::new();
    let table = data_set.begin_table(column_names(&rows));
    for row in rows {
        table.push_values(extract_row(&row?)?);
    }
    Ok(data_set)
}
