use rusqlite::types::Value;
use rusqlite::{Row, Rows, Statement, params_from_iter};

use crate::error::DalError;
use crate::results::DataSet;
use crate::types::DbValue;

/// Convert one `SQLite` value.
fn to_db_value(value: Value) -> DbValue {
    match value {
        Value::Null => DbValue::Null,
        Value::Integer(i) => DbValue::Int(i),
        Value::Real(f) => DbValue::Float(f),
        Value::Text(s) => DbValue::Text(s),
        Value::Blob(b) => DbValue::Blob(b),
    }
}

/// Read every column of `row`.
///
/// # Errors
/// Returns the `rusqlite` error for an unreadable column.
pub(super) fn extract_row(row: &Row<'_>, column_count: usize) -> Result<Vec<DbValue>, DalError> {
    let mut values = Vec::with_capacity(column_count);
    for idx in 0..column_count {
        let value: Value = row.get(idx)?;
        values.push(to_db_value(value));
    }
    Ok(values)
}

pub(super) fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect()
}

/// Start `stmt` with positional values.
pub(super) fn query<'s>(stmt: &'s mut Statement<'_>, values: &[Value]) -> Result<Rows<'s>, DalError> {
    Ok(stmt.query(params_from_iter(values.iter()))?)
}

/// Run a query and buffer its rows into a single-table data set.
///
/// # Errors
/// Returns the `rusqlite` error from preparing, binding or stepping.
pub(super) fn build_data_set(
    conn: &rusqlite::Connection,
    sql: &str,
    values: &[Value],
) -> Result<DataSet, DalError> {
    let mut stmt = conn.prepare(sql)?;
    let columns = column_names(&stmt);
    let column_count = columns.len();

    let mut data_set = DataSet::new();
    let mut rows = query(&mut stmt, values)?;
    let table = data_set.begin_table(columns);
    while let Some(row) = rows.next()? {
        table.push_values(extract_row(row, column_count)?);
    }
    Ok(data_set)
}
