use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures_util::TryStreamExt;
use tiberius::{ColumnData, FromSql, Query, QueryItem, QueryStream, Row};

use crate::error::DalError;
use crate::params::DbParameter;
use crate::results::DataSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::DbValue;

use super::params::bind_parameter;

/// Translate `?` placeholders and bind every parameter.
///
/// # Errors
/// Returns [`DalError::ParameterError`] for a value that cannot be bound.
pub(super) fn build_query<'a>(sql: &str, params: &[DbParameter]) -> Result<Query<'a>, DalError> {
    let translated = translate_placeholders(sql, PlaceholderStyle::AtP).into_owned();
    let mut query = Query::new(translated);
    for param in params {
        bind_parameter(&mut query, param)?;
    }
    Ok(query)
}

/// Convert one cell.
///
/// # Errors
/// Returns the `tiberius` error if a temporal value is out of range.
pub(super) fn to_db_value(data: ColumnData<'static>) -> Result<DbValue, DalError> {
    let value = match &data {
        ColumnData::U8(v) => v.map(|v| DbValue::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| DbValue::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| DbValue::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(DbValue::Int),
        ColumnData::F32(v) => v.map(|v| DbValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(DbValue::Float),
        ColumnData::Bit(v) => v.map(DbValue::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| DbValue::Text(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| DbValue::Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| DbValue::Blob(b.to_vec())),
        ColumnData::Numeric(v) => v.map(|n| DbValue::Float(f64::from(n))),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| DbValue::Text(x.clone().into_owned().into_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)?.map(DbValue::Timestamp)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(&data)?.map(DbValue::Date),
        ColumnData::Time(_) => NaiveTime::from_sql(&data)?.map(DbValue::Time),
        // keep the offset by returning RFC 3339 text
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(&data)?
            .map(|dt| DbValue::Text(dt.to_rfc3339())),
    };
    Ok(value.unwrap_or(DbValue::Null))
}

/// Every cell of `row`, in column order.
pub(super) fn extract_row(row: Row) -> Result<Vec<DbValue>, DalError> {
    row.into_iter().map(to_db_value).collect()
}

pub(super) fn column_names(metadata: &tiberius::ResultMetadata) -> Vec<String> {
    metadata
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect()
}

/// Buffer every result of a batch, one table per result with columns.
///
/// # Errors
/// Returns the `tiberius` error that ended the stream.
pub(super) async fn collect_data_set(mut stream: QueryStream<'_>) -> Result<DataSet, DalError> {
    let mut data_set = DataSet::new();
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(metadata) => {
                data_set.begin_table(column_names(&metadata));
            }
            QueryItem::Row(row) => {
                let values = extract_row(row)?;
                if let Some(table) = data_set.current_table_mut() {
                    table.push_values(values);
                }
            }
        }
    }
    Ok(data_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_cells() {
        assert_eq!(to_db_value(ColumnData::I32(Some(7))).unwrap(), DbValue::Int(7));
        assert_eq!(to_db_value(ColumnData::I32(None)).unwrap(), DbValue::Null);
        assert_eq!(
            to_db_value(ColumnData::String(Some("seven".into()))).unwrap(),
            DbValue::Text("seven".into())
        );
        assert_eq!(to_db_value(ColumnData::Bit(Some(true))).unwrap(), DbValue::Bool(true));
    }
}
