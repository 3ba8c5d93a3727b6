use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use odbc_api::{Cursor, CursorRow, DataType, ResultSetMetadata};

use crate::error::DalError;
use crate::results::DataSet;
use crate::types::DbValue;

/// How a column's text is turned back into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ColumnKind {
    Integer,
    Float,
    Bit,
    Binary,
    Date,
    Time,
    Timestamp,
    Text,
}

impl ColumnKind {
    fn of(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                ColumnKind::Integer
            }
            DataType::Real | DataType::Float { .. } | DataType::Double => ColumnKind::Float,
            DataType::Bit => ColumnKind::Bit,
            DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
                ColumnKind::Binary
            }
            DataType::Date => ColumnKind::Date,
            DataType::Time { .. } => ColumnKind::Time,
            DataType::Timestamp { .. } => ColumnKind::Timestamp,
            // decimals stay text so no precision is lost
            _ => ColumnKind::Text,
        }
    }

    fn parse(self, text: String) -> DbValue {
        let trimmed = text.trim();
        let parsed = match self {
            ColumnKind::Integer => trimmed.parse().ok().map(DbValue::Int),
            ColumnKind::Float => trimmed.parse().ok().map(DbValue::Float),
            ColumnKind::Bit => match trimmed {
                "1" => Some(DbValue::Bool(true)),
                "0" => Some(DbValue::Bool(false)),
                _ => None,
            },
            ColumnKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(DbValue::Date),
            ColumnKind::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                .ok()
                .map(DbValue::Time),
            ColumnKind::Timestamp => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(DbValue::Timestamp),
            ColumnKind::Binary | ColumnKind::Text => None,
        };
        parsed.unwrap_or(DbValue::Text(text))
    }
}

/// Column names and kinds of the cursor's current result.
///
/// # Errors
/// Returns the driver's error.
pub(super) fn describe(cursor: &mut impl ResultSetMetadata) -> Result<(Vec<String>, Vec<ColumnKind>), DalError> {
    let count = u16::try_from(cursor.num_result_cols()?).unwrap_or(0);
    let mut names = Vec::with_capacity(usize::from(count));
    let mut kinds = Vec::with_capacity(usize::from(count));
    for col in 1..=count {
        names.push(cursor.col_name(col)?);
        kinds.push(ColumnKind::of(cursor.col_data_type(col)?));
    }
    Ok((names, kinds))
}

/// Read every column of the current row.
///
/// # Errors
/// Returns the driver's error.
pub(super) fn extract_row(
    row: &mut CursorRow<'_>,
    kinds: &[ColumnKind],
    buf: &mut Vec<u8>,
) -> Result<Vec<DbValue>, DalError> {
    let mut values = Vec::with_capacity(kinds.len());
    for (idx, kind) in kinds.iter().enumerate() {
        let col = u16::try_from(idx + 1)
            .map_err(|_| DalError::ExecutionError("too many result columns".into()))?;
        buf.clear();
        let value = if *kind == ColumnKind::Binary {
            if row.get_binary(col, buf)? {
                DbValue::Blob(buf.clone())
            } else {
                DbValue::Null
            }
        } else if row.get_text(col, buf)? {
            kind.parse(String::from_utf8_lossy(buf).into_owned())
        } else {
            DbValue::Null
        };
        values.push(value);
    }
    Ok(values)
}

/// Buffer the cursor's result and every result after it.
///
/// # Errors
/// Returns the driver's error.
pub(super) fn collect_data_set(cursor: impl Cursor) -> Result<DataSet, DalError> {
    let mut data_set = DataSet::new();
    let mut buf = Vec::new();
    let mut next = Some(cursor);
    while let Some(mut cursor) = next {
        let (columns, kinds) = describe(&mut cursor)?;
        let table = data_set.begin_table(columns);
        while let Some(mut row) = cursor.next_row()? {
            table.push_values(extract_row(&mut row, &kinds, &mut buf)?);
        }
        next = cursor.more_results()?;
    }
    Ok(data_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_text_is_parsed_by_kind() {
        assert_eq!(ColumnKind::Integer.parse("42".into()), DbValue::Int(42));
        assert_eq!(ColumnKind::Bit.parse("1".into()), DbValue::Bool(true));
        assert_eq!(
            ColumnKind::Date.parse("2024-01-31".into()),
            DbValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert_eq!(ColumnKind::Integer.parse("n/a".into()), DbValue::Text("n/a".into()));
        assert_eq!(ColumnKind::Text.parse("12.50".into()), DbValue::Text("12.50".into()));
    }
}
