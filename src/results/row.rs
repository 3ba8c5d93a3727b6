use std::collections::HashMap;
use std::sync::Arc;

use crate::types::DbValue;

/// Column names of one result, shared by every row it produces.
///
/// The name→index map is built once per result instead of per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowShape {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl RowShape {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        // first occurrence wins for duplicated column names
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self {
            columns: Arc::new(columns),
            index: Arc::new(index),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of a column, falling back to a case-insensitive match.
    #[must_use]
    pub fn position(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.index.get(column_name) {
            return Some(idx);
        }
        self.columns
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }
}

/// A row from a query result
///
/// Values are in column order; the column names are shared with every other
/// row of the same result.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    shape: RowShape,
    values: Vec<DbValue>,
}

impl DataRow {
    #[must_use]
    pub fn new(shape: RowShape, values: Vec<DbValue>) -> Self {
        Self { shape, values }
    }

    /// The column names for this row
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.shape.columns()
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.shape.position(column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&DbValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn values(&self) -> &[DbValue] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<DbValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index() {
        let shape = RowShape::new(vec!["id".into(), "Name".into()]);
        let row = DataRow::new(shape, vec![DbValue::Int(7), DbValue::Text("seven".into())]);
        assert_eq!(row.get("id"), Some(&DbValue::Int(7)));
        assert_eq!(row.get("name").and_then(DbValue::as_text), Some("seven"));
        assert_eq!(row.get_by_index(1), row.get("Name"));
        assert_eq!(row.get("missing"), None);
    }
}
