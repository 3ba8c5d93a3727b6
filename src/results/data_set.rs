use super::row::{DataRow, RowShape};
use crate::types::DbValue;

/// One buffered result: column names plus every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    name: String,
    shape: RowShape,
    rows: Vec<DataRow>,
}

impl DataTable {
    #[must_use]
    pub fn new(name: impl Into<String>, shape: RowShape) -> Self {
        Self {
            name: name.into(),
            shape,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.shape.columns()
    }

    #[must_use]
    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row of values in column order.
    pub fn push_values(&mut self, values: Vec<DbValue>) {
        self.rows.push(DataRow::new(self.shape.clone(), values));
    }
}

impl<'a> IntoIterator for &'a DataTable {
    type Item = &'a DataRow;
    type IntoIter = std::slice::Iter<'a, DataRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Fully buffered output of a command: one table per result set.
///
/// Tables are named `Table`, `Table1`, `Table2`, … in the order the server
/// returned them. Nothing in a `DataSet` refers back to a connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    tables: Vec<DataTable>,
}

impl DataSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the next table for a result with `columns` and return it for filling.
    pub fn begin_table(&mut self, columns: Vec<String>) -> &mut DataTable {
        let name = match self.tables.len() {
            0 => "Table".to_string(),
            n => format!("Table{n}"),
        };
        self.tables.push(DataTable::new(name, RowShape::new(columns)));
        let last = self.tables.len() - 1;
        &mut self.tables[last]
    }

    /// The table most recently started.
    #[cfg(feature = "mssql")]
    pub(crate) fn current_table_mut(&mut self) -> Option<&mut DataTable> {
        self.tables.last_mut()
    }

    #[must_use]
    pub fn tables(&self) -> &[DataTable] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.tables.iter().find(|t| t.name() == name)
    }

    #[must_use]
    pub fn first_table(&self) -> Option<&DataTable> {
        self.tables.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_named_in_result_order() {
        let mut ds = DataSet::new();
        ds.begin_table(vec!["a".into()]).push_values(vec![DbValue::Int(1)]);
        ds.begin_table(vec!["b".into()]);
        ds.begin_table(vec!["c".into()]);

        let names: Vec<_> = ds.tables().iter().map(DataTable::name).collect();
        assert_eq!(names, ["Table", "Table1", "Table2"]);
        assert_eq!(ds.table("Table").map(DataTable::len), Some(1));
        assert!(ds.table("Table1").is_some_and(DataTable::is_empty));
    }

    #[cfg(feature = "mssql")]
    #[test]
    fn rows_go_to_the_latest_table() {
        let mut ds = DataSet::new();
        assert!(ds.current_table_mut().is_none());
        ds.begin_table(vec!["a".into()]);
        ds.begin_table(vec!["b".into()]);
        if let Some(table) = ds.current_table_mut() {
            table.push_values(vec![DbValue::Int(2)]);
        }
        assert_eq!(ds.tables()[0].len(), 0);
        assert_eq!(ds.tables()[1].len(), 1);
    }
}
