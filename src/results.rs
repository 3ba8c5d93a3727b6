//! Buffered results: rows, tables and data sets.

mod data_set;
mod row;

pub use data_set::{DataSet, DataTable};
pub use row::{DataRow, RowShape};

use crate::types::DbValue;

/// Outcome of a stored-procedure call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureOutcome {
    /// Rows affected, as reported by the driver.
    pub rows_affected: usize,
    /// Values of `Output`/`InputOutput` parameters, in parameter order.
    pub outputs: Vec<(String, DbValue)>,
    /// Value of the `ReturnValue` parameter, if one was supplied.
    pub return_value: Option<DbValue>,
}

impl ProcedureOutcome {
    /// Output value by parameter name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&DbValue> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}
