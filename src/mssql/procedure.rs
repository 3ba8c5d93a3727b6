//! Procedure calls as T-SQL batches.
//!
//! Output and return values travel back through variables selected at the
//! end of the batch:
//!
//! ```sql
//! DECLARE @__rows INT;
//! DECLARE @__rv INT;
//! DECLARE @__o1 NVARCHAR(40);
//! SET @__o1 = @P2;
//! EXEC @__rv = dbo.rename_user @P1, @__o1 OUTPUT;
//! SET @__rows = @@ROWCOUNT;
//! SELECT @__rows, @__rv, @__o1;
//! ```

use std::fmt::Write;

use crate::error::DalError;
use crate::params::DbParameter;
use crate::procedure::{CallArgument, CallPlan};
use crate::results::{DataSet, ProcedureOutcome};
use crate::types::{DbValue, ParameterDirection};

use super::params::declaration_for;

/// A procedure call rendered for SQL Server.
pub(super) struct ProcedureBatch<'a> {
    pub(super) sql: String,
    /// Parameters bound as `@P1…`, in order.
    pub(super) binds: Vec<&'a DbParameter>,
    returns: bool,
    outputs: Vec<&'a DbParameter>,
}

impl<'a> ProcedureBatch<'a> {
    /// Render `plan`.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] for an output parameter without a
    /// SQL Server type.
    pub(super) fn build(plan: &CallPlan<'a>) -> Result<Self, DalError> {
        let returns = plan.return_value.is_some();
        let mut declarations = String::new();
        let mut arguments = Vec::with_capacity(plan.arguments.len());
        let mut binds = Vec::new();
        let mut outputs = Vec::new();
        let mut selected = vec!["@__rows".to_string()];

        if returns {
            selected.push("@__rv".into());
        }
        for (idx, argument) in plan.arguments.iter().enumerate() {
            match *argument {
                CallArgument::Literal(text) => arguments.push(text.to_string()),
                CallArgument::Parameter(param) if !param.direction().is_output() => {
                    binds.push(param);
                    arguments.push(format!("@P{}", binds.len()));
                }
                CallArgument::Parameter(param) => {
                    let var = format!("@__o{}", idx + 1);
                    let _ = writeln!(declarations, "DECLARE {var} {};", declaration_for(param)?);
                    if param.direction() == ParameterDirection::InputOutput {
                        binds.push(param);
                        let _ = writeln!(declarations, "SET {var} = @P{};", binds.len());
                    }
                    arguments.push(format!("{var} OUTPUT"));
                    outputs.push(param);
                    selected.push(var);
                }
            }
        }

        let mut sql = String::from("DECLARE @__rows INT;\n");
        if returns {
            sql.push_str("DECLARE @__rv INT;\n");
        }
        sql.push_str(&declarations);
        sql.push_str(if returns { "EXEC @__rv = " } else { "EXEC " });
        sql.push_str(plan.name);
        if !arguments.is_empty() {
            sql.push(' ');
            sql.push_str(&arguments.join(", "));
        }
        sql.push_str(";\nSET @__rows = @@ROWCOUNT;\nSELECT ");
        sql.push_str(&selected.join(", "));
        sql.push(';');

        Ok(Self {
            sql,
            binds,
            returns,
            outputs,
        })
    }

    /// Read the outcome from the batch's last result.
    ///
    /// # Errors
    /// Returns [`DalError::ExecutionError`] if the closing SELECT is missing.
    pub(super) fn outcome(&self, results: &DataSet) -> Result<ProcedureOutcome, DalError> {
        let row = results
            .tables()
            .last()
            .and_then(|table| table.rows().first())
            .ok_or_else(|| {
                DalError::ExecutionError("procedure batch returned no output row".into())
            })?;
        let mut values = row.values().iter().cloned();
        let mut next = || values.next().unwrap_or(DbValue::Null);

        #[allow(clippy::cast_sign_loss)]
        let rows_affected = next().as_int().map_or(0, |n| n.max(0) as usize);
        let return_value = self.returns.then(&mut next);
        let outputs = self
            .outputs
            .iter()
            .map(|param| (param.name().to_string(), next()))
            .collect();
        Ok(ProcedureOutcome {
            rows_affected,
            outputs,
            return_value,
        })
    }
}

/// `EXEC name @P1, …` for calls that read nothing back.
pub(super) fn input_only_batch(plan: &CallPlan<'_>) -> String {
    let mut bound = 0;
    let arguments: Vec<String> = plan
        .arguments
        .iter()
        .map(|argument| match argument {
            CallArgument::Literal(text) => (*text).to_string(),
            CallArgument::Parameter(_) => {
                bound += 1;
                format!("@P{bound}")
            }
        })
        .collect();
    if arguments.is_empty() {
        format!("EXEC {}", plan.name)
    } else {
        format!("EXEC {} {}", plan.name, arguments.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::ProcedureCall;
    use crate::types::{DbType, Provider};

    fn param(name: &str, db_type: DbType, direction: ParameterDirection) -> DbParameter {
        DbParameter::new(Provider::SqlServer, name, db_type, 40, DbValue::Null, direction).unwrap()
    }

    #[test]
    fn renders_outputs_and_return_value() {
        let call = ProcedureCall::parse("{? = CALL dbo.rename_user(?, ?)}").unwrap();
        let params = vec![
            param("rv", DbType::Int32, ParameterDirection::ReturnValue),
            param("id", DbType::Int32, ParameterDirection::Input),
            param("name", DbType::String, ParameterDirection::InputOutput),
        ];
        let plan = call.plan(&params).unwrap();
        let batch = ProcedureBatch::build(&plan).unwrap();
        assert_eq!(
            batch.sql,
            "DECLARE @__rows INT;\nDECLARE @__rv INT;\nDECLARE @__o2 NVARCHAR(40);\n\
             SET @__o2 = @P2;\nEXEC @__rv = dbo.rename_user @P1, @__o2 OUTPUT;\n\
             SET @__rows = @@ROWCOUNT;\nSELECT @__rows, @__rv, @__o2;"
        );
        let bound: Vec<_> = batch.binds.iter().map(|p| p.name()).collect();
        assert_eq!(bound, ["id", "name"]);

        let mut results = DataSet::new();
        results
            .begin_table(vec![String::new(); 3])
            .push_values(vec![DbValue::Int(1), DbValue::Int(0), DbValue::Text("x".into())]);
        let outcome = batch.outcome(&results).unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.return_value, Some(DbValue::Int(0)));
        assert_eq!(outcome.output("name"), Some(&DbValue::Text("x".into())));
    }

    #[test]
    fn input_only_calls_are_plain_exec() {
        let call = ProcedureCall::parse("{CALL purge(?, 30)}").unwrap();
        let params = vec![param("days", DbType::Int32, ParameterDirection::Input)];
        let plan = call.plan(&params).unwrap();
        assert_eq!(input_only_batch(&plan), "EXEC purge @P1, 30");
    }
}
