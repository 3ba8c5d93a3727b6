use ::oracle::sql_type::ToSql;
use async_trait::async_trait;

use crate::connector::{Backend, CommandRequest};
use crate::error::DalError;
use crate::procedure::{CallArgument, CallPlan, ProcedureCall};
use crate::reader::{DataReader, RowSink, spawn_reader_thread};
use crate::results::{DataSet, ProcedureOutcome};
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::types::{ParameterDirection, Provider};

use super::client::{OracleSession, connect};
use super::params::{OracleValue, bind_values, out_type, read_output};
use super::query::{collect_data_set, column_names, extract_row};

/// Oracle Database through the `oracle` crate.
///
/// The connection string is ODP style:
/// `User Id=scott;Password=tiger;Data Source=//host:1521/service`. `?`
/// placeholders are rewritten to `:1`, `:2`, …. Connections run in autocommit
/// mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleBackend;

fn to_sql_refs(values: &[OracleValue]) -> Vec<&dyn ToSql> {
    values.iter().map(OracleValue::as_to_sql).collect()
}

fn rows_to_usize(count: u64) -> Result<usize, DalError> {
    usize::try_from(count)
        .map_err(|_| DalError::ExecutionError(format!("row count {count} does not fit in usize")))
}

/// `BEGIN [:1 :=] name(:2, …); END;` with binds numbered in plan order.
fn plsql_block(plan: &CallPlan<'_>) -> String {
    let mut position = 0;
    let mut next = || {
        position += 1;
        format!(":{position}")
    };
    let mut block = String::from("BEGIN ");
    if plan.return_value.is_some() {
        block.push_str(&next());
        block.push_str(" := ");
    }
    block.push_str(plan.name);
    let arguments: Vec<String> = plan
        .arguments
        .iter()
        .map(|argument| match argument {
            CallArgument::Parameter(_) => next(),
            CallArgument::Literal(text) => (*text).to_string(),
        })
        .collect();
    if !arguments.is_empty() {
        block.push('(');
        block.push_str(&arguments.join(", "));
        block.push(')');
    }
    block.push_str("; END;");
    block
}

#[async_trait]
impl Backend for OracleBackend {
    fn provider(&self) -> Option<Provider> {
        Some(Provider::Oracle)
    }

    async fn open_reader(&self, request: CommandRequest) -> Result<DataReader, DalError> {
        let values = bind_values(request.parameters())?;
        let pending = spawn_reader_thread(Provider::Oracle, move |mut sink| {
            let session = match connect(&request) {
                Ok(session) => session,
                Err(err) => {
                    sink.fail(err);
                    return;
                }
            };
            if let Err(err) = stream_rows(&session, request.command_text(), &values, &mut sink) {
                sink.fail(err);
            }
            drop(session);
        })?;
        pending.wait().await
    }

    async fn fill_data_set(&self, request: CommandRequest) -> Result<DataSet, DalError> {
        let values = bind_values(request.parameters())?;
        tokio::task::spawn_blocking(move || {
            let session = connect(&request)?;
            let sql = translate_placeholders(request.command_text(), PlaceholderStyle::Colon);
            let mut stmt = session.conn.statement(&sql).build()?;
            let rows = stmt.query(&to_sql_refs(&values))?;
            collect_data_set(rows)
        })
        .await?
    }

    async fn execute_non_query(&self, request: CommandRequest) -> Result<usize, DalError> {
        let values = bind_values(request.parameters())?;
        tokio::task::spawn_blocking(move || {
            let session = connect(&request)?;
            let sql = translate_placeholders(request.command_text(), PlaceholderStyle::Colon);
            let mut stmt = session.conn.statement(&sql).build()?;
            stmt.execute(&to_sql_refs(&values))?;
            rows_to_usize(stmt.row_count()?)
        })
        .await?
    }

    async fn execute_procedure(
        &self,
        request: CommandRequest,
        call: ProcedureCall,
    ) -> Result<ProcedureOutcome, DalError> {
        // coerce everything up front so bad values fail before connecting
        let (block, ordered) = {
            let plan = call.plan(request.parameters())?;
            let mut ordered = Vec::new();
            for param in plan.parameters() {
                let value = OracleValue::from_parameter(param)?;
                let out = if param.direction().is_output() {
                    Some(out_type(param)?)
                } else {
                    None
                };
                ordered.push((param.clone(), value, out));
            }
            (plsql_block(&plan), ordered)
        };

        tokio::task::spawn_blocking(move || {
            let session = connect(&request)?;
            let mut stmt = session.conn.statement(&block).build()?;
            for (idx, (param, value, out)) in ordered.iter().enumerate() {
                let position = idx + 1;
                match (param.direction(), out) {
                    (ParameterDirection::InputOutput, Some(out)) => {
                        value.bind_in_out(&mut stmt, position, out)?;
                    }
                    (_, Some(out)) => stmt.bind(position, out)?,
                    (_, None) => stmt.bind(position, value.as_to_sql())?,
                }
            }
            stmt.execute(&[])?;

            let mut outcome = ProcedureOutcome {
                rows_affected: rows_to_usize(stmt.row_count()?)?,
                ..ProcedureOutcome::default()
            };
            for (idx, (param, _, out)) in ordered.iter().enumerate() {
                if out.is_none() {
                    continue;
                }
                let value = read_output(&stmt, idx + 1, param)?;
                if param.direction() == ParameterDirection::ReturnValue {
                    outcome.return_value = Some(value);
                } else {
                    outcome.outputs.push((param.name().to_string(), value));
                }
            }
            Ok::<_, DalError>(outcome)
        })
        .await?
    }
}

/// Feed the reader, then hold the connection until the reader lets go.
///
/// Errors returned from here happened before the columns were announced.
fn stream_rows(
    session: &OracleSession,
    sql: &str,
    values: &[OracleValue],
    sink: &mut RowSink,
) -> Result<(), DalError> {
    let sql = translate_placeholders(sql, PlaceholderStyle::Colon);
    let mut stmt = session.conn.statement(&sql).build()?;
    let mut rows = stmt.query(&to_sql_refs(values))?;
    let columns = column_names(&rows);

    // fetch the first row so execution errors reach the caller of the open
    let first = match rows.next() {
        Some(row) => Some(extract_row(&row?)?),
        None => None,
    };
    if !sink.announce(columns) {
        return Ok(());
    }

    if let Some(first) = first {
        if sink.blocking_push(Ok(first)) {
            for row in rows.by_ref() {
                let next = row.map_err(DalError::from).and_then(|row| extract_row(&row));
                let failed = next.is_err();
                if !sink.blocking_push(next) || failed {
                    break;
                }
            }
        }
    }
    sink.blocking_wait_release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DbParameter;
    use crate::types::{DbType, DbValue};

    fn param(name: &str, direction: ParameterDirection) -> DbParameter {
        DbParameter::new(Provider::Oracle, name, DbType::Int32, 0, DbValue::Null, direction)
            .unwrap()
    }

    #[test]
    fn blocks_number_binds_from_the_return_slot() {
        let call = ProcedureCall::parse("{? = CALL pkg.next_id(?, 'x', ?)}").unwrap();
        let params = vec![
            param("a", ParameterDirection::Input),
            param("b", ParameterDirection::Output),
            param("rv", ParameterDirection::ReturnValue),
        ];
        let plan = call.plan(&params).unwrap();
        assert_eq!(plsql_block(&plan), "BEGIN :1 := pkg.next_id(:2, 'x', :3); END;");

        let call = ProcedureCall::parse("audit.flush").unwrap();
        let plan = call.plan(&[]).unwrap();
        assert_eq!(plsql_block(&plan), "BEGIN audit.flush; END;");
    }
}
