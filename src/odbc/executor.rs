use async_trait::async_trait;
use odbc_api::Cursor;

use crate::connector::{Backend, CommandRequest};
use crate::error::DalError;
use crate::params::require_input_only;
use crate::procedure::{CallArgument, CallPlan, ProcedureCall};
use crate::reader::{DataReader, RowSink, spawn_reader_thread};
use crate::results::{DataSet, ProcedureOutcome};
use crate::types::Provider;

use super::client::{OdbcSession, connect};
use super::params::{OdbcParams, bind_params};
use super::query::{collect_data_set, describe, extract_row};

/// Any ODBC data source through `odbc-api`.
///
/// The connection string goes to the driver manager unchanged. Placeholders
/// are ODBC's own `?`, and `{CALL …}` escapes are understood by the driver.
/// Only input parameters are supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdbcBackend;

/// Execute a statement that may not return rows; the affected count if it doesn't.
fn execute_counted(session: &OdbcSession, sql: &str, params: &OdbcParams) -> Result<usize, DalError> {
    let mut prepared = session.conn.prepare(sql)?;
    let cursor = prepared.execute(params.as_slice())?;
    drop(cursor);
    Ok(prepared.row_count()?.unwrap_or(0))
}

/// `{CALL name(?, …)}` for a bare name; escapes pass through.
fn call_text(command_text: &str, call: &ProcedureCall, plan: &CallPlan<'_>) -> String {
    if ProcedureCall::parse_escape(command_text).is_some() {
        return command_text.to_string();
    }
    let arguments: Vec<&str> = plan
        .arguments
        .iter()
        .map(|argument| match argument {
            CallArgument::Parameter(_) => "?",
            CallArgument::Literal(text) => *text,
        })
        .collect();
    format!("{{CALL {}({})}}", call.name(), arguments.join(", "))
}

#[async_trait]
impl Backend for OdbcBackend {
    fn provider(&self) -> Option<Provider> {
        Some(Provider::Odbc)
    }

    async fn open_reader(&self, request: CommandRequest) -> Result<DataReader, DalError> {
        let pending = spawn_reader_thread(Provider::Odbc, move |mut sink| {
            // parameters are not `Send`, so they are built on the worker
            let params = match bind_params(request.parameters()) {
                Ok(params) => params,
                Err(err) => {
                    sink.fail(err);
                    return;
                }
            };
            let session = match connect(&request) {
                Ok(session) => session,
                Err(err) => {
                    sink.fail(err);
                    return;
                }
            };
            if let Err(err) = stream_rows(&session, request.command_text(), &params, &mut sink) {
                sink.fail(err);
            }
            drop(session);
        })?;
        pending.wait().await
    }

    async fn fill_data_set(&self, request: CommandRequest) -> Result<DataSet, DalError> {
        tokio::task::spawn_blocking(move || {
            let params = bind_params(request.parameters())?;
            let session = connect(&request)?;
            let mut prepared = session.conn.prepare(request.command_text())?;
            match prepared.execute(params.as_slice())? {
                Some(cursor) => collect_data_set(cursor),
                None => Ok(DataSet::new()),
            }
        })
        .await?
    }

    async fn execute_non_query(&self, request: CommandRequest) -> Result<usize, DalError> {
        tokio::task::spawn_blocking(move || {
            let params = bind_params(request.parameters())?;
            let session = connect(&request)?;
            execute_counted(&session, request.command_text(), &params)
        })
        .await?
    }

    async fn execute_procedure(
        &self,
        request: CommandRequest,
        call: ProcedureCall,
    ) -> Result<ProcedureOutcome, DalError> {
        require_input_only(request.parameters(), Provider::Odbc)?;
        let sql = {
            let plan = call.plan(request.parameters())?;
            call_text(request.command_text(), &call, &plan)
        };
        tokio::task::spawn_blocking(move || {
            let params = bind_params(request.parameters())?;
            let session = connect(&request)?;
            let rows_affected = execute_counted(&session, &sql, &params)?;
            Ok::<_, DalError>(ProcedureOutcome {
                rows_affected,
                ..ProcedureOutcome::default()
            })
        })
        .await?
    }
}

/// Feed the reader from the first result, then hold the connection until the
/// reader lets go.
///
/// Errors returned from here happened before the columns were announced.
fn stream_rows(
    session: &OdbcSession,
    sql: &str,
    params: &OdbcParams,
    sink: &mut RowSink,
) -> Result<(), DalError> {
    let mut prepared = session.conn.prepare(sql)?;
    let Some(mut cursor) = prepared.execute(params.as_slice())? else {
        // statements without a result set read as empty
        if sink.announce(Vec::new()) {
            sink.blocking_wait_release();
        }
        return Ok(());
    };
    let (columns, kinds) = describe(&mut cursor)?;
    let mut buf = Vec::new();

    // fetch the first row so execution errors reach the caller of the open
    let first = match cursor.next_row()? {
        Some(mut row) => Some(extract_row(&mut row, &kinds, &mut buf)?),
        None => None,
    };
    if !sink.announce(columns) {
        return Ok(());
    }

    if let Some(first) = first {
        if sink.blocking_push(Ok(first)) {
            loop {
                let next = match cursor.next_row() {
                    Ok(Some(mut row)) => extract_row(&mut row, &kinds, &mut buf),
                    Ok(None) => break,
                    Err(err) => Err(err.into()),
                };
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
