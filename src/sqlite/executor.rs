use async_trait::async_trait;
use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::connector::{Backend, CommandRequest};
use crate::error::DalError;
use crate::procedure::ProcedureCall;
use crate::reader::{DataReader, RowSink, spawn_reader_thread};
use crate::results::{DataSet, ProcedureOutcome};
use crate::types::Provider;

use super::client::{SqliteSession, open};
use super::params::bind_values;
use super::query::{build_data_set, column_names, extract_row, query};

/// Embedded `SQLite` databases through `rusqlite`.
///
/// The connection string is a file path, a `file:` URI or a string with a
/// `Data Source=` key. Placeholders are `SQLite`'s own `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

#[async_trait]
impl Backend for SqliteBackend {
    fn provider(&self) -> Option<Provider> {
        Some(Provider::Sqlite)
    }

    async fn open_reader(&self, request: CommandRequest) -> Result<DataReader, DalError> {
        let values = bind_values(request.parameters())?;
        let pending = spawn_reader_thread(Provider::Sqlite, move |mut sink| {
            let session = match open(&request) {
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
            let session = open(&request)?;
            build_data_set(&session.conn, request.command_text(), &values)
        })
        .await?
    }

    async fn execute_non_query(&self, request: CommandRequest) -> Result<usize, DalError> {
        let values = bind_values(request.parameters())?;
        tokio::task::spawn_blocking(move || {
            let session = open(&request)?;
            let affected = session
                .conn
                .execute(request.command_text(), params_from_iter(values.iter()))?;
            Ok::<_, DalError>(affected)
        })
        .await?
    }

    async fn execute_procedure(
        &self,
        _request: CommandRequest,
        call: ProcedureCall,
    ) -> Result<ProcedureOutcome, DalError> {
        Err(DalError::Unimplemented(format!(
            "SQLite has no stored procedures (called {})",
            call.name()
        )))
    }
}

/// Feed the reader until the rows run out, then hold the connection until
/// the reader lets go.
///
/// Errors returned from here happened before the columns were announced.
fn stream_rows(
    session: &SqliteSession,
    sql: &str,
    values: &[Value],
    sink: &mut RowSink,
) -> Result<(), DalError> {
    let mut stmt = session.conn.prepare(sql)?;
    let columns = column_names(&stmt);
    let column_count = columns.len();
    let mut rows = query(&mut stmt, values)?;

    // fetch the first row so statement errors reach the caller of the open
    let first = match rows.next()? {
        Some(row) => Some(extract_row(row, column_count)?),
        None => None,
    };
    if !sink.announce(columns) {
        return Ok(());
    }

    if let Some(first) = first {
        if sink.blocking_push(Ok(first)) {
            loop {
                let next = match rows.next() {
                    Ok(Some(row)) => extract_row(row, column_count),
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
