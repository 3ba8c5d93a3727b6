use async_trait::async_trait;
use futures_util::TryStreamExt;
use tiberius::{Query, QueryItem};

use crate::connector::{Backend, CommandRequest};
use crate::error::DalError;
use crate::procedure::ProcedureCall;
use crate::reader::{DataReader, RowSink, reader_channel};
use crate::results::{DataSet, ProcedureOutcome};
use crate::types::Provider;

use super::client::{MssqlSession, connect};
use super::params::bind_parameter;
use super::procedure::{ProcedureBatch, input_only_batch};
use super::query::{build_query, collect_data_set, column_names, extract_row};

/// SQL Server through `tiberius`.
///
/// The connection string is in ADO.NET form
/// (`Server=tcp:host,1433;Database=…;User Id=…;Password=…`). `?` placeholders
/// are rewritten to `@P1`, `@P2`, ….
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerBackend;

fn rows_to_usize(total: u64) -> Result<usize, DalError> {
    usize::try_from(total)
        .map_err(|_| DalError::ExecutionError(format!("row count {total} does not fit in usize")))
}

#[async_trait]
impl Backend for SqlServerBackend {
    fn provider(&self) -> Option<Provider> {
        Some(Provider::SqlServer)
    }

    async fn open_reader(&self, request: CommandRequest) -> Result<DataReader, DalError> {
        let query = build_query(request.command_text(), request.parameters())?;
        let (mut sink, pending) = reader_channel(Provider::SqlServer);
        tokio::spawn(async move {
            let mut session = match connect(&request).await {
                Ok(session) => session,
                Err(err) => {
                    sink.fail(err);
                    return;
                }
            };
            if let Err(err) = stream_rows(&mut session, query, &mut sink).await {
                sink.fail(err);
            }
            drop(session);
            drop(sink);
        });
        pending.wait().await
    }

    async fn fill_data_set(&self, request: CommandRequest) -> Result<DataSet, DalError> {
        let query = build_query(request.command_text(), request.parameters())?;
        let mut session = connect(&request).await?;
        let stream = query.query(&mut session.client).await?;
        collect_data_set(stream).await
    }

    async fn execute_non_query(&self, request: CommandRequest) -> Result<usize, DalError> {
        let query = build_query(request.command_text(), request.parameters())?;
        let mut session = connect(&request).await?;
        let result = query.execute(&mut session.client).await?;
        rows_to_usize(result.rows_affected().iter().sum())
    }

    async fn execute_procedure(
        &self,
        request: CommandRequest,
        call: ProcedureCall,
    ) -> Result<ProcedureOutcome, DalError> {
        let plan = call.plan(request.parameters())?;

        if plan.is_input_only() {
            let mut query = Query::new(input_only_batch(&plan));
            for param in plan.parameters() {
                bind_parameter(&mut query, param)?;
            }
            let mut session = connect(&request).await?;
            let result = query.execute(&mut session.client).await?;
            return Ok(ProcedureOutcome {
                rows_affected: rows_to_usize(result.rows_affected().iter().sum())?,
                ..ProcedureOutcome::default()
            });
        }

        let batch = ProcedureBatch::build(&plan)?;
        let mut query = Query::new(batch.sql.clone());
        for param in &batch.binds {
            bind_parameter(&mut query, param)?;
        }
        let mut session = connect(&request).await?;
        let stream = query.query(&mut session.client).await?;
        let results = collect_data_set(stream).await?;
        batch.outcome(&results)
    }
}

/// Feed the reader from the first result of the batch, then hold the
/// connection until the reader lets go.
///
/// Errors returned from here happened before the columns were announced.
async fn stream_rows(
    session: &mut MssqlSession,
    query: Query<'static>,
    sink: &mut RowSink,
) -> Result<(), DalError> {
    let mut stream = query.query(&mut session.client).await?;

    // skip statements without a result until the first column metadata
    let columns = loop {
        match stream.try_next().await? {
            Some(QueryItem::Metadata(metadata)) => break column_names(&metadata),
            Some(QueryItem::Row(_)) => {}
            None => break Vec::new(),
        }
    };
    // fetch the first row so statement errors reach the caller of the open
    let first = match stream.try_next().await? {
        Some(QueryItem::Row(row)) => Some(extract_row(row)?),
        Some(QueryItem::Metadata(_)) | None => None,
    };
    if !sink.announce(columns) {
        return Ok(());
    }

    if let Some(first) = first {
        if sink.push(Ok(first)).await {
            loop {
                let next = match stream.try_next().await {
                    Ok(Some(QueryItem::Row(row))) => extract_row(row),
                    // later results are not part of this reader
                    Ok(Some(QueryItem::Metadata(_)) | None) => break,
                    Err(err) => Err(err.into()),
                };
                let failed = next.is_err();
                if !sink.push(next).await || failed {
                    break;
                }
            }
        }
    }
    sink.wait_release().await;
    drop(stream);
    Ok(())
}
