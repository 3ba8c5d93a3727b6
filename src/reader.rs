//! Streaming reader over a connection owned by a worker.
//!
//! Driver cursors borrow their statement or client, so the connection, the
//! statement and the cursor all live on a worker (an OS thread for the
//! synchronous drivers, a task for `tiberius`). The worker announces the
//! column names once the first row has been fetched, then sends rows through a
//! bounded channel. It holds the connection until the [`DataReader`] is closed
//! or dropped.

use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::DalError;
use crate::results::{DataRow, RowShape};
use crate::types::{DbValue, Provider};

/// Rows buffered between the worker and the reader.
const ROW_BUFFER: usize = 64;

type RowMessage = Result<Vec<DbValue>, DalError>;

/// Build the two ends of a reader.
pub(crate) fn reader_channel(provider: Provider) -> (RowSink, PendingReader) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (rows_tx, rows_rx) = mpsc::channel(ROW_BUFFER);
    let (release_tx, release_rx) = oneshot::channel();
    let (finished_tx, finished_rx) = oneshot::channel();
    (
        RowSink {
            ready: Some(ready_tx),
            rows: Some(rows_tx),
            release: Some(release_rx),
            _finished: finished_tx,
        },
        PendingReader {
            provider,
            ready: ready_rx,
            rows: rows_rx,
            release: release_tx,
            finished: finished_rx,
        },
    )
}

/// Run `work` on a named thread that feeds a reader.
///
/// `work` must drop its connection before returning; the sink goes last so
/// the reader's `close` observes the release.
pub(crate) fn spawn_reader_thread<F>(provider: Provider, work: F) -> Result<PendingReader, DalError>
where
    F: FnOnce(RowSink) + Send + 'static,
{
    let (sink, pending) = reader_channel(provider);
    thread::Builder::new()
        .name(format!("{provider}-reader"))
        .spawn(move || work(sink))
        .map_err(|err| {
            DalError::ConnectionError(format!("failed to spawn {provider} reader thread: {err}"))
        })?;
    Ok(pending)
}

/// Worker half of a reader.
pub(crate) struct RowSink {
    ready: Option<oneshot::Sender<Result<Vec<String>, DalError>>>,
    // taken when the result is complete so the reader sees the end
    rows: Option<mpsc::Sender<RowMessage>>,
    release: Option<oneshot::Receiver<()>>,
    // dropped with the sink; the reader waits for that in `close`
    _finished: oneshot::Sender<()>,
}

impl RowSink {
    /// Report the result's columns. Returns false if nobody is waiting.
    pub(crate) fn announce(&mut self, columns: Vec<String>) -> bool {
        match self.ready.take() {
            Some(ready) => ready.send(Ok(columns)).is_ok(),
            None => self.rows.as_ref().is_some_and(|rows| !rows.is_closed()),
        }
    }

    /// Report a failure that happened before the columns were announced.
    ///
    /// Later failures go through [`push`](Self::push) so they are not lost
    /// when the buffer is full.
    pub(crate) fn fail(&mut self, err: DalError) {
        match self.ready.take() {
            Some(ready) => {
                let _ = ready.send(Err(err));
            }
            None => {
                if let Some(rows) = &self.rows {
                    let _ = rows.try_send(Err(err));
                }
            }
        }
    }

    /// Send a row from a synchronous worker. Returns false once the reader is gone.
    pub(crate) fn blocking_push(&self, row: RowMessage) -> bool {
        self.rows
            .as_ref()
            .is_some_and(|rows| rows.blocking_send(row).is_ok())
    }

    /// Send a row from an async worker. Returns false once the reader is gone.
    pub(crate) async fn push(&self, row: RowMessage) -> bool {
        match &self.rows {
            Some(rows) => rows.send(row).await.is_ok(),
            None => false,
        }
    }

    /// End the result, then block until the reader is closed or dropped.
    pub(crate) fn blocking_wait_release(&mut self) {
        self.rows = None;
        if let Some(release) = self.release.take() {
            let _ = release.blocking_recv();
        }
    }

    /// End the result, then wait until the reader is closed or dropped.
    pub(crate) async fn wait_release(&mut self) {
        self.rows = None;
        if let Some(release) = self.release.take() {
            let _ = release.await;
        }
    }
}

/// Reader half before the worker has reported the columns.
pub(crate) struct PendingReader {
    provider: Provider,
    ready: oneshot::Receiver<Result<Vec<String>, DalError>>,
    rows: mpsc::Receiver<RowMessage>,
    release: oneshot::Sender<()>,
    finished: oneshot::Receiver<()>,
}

impl PendingReader {
    /// Wait for the worker to open the result.
    ///
    /// On failure the worker's connection is closed before the error is returned.
    pub(crate) async fn wait(self) -> Result<DataReader, DalError> {
        let PendingReader {
            provider,
            ready,
            rows,
            release,
            finished,
        } = self;
        let outcome = ready.await;
        match outcome {
            Ok(Ok(columns)) => {
                debug!(%provider, columns = columns.len(), "reader opened");
                Ok(DataReader {
                    provider,
                    shape: RowShape::new(columns),
                    rows: Some(rows),
                    release: Some(release),
                    finished: Some(finished),
                    exhausted: false,
                })
            }
            Ok(Err(err)) => {
                drop(rows);
                drop(release);
                let _ = finished.await;
                Err(err)
            }
            Err(_) => {
                drop(rows);
                drop(release);
                let _ = finished.await;
                Err(DalError::ConnectionError(format!(
                    "{provider} reader worker stopped before producing a result"
                )))
            }
        }
    }
}

/// Forward-only reader that owns an open connection.
///
/// The connection is released by [`close`](Self::close) or, without waiting,
/// when the reader is dropped.
#[derive(Debug)]
pub struct DataReader {
    provider: Provider,
    shape: RowShape,
    rows: Option<mpsc::Receiver<RowMessage>>,
    release: Option<oneshot::Sender<()>>,
    finished: Option<oneshot::Receiver<()>>,
    exhausted: bool,
}

impl DataReader {
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.shape.columns()
    }

    /// Index of a column by name.
    #[must_use]
    pub fn ordinal(&self, column_name: &str) -> Option<usize> {
        self.shape.position(column_name)
    }

    /// Next row, or `None` after the last one.
    ///
    /// # Errors
    /// Returns the driver error that stopped the result; the reader is
    /// exhausted afterwards.
    pub async fn next_row(&mut self) -> Result<Option<DataRow>, DalError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        match rows.recv().await {
            Some(Ok(values)) => Ok(Some(DataRow::new(self.shape.clone(), values))),
            Some(Err(err)) => {
                self.exhausted = true;
                Err(err)
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Read every remaining row.
    ///
    /// # Errors
    /// Stops at the first driver error.
    pub async fn read_to_end(&mut self) -> Result<Vec<DataRow>, DalError> {
        let mut out = Vec::new();
        while let Some(row) = self.next_row().await? {
            out.push(row);
        }
        Ok(out)
    }

    /// Release the connection and wait until it is closed.
    pub async fn close(mut self) {
        drop(self.rows.take());
        if let Some(release) = self.release.take() {
            let _ = release.send(());
        }
        if let Some(finished) = self.finished.take() {
            let _ = finished.await;
        }
        debug!(provider = %self.provider, "reader closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rows_flow_until_close() {
        let pending = spawn_reader_thread(Provider::Sqlite, |mut sink| {
            assert!(sink.announce(vec!["n".into()]));
            for n in 0..3 {
                if !sink.blocking_push(Ok(vec![DbValue::Int(n)])) {
                    break;
                }
            }
            sink.blocking_wait_release();
        })
        .unwrap();

        let mut reader = pending.wait().await.unwrap();
        assert_eq!(reader.columns(), ["n"]);
        let rows = reader.read_to_end().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("n"), Some(&DbValue::Int(2)));
        assert!(reader.next_row().await.unwrap().is_none());
        reader.close().await;
    }

    #[tokio::test]
    async fn failure_before_columns_surfaces_from_wait() {
        let pending = spawn_reader_thread(Provider::Sqlite, |mut sink| {
            sink.fail(DalError::ExecutionError("no such table".into()));
        })
        .unwrap();
        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, DalError::ExecutionError(ref m) if m == "no such table"));
    }

    #[tokio::test]
    async fn dropping_the_reader_unblocks_the_worker() {
        let (done_tx, done_rx) = oneshot::channel();
        let pending = spawn_reader_thread(Provider::Sqlite, move |mut sink| {
            sink.announce(vec!["n".into()]);
            let mut n = 0;
            while sink.blocking_push(Ok(vec![DbValue::Int(n)])) {
                n += 1;
            }
            sink.blocking_wait_release();
            let _ = done_tx.send(n);
        })
        .unwrap();

        let mut reader = pending.wait().await.unwrap();
        assert!(reader.next_row().await.unwrap().is_some());
        drop(reader);
        let pushed = done_rx.await.unwrap();
        assert!(pushed >= 1);
    }
}
