//! Replayable row delivery.
//!
//! The decoder pushes rows into a [`RowEmitter`] as soon as they are framed;
//! callers read them through [`RowStream`]s obtained from a [`RowHandle`].
//! Every row is kept in a replay log, so a stream created after some (or
//! all) rows were emitted still sees the whole history, in order, exactly
//! once, followed by the terminal event.
//!
//! The log, the terminal flag and the parked wakers share one lock. A stream
//! that finds nothing new registers its waker under that lock, and the
//! producer wakes everyone after appending under it, so no row or terminal
//! signal can slip between a check and a park.
//!
//! Backpressure is not propagated: a slow consumer only grows the replay log.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures_core::Stream;
use parking_lot::Mutex;

use crate::error::CodecError;
use crate::row::Row;

/// How a row sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All rows were delivered.
    Completed,
    /// The decode cycle failed; rows emitted before the failure stay valid.
    Failed(CodecError),
}

#[derive(Debug, Default)]
struct ReplayLog {
    rows: Vec<Row>,
    outcome: Option<Outcome>,
    wakers: Vec<Waker>,
}

impl ReplayLog {
    fn take_wakers(&mut self) -> Vec<Waker> {
        std::mem::take(&mut self.wakers)
    }
}

#[derive(Debug, Default)]
struct Shared {
    log: Mutex<ReplayLog>,
}

/// Producer side of a row sequence.
///
/// Owned by exactly one decode cycle. Dropping an emitter that has not
/// terminated fails the sequence so that readers are never left waiting.
#[derive(Debug)]
pub struct RowEmitter {
    shared: Arc<Shared>,
}

impl RowEmitter {
    /// Create an emitter with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    /// A read-only handle that can create any number of streams.
    #[must_use]
    pub fn handle(&self) -> RowHandle {
        RowHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Append a row and wake waiting readers.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmitterMisuse`] if the sequence already ended.
    pub fn emit(&self, row: Row) -> Result<(), CodecError> {
        let wakers = {
            let mut log = self.shared.log.lock();
            if log.outcome.is_some() {
                return Err(CodecError::EmitterMisuse("row emitted after terminal signal"));
            }
            log.rows.push(row);
            log.take_wakers()
        };
        wakers.into_iter().for_each(Waker::wake);
        Ok(())
    }

    /// End the sequence successfully.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmitterMisuse`] if the sequence already ended.
    pub fn complete(&self) -> Result<(), CodecError> {
        self.terminate(Outcome::Completed)
    }

    /// End the sequence with an error.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EmitterMisuse`] if the sequence already ended.
    pub fn fail(&self, error: CodecError) -> Result<(), CodecError> {
        self.terminate(Outcome::Failed(error))
    }

    /// Check if a terminal signal has been issued.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.shared.log.lock().outcome.is_some()
    }

    /// Number of rows emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.shared.log.lock().rows.len()
    }

    fn terminate(&self, outcome: Outcome) -> Result<(), CodecError> {
        let wakers = {
            let mut log = self.shared.log.lock();
            if log.outcome.is_some() {
                return Err(CodecError::EmitterMisuse("terminal signal issued twice"));
            }
            log.outcome = Some(outcome);
            log.take_wakers()
        };
        wakers.into_iter().for_each(Waker::wake);
        Ok(())
    }
}

impl Default for RowEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RowEmitter {
    fn drop(&mut self) {
        if !self.is_terminated() {
            tracing::debug!("row emitter dropped before a terminal signal");
            let _ = self.fail(CodecError::Aborted("row emitter dropped".into()));
        }
    }
}

/// Read-only access to a row sequence.
#[derive(Debug, Clone)]
pub struct RowHandle {
    shared: Arc<Shared>,
}

impl RowHandle {
    /// Create a stream that replays every row from the start.
    #[must_use]
    pub fn subscribe(&self) -> RowStream {
        RowStream {
            shared: Arc::clone(&self.shared),
            cursor: 0,
            finished: false,
        }
    }

    /// The terminal outcome, if the sequence has ended.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.shared.log.lock().outcome.clone()
    }

    /// Number of rows emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.shared.log.lock().rows.len()
    }

    /// The rows emitted so far, without waiting.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Row> {
        self.shared.log.lock().rows.clone()
    }
}

/// A forward-only view over a row sequence.
///
/// Yields every emitted row once, then `Some(Err(_))` if the sequence failed,
/// then `None`.
#[derive(Debug)]
pub struct RowStream {
    shared: Arc<Shared>,
    cursor: usize,
    finished: bool,
}

impl RowStream {
    /// Wait for the next row.
    pub async fn next_row(&mut self) -> Option<Result<Row, CodecError>> {
        poll_fn(|cx| self.poll_row(cx)).await
    }

    /// Wait for the sequence to end and return every row.
    ///
    /// # Errors
    ///
    /// Returns the failure the sequence ended with, if any.
    pub async fn collect_rows(mut self) -> Result<Vec<Row>, CodecError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Rows emitted but not yet yielded by this stream.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.log.lock().rows.len().saturating_sub(self.cursor)
    }

    fn poll_row(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Row, CodecError>>> {
        if self.finished {
            return Poll::Ready(None);
        }

        let mut log = self.shared.log.lock();
        if let Some(row) = log.rows.get(self.cursor) {
            self.cursor += 1;
            return Poll::Ready(Some(Ok(row.clone())));
        }

        match &log.outcome {
            Some(Outcome::Completed) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Some(Outcome::Failed(error)) => {
                self.finished = true;
                Poll::Ready(Some(Err(error.clone())))
            }
            None => {
                if !log.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    log.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl Stream for RowStream {
    type Item = Result<Row, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_row(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use futures_util::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::error::{MalformedKind, ViolationKind};

    fn row(text: &'static str) -> Row {
        Row::new(Bytes::from_static(text.as_bytes()))
    }

    fn texts(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_late_subscriber_replays_everything() {
        let emitter = RowEmitter::new();
        emitter.emit(row("{\"a\":1}")).unwrap();
        emitter.emit(row("{\"b\":2}")).unwrap();
        emitter.complete().unwrap();

        let handle = emitter.handle();
        let rows = handle.subscribe().collect_rows().await.unwrap();
        assert_eq!(texts(&rows), ["{\"a\":1}", "{\"b\":2}"]);

        // A second subscriber sees the same history.
        let again = handle.subscribe().collect_rows().await.unwrap();
        assert_eq!(rows, again);
        assert_eq!(handle.outcome(), Some(Outcome::Completed));
    }

    #[tokio::test]
    async fn test_live_and_replayed_rows_delivered_once() {
        let emitter = RowEmitter::new();
        emitter.emit(row("{\"a\":1}")).unwrap();

        let mut stream = emitter.handle().subscribe();
        assert_eq!(stream.pending(), 1);
        let first = stream.next_row().await.unwrap().unwrap();
        assert_eq!(first.as_str().unwrap(), "{\"a\":1}");

        emitter.emit(row("{\"b\":2}")).unwrap();
        emitter.complete().unwrap();

        let second = stream.next_row().await.unwrap().unwrap();
        assert_eq!(second.as_str().unwrap(), "{\"b\":2}");
        assert!(stream.next_row().await.is_none());
        assert!(stream.next_row().await.is_none());
    }

    #[test]
    fn test_pending_stream_is_woken_by_emit() {
        let emitter = RowEmitter::new();
        let mut stream = task::spawn(emitter.handle().subscribe());

        assert_pending!(stream.poll_next());
        emitter.emit(row("{}")).unwrap();
        assert!(stream.is_woken());

        let item = assert_ready!(stream.poll_next());
        assert_eq!(item.unwrap().unwrap().as_bytes(), b"{}");

        assert_pending!(stream.poll_next());
        emitter.complete().unwrap();
        assert!(stream.is_woken());
        assert!(assert_ready!(stream.poll_next()).is_none());
    }

    #[tokio::test]
    async fn test_failure_after_rows() {
        let emitter = RowEmitter::new();
        emitter.emit(row("{\"a\":1}")).unwrap();
        emitter
            .fail(CodecError::MalformedPayload(MalformedKind::TruncatedResponse))
            .unwrap();

        let mut stream = emitter.handle().subscribe();
        assert!(stream.next_row().await.unwrap().is_ok());
        let err = stream.next_row().await.unwrap().unwrap_err();
        assert_eq!(err, CodecError::MalformedPayload(MalformedKind::TruncatedResponse));
        assert!(stream.next_row().await.is_none());

        let err = emitter.handle().subscribe().collect_rows().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedPayload);
        assert_eq!(texts(&emitter.handle().snapshot()), ["{\"a\":1}"]);
    }

    #[test]
    fn test_double_terminal_is_misuse() {
        let emitter = RowEmitter::new();
        emitter.complete().unwrap();

        let err = emitter.complete().unwrap_err();
        assert!(matches!(err, CodecError::EmitterMisuse(_)));
        let err = emitter
            .fail(CodecError::ProtocolViolation(ViolationKind::BodyWithoutHeader))
            .unwrap_err();
        assert!(matches!(err, CodecError::EmitterMisuse(_)));
        let err = emitter.emit(row("{}")).unwrap_err();
        assert!(matches!(err, CodecError::EmitterMisuse(_)));

        // The first outcome is kept.
        assert_eq!(emitter.handle().outcome(), Some(Outcome::Completed));
    }

    #[tokio::test]
    async fn test_drop_without_terminal_fails_sequence() {
        let emitter = RowEmitter::new();
        let handle = emitter.handle();
        emitter.emit(row("{}")).unwrap();
        drop(emitter);

        assert!(matches!(handle.outcome(), Some(Outcome::Failed(CodecError::Aborted(_)))));
        let err = handle.subscribe().collect_rows().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_cross_task_delivery() {
        let emitter = RowEmitter::new();
        let handle = emitter.handle();

        let consumer = tokio::spawn(async move {
            let stream = handle.subscribe();
            stream.map(|r| r.unwrap().len()).collect::<Vec<_>>().await
        });

        for _ in 0..100 {
            emitter.emit(row("{\"k\":1}")).unwrap();
            tokio::task::yield_now().await;
        }
        emitter.complete().unwrap();

        let lens = consumer.await.unwrap();
        assert_eq!(lens.len(), 100);
        assert!(lens.iter().all(|&len| len == 7));
    }
}
