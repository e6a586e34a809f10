//! The caller-facing view of one response.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use viewwire_protocol::{RequestKind, ResponseStatus};

use crate::emitter::{Outcome, RowHandle, RowStream};
use crate::error::CodecError;
use crate::json::ResponseMeta;
use crate::row::Row;

/// Values the decoder learns after the header has been delivered.
#[derive(Debug, Default)]
pub(crate) struct ResponseInfo {
    pub total_rows: OnceCell<u64>,
    pub meta: OnceCell<ResponseMeta>,
}

/// A response in flight or finished.
///
/// Handed out when the header arrives. Rows become readable through
/// [`rows`](Self::rows) as they are decoded; the status stays
/// [`ResponseStatus::Chunked`] until the row sequence ends.
#[derive(Debug, Clone)]
pub struct ViewResponse {
    request_id: u64,
    kind: RequestKind,
    status_code: u16,
    rows: RowHandle,
    info: Arc<ResponseInfo>,
}

impl ViewResponse {
    pub(crate) fn new(
        request_id: u64,
        kind: RequestKind,
        status_code: u16,
        rows: RowHandle,
        info: Arc<ResponseInfo>,
    ) -> Self {
        Self {
            request_id,
            kind,
            status_code,
            rows,
            info,
        }
    }

    /// Id of the request this response answers, as returned by the encoder.
    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Which decode path produced this response.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// HTTP status code from the header.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Current status.
    ///
    /// `Chunked` while rows are still streaming, the mapped status code once
    /// they completed, `Failure` if decoding failed.
    #[must_use]
    pub fn status(&self) -> ResponseStatus {
        match self.rows.outcome() {
            None => ResponseStatus::Chunked,
            Some(Outcome::Completed) => ResponseStatus::from_code(self.status_code),
            Some(Outcome::Failed(_)) => ResponseStatus::Failure,
        }
    }

    /// Row count announced by a view response.
    ///
    /// `None` until the preamble has been parsed, and always `None` for raw
    /// queries, which do not announce a count.
    #[must_use]
    pub fn total_rows(&self) -> Option<u64> {
        self.info.total_rows.get().copied()
    }

    /// Metadata from outside the row section, once the body is complete.
    #[must_use]
    pub fn meta(&self) -> Option<&ResponseMeta> {
        self.info.meta.get()
    }

    /// A stream over all rows, starting from the first.
    #[must_use]
    pub fn rows(&self) -> RowStream {
        self.rows.subscribe()
    }

    /// The underlying row handle.
    #[must_use]
    pub fn row_handle(&self) -> &RowHandle {
        &self.rows
    }

    /// How the row sequence ended, if it has.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.rows.outcome()
    }

    /// Check if the row sequence has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.rows.outcome().is_some()
    }

    /// Wait for the response to finish and return all of its rows.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the decode cycle.
    pub async fn collect_rows(&self) -> Result<Vec<Row>, CodecError> {
        self.rows().collect_rows().await
    }
}
