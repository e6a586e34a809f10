//! Events delivered by the HTTP transport.

use bytes::Bytes;

/// One step of an HTTP response as seen by the decoder.
///
/// A well-behaved transport produces, per response, one `Header`, zero or
/// more `Body` chunks and exactly one `FinalBody` (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Status line received.
    Header {
        /// HTTP status code.
        status: u16,
    },
    /// A body chunk that is not the last.
    Body(Bytes),
    /// The last body chunk.
    FinalBody(Bytes),
    /// The transport gave up on the current response.
    Aborted {
        /// Why, for diagnostics.
        reason: String,
    },
}

impl TransportEvent {
    /// A header event.
    #[must_use]
    pub fn header(status: u16) -> Self {
        Self::Header { status }
    }

    /// A non-final body chunk.
    pub fn body(chunk: impl Into<Bytes>) -> Self {
        Self::Body(chunk.into())
    }

    /// The final body chunk.
    pub fn final_body(chunk: impl Into<Bytes>) -> Self {
        Self::FinalBody(chunk.into())
    }

    /// An abort event.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Header { .. } => "header",
            Self::Body(_) => "body",
            Self::FinalBody(_) => "final_body",
            Self::Aborted { .. } => "aborted",
        }
    }
}
