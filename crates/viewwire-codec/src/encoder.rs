//! Request encoding with response correlation.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;
use viewwire_protocol::{EncodeOptions, Request, encode_request};

use crate::error::CodecError;
use crate::pending::{PendingEntry, PendingRequestQueue};

/// Encodes requests and registers each one with the pending queue.
///
/// Registration happens only after a request encoded successfully, so a
/// rejected request never consumes a response. Callers sharing one encoder
/// must write the produced bytes to the connection in the order the entries
/// were returned; the decoder matches responses to entries strictly FIFO.
#[derive(Debug, Clone)]
pub struct RequestEncoder {
    queue: Arc<PendingRequestQueue>,
    options: EncodeOptions,
}

impl RequestEncoder {
    /// Create an encoder that registers requests with `queue`.
    #[must_use]
    pub fn new(queue: Arc<PendingRequestQueue>, options: EncodeOptions) -> Self {
        Self { queue, options }
    }

    /// The queue this encoder pushes to.
    #[must_use]
    pub fn queue(&self) -> &Arc<PendingRequestQueue> {
        &self.queue
    }

    /// The options applied to every request.
    #[must_use]
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Append the HTTP form of `request` to `dst` and register it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encoding`] if the request is invalid; `dst` and
    /// the queue are left untouched.
    pub fn write_request(
        &self,
        request: &Request,
        dst: &mut BytesMut,
    ) -> Result<PendingEntry, CodecError> {
        let http = encode_request(request, &self.options)?;
        http.encode(dst);

        let entry = self.queue.push(request.kind());
        tracing::debug!(
            id = entry.id,
            method = %http.method(),
            path = http.path(),
            "request encoded"
        );
        Ok(entry)
    }

    /// Encode `request` into a fresh buffer and register it.
    ///
    /// # Errors
    ///
    /// See [`write_request`](Self::write_request).
    pub fn encode_to_bytes(&self, request: &Request) -> Result<(Bytes, PendingEntry), CodecError> {
        let mut dst = BytesMut::new();
        let entry = self.write_request(request, &mut dst)?;
        Ok((dst.freeze(), entry))
    }
}

impl Encoder<Request> for RequestEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write_request(&item, dst).map(|_| ())
    }
}
