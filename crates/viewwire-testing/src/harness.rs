//! Drivers that feed transport events to a decoder.
//!
//! [`Harness`] drives an encoder/decoder pair synchronously and records
//! everything that crossed it. [`DecoderTask`] runs the decoder on its own
//! tokio task, the way a connection reader would.

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use viewwire_codec::{
    CodecConfig, CodecError, PendingEntry, RequestEncoder, StreamingDecoder, TransportEvent,
    ViewResponse, pair,
};
use viewwire_protocol::Request;

use crate::chunking::response_events;

/// Errors raised by the test drivers.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The codec rejected an event or a request.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A response script contained no header.
    #[error("response script produced no header")]
    NoHeader,
    /// The decoder task is gone.
    #[error("decoder task closed")]
    Closed,
    /// The decoder task panicked or was cancelled.
    #[error("decoder task failed: {0}")]
    Join(String),
}

/// Synchronous encoder/decoder driver.
#[derive(Debug)]
pub struct Harness {
    encoder: RequestEncoder,
    decoder: StreamingDecoder,
    outbound: BytesMut,
    recorded: Vec<TransportEvent>,
    responses: Vec<ViewResponse>,
    errors: Vec<CodecError>,
}

impl Harness {
    /// Create a harness with a fresh encoder/decoder pair.
    #[must_use]
    pub fn new(config: CodecConfig) -> Self {
        let (encoder, decoder) = pair(config);
        Self {
            encoder,
            decoder,
            outbound: BytesMut::new(),
            recorded: Vec::new(),
            responses: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Encode a request onto the simulated wire.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error for an invalid request.
    pub fn send(&mut self, request: impl Into<Request>) -> Result<PendingEntry, CodecError> {
        self.encoder.write_request(&request.into(), &mut self.outbound)
    }

    /// Feed one event and record it.
    ///
    /// # Errors
    ///
    /// Returns whatever the decoder returned; the error is also recorded.
    pub fn feed(&mut self, event: TransportEvent) -> Result<Option<ViewResponse>, CodecError> {
        self.recorded.push(event.clone());
        match self.decoder.handle(event) {
            Ok(Some(response)) => {
                self.responses.push(response.clone());
                Ok(Some(response))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                tracing::debug!(%error, "decoder rejected event");
                self.errors.push(error.clone());
                Err(error)
            }
        }
    }

    /// Deliver a complete response split into `chunks`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first decoder error.
    pub fn respond(&mut self, status: u16, chunks: Vec<Bytes>) -> Result<ViewResponse, HarnessError> {
        let mut response = None;
        for event in response_events(status, chunks) {
            if let Some(header) = self.feed(event)? {
                response = Some(header);
            }
        }
        response.ok_or(HarnessError::NoHeader)
    }

    /// Bytes written by [`send`](Self::send).
    #[must_use]
    pub fn outbound(&self) -> &[u8] {
        &self.outbound
    }

    /// Every event fed so far.
    #[must_use]
    pub fn recorded(&self) -> &[TransportEvent] {
        &self.recorded
    }

    /// Responses produced so far, in header order.
    #[must_use]
    pub fn responses(&self) -> &[ViewResponse] {
        &self.responses
    }

    /// Errors returned by the decoder so far.
    #[must_use]
    pub fn errors(&self) -> &[CodecError] {
        &self.errors
    }

    /// The encoder.
    #[must_use]
    pub fn encoder(&self) -> &RequestEncoder {
        &self.encoder
    }

    /// The decoder.
    #[must_use]
    pub fn decoder(&self) -> &StreamingDecoder {
        &self.decoder
    }

    /// Mutable access to the decoder.
    pub fn decoder_mut(&mut self) -> &mut StreamingDecoder {
        &mut self.decoder
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

/// A decoder running on a spawned task, fed through a channel.
///
/// Closing the event side makes the task abort whatever is still pending
/// and hand the decoder back.
#[derive(Debug)]
pub struct DecoderTask {
    events: mpsc::Sender<TransportEvent>,
    results: mpsc::UnboundedReceiver<Result<ViewResponse, CodecError>>,
    handle: JoinHandle<StreamingDecoder>,
}

impl DecoderTask {
    /// Spawn `decoder` on the current runtime.
    #[must_use]
    pub fn spawn(mut decoder: StreamingDecoder) -> Self {
        let (events, mut rx) = mpsc::channel::<TransportEvent>(64);
        let (results_tx, results) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let result = match decoder.handle(event) {
                    Ok(Some(response)) => Some(Ok(response)),
                    Ok(None) => None,
                    Err(error) => Some(Err(error)),
                };
                if let Some(result) = result {
                    // The receiver may be gone; decoding continues regardless.
                    let _ = results_tx.send(result);
                }
            }
            let dropped = decoder.abort_all("transport closed");
            tracing::debug!(dropped = dropped.len(), "decoder task finished");
            decoder
        });

        Self {
            events,
            results,
            handle,
        }
    }

    /// Send one event to the decoder.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Closed`] if the task has stopped.
    pub async fn send(&self, event: TransportEvent) -> Result<(), HarnessError> {
        self.events.send(event).await.map_err(|_| HarnessError::Closed)
    }

    /// Wait for the next response header or decoder error.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error, or [`HarnessError::Closed`] if the task
    /// stopped without producing anything further.
    pub async fn next_response(&mut self) -> Result<ViewResponse, HarnessError> {
        match self.results.recv().await {
            Some(result) => result.map_err(HarnessError::from),
            None => Err(HarnessError::Closed),
        }
    }

    /// Close the event channel and wait for the decoder to be returned.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Join`] if the task panicked.
    pub async fn shutdown(self) -> Result<StreamingDecoder, HarnessError> {
        drop(self.events);
        self.handle
            .await
            .map_err(|e| HarnessError::Join(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use viewwire_protocol::ResponseStatus;

    use super::*;
    use crate::fixtures::{BodyLayout, ViewBody};

    #[test]
    fn test_harness_round_trip() {
        let mut harness = Harness::default();
        harness.send(Request::view("beer-sample", "beer", "by_name")).unwrap();
        assert!(harness.outbound().starts_with(b"GET /beer-sample/"));

        let body = ViewBody::new()
            .layout(BodyLayout::Synthetic)
            .rows([r#"{"a":1}"#])
            .build();
        let response = harness.respond(200, vec![body]).unwrap();

        assert_eq!(response.status(), ResponseStatus::Success);
        assert_eq!(harness.recorded().len(), 2);
        assert_eq!(harness.responses().len(), 1);
        assert!(harness.errors().is_empty());
    }

    #[test]
    fn test_harness_records_errors() {
        let mut harness = Harness::default();
        let err = harness.respond(200, Vec::new()).unwrap_err();
        assert!(matches!(err, HarnessError::Codec(CodecError::ProtocolViolation(_))));
        assert_eq!(harness.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_decoder_task_shutdown_aborts_pending() {
        let (encoder, decoder) = pair(CodecConfig::default());
        encoder
            .encode_to_bytes(&Request::query("select 1"))
            .unwrap();
        encoder
            .encode_to_bytes(&Request::query("select 2"))
            .unwrap();

        let mut task = DecoderTask::spawn(decoder);
        task.send(TransportEvent::header(200)).await.unwrap();
        let response = task.next_response().await.unwrap();

        let decoder = task.shutdown().await.unwrap();
        assert!(decoder.is_idle());
        assert!(decoder.queue().is_empty());
        assert_eq!(response.status(), ResponseStatus::Failure);
    }
}
