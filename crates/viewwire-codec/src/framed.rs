//! Request sink over an async writer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Sink;
use pin_project_lite::pin_project;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use viewwire_protocol::Request;

use crate::encoder::RequestEncoder;
use crate::error::CodecError;

pin_project! {
    /// Writes encoded requests to a transport.
    ///
    /// Every request accepted by the sink is registered with the encoder's
    /// pending queue in the same order its bytes reach the writer.
    pub struct RequestWriter<T> {
        #[pin]
        inner: FramedWrite<T, RequestEncoder>,
    }
}

impl<T> RequestWriter<T>
where
    T: AsyncWrite,
{
    /// Create a writer over `transport`.
    pub fn new(transport: T, encoder: RequestEncoder) -> Self {
        Self {
            inner: FramedWrite::new(transport, encoder),
        }
    }

    /// The encoder used for every request.
    pub fn encoder(&self) -> &RequestEncoder {
        self.inner.encoder()
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Consume the writer, returning the underlying transport.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> Sink<Request> for RequestWriter<T>
where
    T: AsyncWrite,
{
    type Error = CodecError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Request) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}
