//! # viewwire-codec
//!
//! Request correlation and incremental response decoding for the view and
//! query wire protocol.
//!
//! ## Architecture
//!
//! ```text
//! Request ──► RequestEncoder ──► bytes ──► transport
//!                  │
//!                  ▼ push
//!          PendingRequestQueue
//!                  │ pop
//!                  ▼
//! transport ──► TransportEvent ──► StreamingDecoder ──► ViewResponse ──► RowStream
//! ```
//!
//! Responses arrive in request order. The decoder pops one pending entry per
//! response header and decodes the body chunk by chunk, emitting each row as
//! soon as its closing brace arrives. Subscribers that attach late still see
//! every row.
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use viewwire_codec::{CodecConfig, TransportEvent, pair};
//! use viewwire_protocol::{Request, ResponseStatus};
//!
//! let (encoder, mut decoder) = pair(CodecConfig::default());
//!
//! let mut out = BytesMut::new();
//! let request: Request = Request::view("beer-sample", "beer", "by_name").into();
//! encoder.write_request(&request, &mut out).unwrap();
//!
//! let response = decoder.handle(TransportEvent::header(200)).unwrap().unwrap();
//! decoder
//!     .handle(TransportEvent::final_body(
//!         &br#"{"total_rows":1,"rows":[{"id":"a","key":"a","value":1}]}"#[..],
//!     ))
//!     .unwrap();
//!
//! assert_eq!(response.status(), ResponseStatus::Success);
//! assert_eq!(response.total_rows(), Some(1));
//! assert_eq!(response.row_handle().emitted(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod decoder;
pub mod emitter;
pub mod encoder;
pub mod error;
pub mod event;
pub mod framed;
pub mod json;
pub mod pending;
pub mod response;
pub mod row;
mod scan;

use std::sync::Arc;

pub use config::{CodecConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_BUFFER_SIZE};
pub use decoder::{ParserState, StreamingDecoder};
pub use emitter::{Outcome, RowEmitter, RowHandle, RowStream};
pub use encoder::RequestEncoder;
pub use error::{CodecError, ErrorKind, MalformedKind, ViolationKind};
pub use event::TransportEvent;
pub use framed::RequestWriter;
pub use json::{JsonCodec, ResponseMeta, SerdeJsonCodec};
pub use pending::{PendingEntry, PendingRequestQueue};
pub use response::ViewResponse;
pub use row::Row;

/// Create an encoder and a decoder for one connection, sharing a fresh
/// pending queue.
#[must_use]
pub fn pair(config: CodecConfig) -> (RequestEncoder, StreamingDecoder) {
    let queue = Arc::new(PendingRequestQueue::new());
    let encoder = RequestEncoder::new(Arc::clone(&queue), config.encode.clone());
    let decoder = StreamingDecoder::with_config(queue, config);
    (encoder, decoder)
}
