//! Streaming response decoder.
//!
//! The decoder consumes [`TransportEvent`]s for one connection. Each header
//! opens a decode cycle bound to the oldest pending request; body chunks are
//! appended to the cycle's buffer and complete rows are split off and emitted
//! as soon as they are recognized. The cycle ends on the final chunk or on the
//! first error, after which the decoder is ready for the next header.
//!
//! A view body looks like
//!
//! ```text
//! {"total_rows":3,"rows":[{..},{..},{..}],"errors":[..]}
//! ```
//!
//! The row count is read from the text before the first `,`, a fixed-width
//! framing token follows, and the row objects are delimited by bracket depth.
//! A raw query body carries its rows in a `"results"` array instead and does
//! not announce a count.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use viewwire_protocol::{RequestKind, ResponseStatus};

use crate::config::CodecConfig;
use crate::emitter::RowEmitter;
use crate::error::{CodecError, MalformedKind, ViolationKind};
use crate::event::TransportEvent;
use crate::json::{JsonCodec, ResponseMeta, SerdeJsonCodec};
use crate::pending::{PendingEntry, PendingRequestQueue};
use crate::response::{ResponseInfo, ViewResponse};
use crate::row::Row;
use crate::scan::{self, RowScanner, Scan};

/// Where the decoder is within the current response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// No response in progress.
    Initial,
    /// Header seen; waiting for the row count and framing.
    Preamble,
    /// Emitting rows.
    Rows,
    /// Final chunk processed.
    Done,
}

/// Outcome of one attempt to read the row preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preamble {
    Parsed,
    Pending,
    /// The body is an error document without a row section.
    Absent,
}

/// Per-response decoding context.
#[derive(Debug)]
struct DecodeCycle {
    entry: PendingEntry,
    status_code: u16,
    state: ParserState,
    buffer: BytesMut,
    scanner: RowScanner,
    rows_closed: bool,
    error_body: bool,
    meta: ResponseMeta,
    emitter: RowEmitter,
    info: Arc<ResponseInfo>,
}

impl DecodeCycle {
    fn start(entry: PendingEntry, status_code: u16, config: &CodecConfig) -> Self {
        Self {
            entry,
            status_code,
            state: ParserState::Preamble,
            buffer: BytesMut::with_capacity(config.buffer_capacity),
            scanner: RowScanner::default(),
            rows_closed: false,
            error_body: false,
            meta: ResponseMeta::default(),
            emitter: RowEmitter::new(),
            info: Arc::new(ResponseInfo::default()),
        }
    }

    fn response(&self) -> ViewResponse {
        ViewResponse::new(
            self.entry.id,
            self.entry.kind,
            self.status_code,
            self.emitter.handle(),
            Arc::clone(&self.info),
        )
    }

    fn advance(
        &mut self,
        chunk: &[u8],
        last: bool,
        config: &CodecConfig,
        json: &dyn JsonCodec,
    ) -> Result<(), CodecError> {
        self.buffer.extend_from_slice(chunk);

        if self.state == ParserState::Preamble {
            if self.error_body {
                return self.accumulate_error_body(last, config, json);
            }
            let success = ResponseStatus::from_code(self.status_code).is_success();
            let preamble = match self.entry.kind {
                RequestKind::ViewQuery => self.parse_view_preamble(config, success)?,
                RequestKind::RawQuery => self.parse_query_preamble(json),
            };
            match preamble {
                Preamble::Parsed => self.state = ParserState::Rows,
                Preamble::Absent => {
                    self.error_body = true;
                    return self.accumulate_error_body(last, config, json);
                }
                Preamble::Pending if last && !success => {
                    self.error_body = true;
                    return self.accumulate_error_body(last, config, json);
                }
                Preamble::Pending if last => return self.finish_without_rows(),
                Preamble::Pending => return self.check_limit(config),
            }
        }

        self.drain_rows()?;
        if last {
            if self.scanner.in_row() {
                return Err(CodecError::malformed(MalformedKind::TruncatedResponse));
            }
            if self.rows_closed {
                self.meta.absorb_trailer(json, &self.buffer);
            }
            self.buffer.clear();
            self.state = ParserState::Done;
            return Ok(());
        }
        self.check_limit(config)
    }

    /// A non-success body is decoded as rows only if it announces a row count.
    fn parse_view_preamble(
        &mut self,
        config: &CodecConfig,
        success: bool,
    ) -> Result<Preamble, CodecError> {
        let Some(delimiter) = scan::find_unquoted(&self.buffer, b',') else {
            return Ok(Preamble::Pending);
        };
        let segment = &self.buffer[..delimiter];
        if !success && !announces_row_count(segment) {
            return Ok(Preamble::Absent);
        }
        let total_rows = parse_row_count(segment)?;

        let rows_start = delimiter + 1 + config.framing_len;
        if self.buffer.len() < rows_start {
            return Ok(Preamble::Pending);
        }
        let framing = &self.buffer[delimiter + 1..rows_start];
        if let Some(expected) = &config.expected_framing {
            if framing != &expected[..] {
                return Err(CodecError::malformed(MalformedKind::FramingMismatch {
                    found: String::from_utf8_lossy(framing).into_owned(),
                }));
            }
        }
        tracing::debug!(
            id = self.entry.id,
            total_rows,
            framing = %String::from_utf8_lossy(framing),
            "view preamble parsed"
        );

        self.buffer.advance(rows_start);
        let _ = self.info.total_rows.set(total_rows);
        Ok(Preamble::Parsed)
    }

    fn parse_query_preamble(&mut self, json: &dyn JsonCodec) -> Preamble {
        let Some(start) = scan::find_results_start(&self.buffer) else {
            return Preamble::Pending;
        };
        self.meta.absorb_preamble(json, &self.buffer[..start.key]);
        tracing::debug!(
            id = self.entry.id,
            request_id = self.meta.request_id.as_deref().unwrap_or(""),
            "query preamble parsed"
        );
        self.buffer.advance(start.rows);
        Preamble::Parsed
    }

    /// Success body that ended before its preamble.
    fn finish_without_rows(&mut self) -> Result<(), CodecError> {
        if !self.buffer.iter().all(u8::is_ascii_whitespace) {
            return Err(CodecError::malformed(MalformedKind::MissingPreamble));
        }
        if self.entry.kind.reports_total_rows() {
            let _ = self.info.total_rows.set(0);
        }
        self.buffer.clear();
        self.state = ParserState::Done;
        Ok(())
    }

    /// Non-success body without a row preamble; parsed as an error document.
    fn accumulate_error_body(
        &mut self,
        last: bool,
        config: &CodecConfig,
        json: &dyn JsonCodec,
    ) -> Result<(), CodecError> {
        self.check_limit(config)?;
        if !last {
            return Ok(());
        }
        self.meta = ResponseMeta::from_error_body(json, &self.buffer);
        if self.entry.kind.reports_total_rows() {
            let _ = self.info.total_rows.set(0);
        }
        tracing::debug!(
            id = self.entry.id,
            status_code = self.status_code,
            errors = self.meta.errors.len(),
            "error body parsed"
        );
        self.buffer.clear();
        self.state = ParserState::Done;
        Ok(())
    }

    fn drain_rows(&mut self) -> Result<(), CodecError> {
        while !self.rows_closed {
            match self.scanner.scan(&self.buffer)? {
                Scan::Separator(n) => self.buffer.advance(n),
                Scan::EndOfRows => {
                    self.buffer.advance(1);
                    self.rows_closed = true;
                }
                Scan::Row(end) => {
                    let row = Row::new(self.buffer.split_to(end).freeze());
                    tracing::trace!(id = self.entry.id, len = row.len(), "row decoded");
                    self.emitter.emit(row)?;
                }
                Scan::Incomplete => break,
            }
        }
        Ok(())
    }

    fn check_limit(&self, config: &CodecConfig) -> Result<(), CodecError> {
        if self.buffer.len() > config.max_buffer_size {
            return Err(CodecError::malformed(MalformedKind::BufferLimitExceeded {
                size: self.buffer.len(),
                limit: config.max_buffer_size,
            }));
        }
        Ok(())
    }
}

/// Parse the row count from the text before the preamble delimiter.
///
/// Accepts both `total_rows:N` and `{"total_rows":N`.
fn parse_row_count(segment: &[u8]) -> Result<u64, CodecError> {
    let invalid = |s: &str| CodecError::malformed(MalformedKind::InvalidRowCount(s.to_owned()));
    let text = String::from_utf8_lossy(segment);
    match text.rsplit_once(':') {
        Some((_, count)) => {
            let count = count.trim();
            count.parse::<u64>().map_err(|_| invalid(count))
        }
        None => Err(invalid(&text)),
    }
}

fn announces_row_count(segment: &[u8]) -> bool {
    segment.windows(b"total_rows".len()).any(|w| w == b"total_rows")
        && parse_row_count(segment).is_ok()
}

/// Decoder for the responses of one connection.
///
/// Must be driven by a single task, in the order the transport observed the
/// events. Pair it with a [`RequestEncoder`](crate::RequestEncoder) sharing
/// the same [`PendingRequestQueue`].
#[derive(Debug)]
pub struct StreamingDecoder {
    queue: Arc<PendingRequestQueue>,
    config: CodecConfig,
    json: Arc<dyn JsonCodec>,
    cycle: Option<DecodeCycle>,
}

impl StreamingDecoder {
    /// Create a decoder with default configuration.
    #[must_use]
    pub fn new(queue: Arc<PendingRequestQueue>) -> Self {
        Self::with_config(queue, CodecConfig::default())
    }

    /// Create a decoder with the given configuration.
    #[must_use]
    pub fn with_config(queue: Arc<PendingRequestQueue>, config: CodecConfig) -> Self {
        Self {
            queue,
            config,
            json: Arc::new(SerdeJsonCodec),
            cycle: None,
        }
    }

    /// Replace the parser used for response metadata.
    #[must_use]
    pub fn json_codec(mut self, codec: Arc<dyn JsonCodec>) -> Self {
        self.json = codec;
        self
    }

    /// The queue this decoder pops from.
    #[must_use]
    pub fn queue(&self) -> &Arc<PendingRequestQueue> {
        &self.queue
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Current parser state; `Initial` when no response is in progress.
    #[must_use]
    pub fn state(&self) -> ParserState {
        self.cycle
            .as_ref()
            .map_or(ParserState::Initial, |cycle| cycle.state)
    }

    /// Check if no response is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.cycle.is_none()
    }

    /// The request whose response is being decoded.
    #[must_use]
    pub fn current_request(&self) -> Option<PendingEntry> {
        self.cycle.as_ref().map(|cycle| cycle.entry)
    }

    /// Bytes buffered in the current cycle.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.cycle.as_ref().map_or(0, |cycle| cycle.buffer.len())
    }

    /// Process one transport event.
    ///
    /// Returns the response when `event` is a header.
    ///
    /// # Errors
    ///
    /// See [`on_header`](Self::on_header) and [`on_body`](Self::on_body).
    pub fn handle(&mut self, event: TransportEvent) -> Result<Option<ViewResponse>, CodecError> {
        match event {
            TransportEvent::Header { status } => self.on_header(status).map(Some),
            TransportEvent::Body(chunk) => self.on_body(&chunk, false).map(|()| None),
            TransportEvent::FinalBody(chunk) => self.on_body(&chunk, true).map(|()| None),
            TransportEvent::Aborted { reason } => {
                self.abort(reason);
                Ok(None)
            }
        }
    }

    /// Start decoding a response.
    ///
    /// # Errors
    ///
    /// - [`ViolationKind::HeaderDuringBody`] if a body is still streaming. The
    ///   streaming response fails and the header is not processed.
    /// - [`ViolationKind::UnmatchedResponse`] if no request is pending.
    pub fn on_header(&mut self, status_code: u16) -> Result<ViewResponse, CodecError> {
        if let Some(cycle) = &self.cycle {
            tracing::warn!(
                id = cycle.entry.id,
                status_code,
                "response header arrived while a body was streaming"
            );
            let error = CodecError::violation(ViolationKind::HeaderDuringBody);
            self.fail(error.clone());
            return Err(error);
        }

        let entry = self.queue.pop()?;
        let cycle = DecodeCycle::start(entry, status_code, &self.config);
        let response = cycle.response();
        tracing::debug!(
            id = entry.id,
            kind = %entry.kind,
            status_code,
            "response header"
        );
        self.cycle = Some(cycle);
        Ok(response)
    }

    /// Feed one body chunk; `last` marks the final chunk.
    ///
    /// # Errors
    ///
    /// [`ViolationKind::BodyWithoutHeader`] if no response is in progress;
    /// otherwise any [`MalformedKind`] the body triggers. Errors fail the
    /// current response and reset the decoder.
    pub fn on_body(&mut self, chunk: &[u8], last: bool) -> Result<(), CodecError> {
        let Some(cycle) = self.cycle.as_mut() else {
            return Err(CodecError::violation(ViolationKind::BodyWithoutHeader));
        };
        tracing::trace!(
            id = cycle.entry.id,
            len = chunk.len(),
            last,
            state = ?cycle.state,
            "body chunk"
        );

        match cycle.advance(chunk, last, &self.config, self.json.as_ref()) {
            Ok(()) if cycle.state == ParserState::Done => {
                self.finish();
                Ok(())
            }
            Ok(()) => Ok(()),
            Err(error) => {
                self.fail(error.clone());
                Err(error)
            }
        }
    }

    /// Fail the response in progress, if any.
    ///
    /// Returns whether a response was aborted.
    pub fn abort(&mut self, reason: impl Into<String>) -> bool {
        if self.cycle.is_none() {
            return false;
        }
        self.fail(CodecError::Aborted(reason.into()));
        true
    }

    /// Fail the response in progress and forget every pending request.
    ///
    /// Returns the requests that will never see a header, oldest first.
    pub fn abort_all(&mut self, reason: impl Into<String>) -> Vec<PendingEntry> {
        self.abort(reason);
        let dropped = self.queue.drain();
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "pending requests dropped");
        }
        dropped
    }

    fn finish(&mut self) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        let DecodeCycle {
            entry,
            status_code,
            meta,
            emitter,
            info,
            ..
        } = cycle;

        let _ = info.meta.set(meta);
        if let Err(error) = emitter.complete() {
            tracing::warn!(id = entry.id, %error, "row sequence already terminated");
        }
        tracing::debug!(
            id = entry.id,
            status_code,
            rows = emitter.emitted(),
            total_rows = info.total_rows.get().copied(),
            "response complete"
        );
    }

    fn fail(&mut self, error: CodecError) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        tracing::debug!(
            id = cycle.entry.id,
            state = ?cycle.state,
            rows = cycle.emitter.emitted(),
            %error,
            "decode cycle failed"
        );
        if let Err(misuse) = cycle.emitter.fail(error) {
            tracing::warn!(id = cycle.entry.id, error = %misuse, "row sequence already terminated");
        }
    }
}
