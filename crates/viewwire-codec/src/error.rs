//! Codec error types.
//!
//! Every error aborts the current decode cycle only. The same value is
//! handed to the caller and stored as the terminal event of the response's
//! row stream, so errors are `Clone`.

use thiserror::Error;
use viewwire_protocol::ProtocolError;

/// Errors raised by the request encoder, the streaming decoder and the row
/// emitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The request could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] ProtocolError),

    /// Transport events arrived in an order the decoder cannot accept.
    #[error("protocol violation: {0}")]
    ProtocolViolation(ViolationKind),

    /// The response body does not have the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(MalformedKind),

    /// The row emitter was driven after it had already terminated.
    #[error("emitter misuse: {0}")]
    EmitterMisuse(&'static str),

    /// The transport gave up on the response, for example on a timeout.
    #[error("response aborted: {0}")]
    Aborted(String),

    /// The sink the encoder writes into reported an I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Which kind of out-of-sequence input was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViolationKind {
    /// A response header arrived with no request outstanding.
    #[error("response received for a request that was not sent")]
    UnmatchedResponse,
    /// A body chunk arrived before any response header.
    #[error("body chunk received before a response header")]
    BodyWithoutHeader,
    /// A response header arrived while the previous body was still streaming.
    #[error("response header received while a body was still streaming")]
    HeaderDuringBody,
}

/// What is wrong with a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedKind {
    /// The `total_rows` field is not a non-negative integer.
    #[error("unparsable row count {0:?}")]
    InvalidRowCount(String),
    /// The body ended inside a row object.
    #[error("response truncated inside a row")]
    TruncatedResponse,
    /// A successful body ended before the row preamble was complete.
    #[error("response ended before the row preamble")]
    MissingPreamble,
    /// The framing token after the preamble is not the expected one.
    #[error("unexpected framing token {found:?}")]
    FramingMismatch {
        /// The bytes found where the token was expected (lossy UTF-8).
        found: String,
    },
    /// A byte outside any row that is neither a separator nor the end of
    /// the row section.
    #[error("unexpected byte {byte:#04x} between rows")]
    UnexpectedByte {
        /// The offending byte.
        byte: u8,
    },
    /// A single row or preamble grew past the configured buffer limit.
    #[error("buffered {size} bytes without a complete row (limit {limit})")]
    BufferLimitExceeded {
        /// Bytes buffered.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CodecError::Encoding`].
    Encoding,
    /// See [`CodecError::ProtocolViolation`].
    ProtocolViolation,
    /// See [`CodecError::MalformedPayload`].
    MalformedPayload,
    /// See [`CodecError::EmitterMisuse`].
    EmitterMisuse,
    /// See [`CodecError::Aborted`].
    Aborted,
    /// See [`CodecError::Io`].
    Io,
}

impl CodecError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::EmitterMisuse(_) => ErrorKind::EmitterMisuse,
            Self::Aborted(_) => ErrorKind::Aborted,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Check if this error means the event stream itself is out of order.
    ///
    /// Such errors usually indicate a transport bug or a request that was
    /// written without being registered with the encoder.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation(_))
    }

    /// Check if this error was raised by the transport rather than the body.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Aborted(_) | Self::Io(_))
    }

    pub(crate) fn violation(kind: ViolationKind) -> Self {
        Self::ProtocolViolation(kind)
    }

    pub(crate) fn malformed(kind: MalformedKind) -> Self {
        Self::MalformedPayload(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            CodecError::violation(ViolationKind::UnmatchedResponse).kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            CodecError::malformed(MalformedKind::TruncatedResponse).kind(),
            ErrorKind::MalformedPayload
        );
        assert_eq!(
            CodecError::EmitterMisuse("twice").kind(),
            ErrorKind::EmitterMisuse
        );
        assert_eq!(CodecError::Aborted("timeout".into()).kind(), ErrorKind::Aborted);

        let encoding: CodecError = ProtocolError::invalid_field("bucket", "empty").into();
        assert_eq!(encoding.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn test_predicates() {
        assert!(CodecError::violation(ViolationKind::BodyWithoutHeader).is_protocol_violation());
        assert!(!CodecError::malformed(MalformedKind::MissingPreamble).is_protocol_violation());
        assert!(CodecError::Aborted("reset".into()).is_transient());
        assert!(!CodecError::EmitterMisuse("x").is_transient());

        let io: CodecError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.is_transient());
    }

    #[test]
    fn test_display() {
        let err = CodecError::violation(ViolationKind::UnmatchedResponse);
        assert_eq!(
            err.to_string(),
            "protocol violation: response received for a request that was not sent"
        );

        let err = CodecError::malformed(MalformedKind::InvalidRowCount("abc".into()));
        assert!(err.to_string().contains("\"abc\""));

        let err = CodecError::malformed(MalformedKind::UnexpectedByte { byte: b'x' });
        assert!(err.to_string().contains("0x78"));

        let err = CodecError::malformed(MalformedKind::BufferLimitExceeded { size: 10, limit: 4 });
        assert!(err.to_string().contains("limit 4"));
    }
}
