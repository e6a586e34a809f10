//! Protocol error types.

use thiserror::Error;

/// Errors raised while turning a request into wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A request field cannot be placed on the wire.
    #[error("cannot encode {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A header name or value contains bytes that would break HTTP framing.
    #[error("invalid header {name}")]
    InvalidHeader {
        /// Header name.
        name: String,
    },
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::InvalidField`].
    #[must_use]
    pub fn invalid_field(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidField { field, reason }
    }
}
