//! Codec configuration.

use bytes::Bytes;
use viewwire_protocol::{EncodeOptions, FRAMING_TOKEN_LEN};

/// Default initial capacity of a decode cycle's accumulation buffer (8 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Default ceiling on bytes buffered without completing a row (64 MiB).
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Configuration shared by the request encoder and the streaming decoder.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Options applied to outbound requests.
    pub encode: EncodeOptions,
    /// Number of framing bytes skipped after the `total_rows` delimiter.
    pub framing_len: usize,
    /// If set, the skipped framing bytes must equal this token exactly.
    pub expected_framing: Option<Bytes>,
    /// Initial capacity of the accumulation buffer.
    pub buffer_capacity: usize,
    /// Maximum bytes buffered while waiting for a row (or an error body) to
    /// complete.
    pub max_buffer_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            encode: EncodeOptions::default(),
            framing_len: FRAMING_TOKEN_LEN,
            expected_framing: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl CodecConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request encoding options.
    #[must_use]
    pub fn encode_options(mut self, options: EncodeOptions) -> Self {
        self.encode = options;
        self
    }

    /// Set the number of framing bytes after the `total_rows` delimiter.
    ///
    /// Clears any expected token of a different length.
    #[must_use]
    pub fn framing_len(mut self, len: usize) -> Self {
        self.framing_len = len;
        if self
            .expected_framing
            .as_ref()
            .is_some_and(|token| token.len() != len)
        {
            self.expected_framing = None;
        }
        self
    }

    /// Require the framing token to match `token` exactly.
    ///
    /// Also sets the framing length to the token's length.
    #[must_use]
    pub fn expect_framing(mut self, token: impl Into<Bytes>) -> Self {
        let token = token.into();
        self.framing_len = token.len();
        self.expected_framing = Some(token);
        self
    }

    /// Set the initial accumulation buffer capacity.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the ceiling on bytes buffered without completing a row.
    ///
    /// Values below the initial buffer capacity are raised to it.
    #[must_use]
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size.max(self.buffer_capacity);
        self
    }
}
