//! Decoded rows.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;

/// One complete top-level JSON object from a response's row section.
///
/// The payload is split off the decode buffer without copying and is never
/// modified afterwards.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Row {
    payload: Bytes,
}

impl Row {
    pub(crate) fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Raw bytes of the row object.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// The row object as UTF-8 text.
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    /// Length of the row in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the row is empty. Decoded rows never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Deserialize the row object.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Take the underlying bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.payload
    }
}

impl AsRef<[u8]> for Row {
    fn as_ref(&self) -> &[u8] {
        &self.payload
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(text) => f.debug_tuple("Row").field(&text).finish(),
            Err(_) => f.debug_tuple("Row").field(&self.payload).finish(),
        }
    }
}
