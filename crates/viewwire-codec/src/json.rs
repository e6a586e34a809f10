//! JSON handling for the parts of a response that are not rows.
//!
//! Rows are delivered as raw bytes and never parsed by the decoder. The
//! query preamble, the trailer after the row section and the body of a
//! non-success response are small documents parsed through [`JsonCodec`].

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};

/// Parser used for response metadata.
pub trait JsonCodec: Send + Sync + fmt::Debug {
    /// Parse one complete JSON document.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if `bytes` is not valid JSON.
    fn parse(&self, bytes: &[u8]) -> Result<Value, String>;
}

/// [`JsonCodec`] backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Value, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

/// Everything a response carried besides its rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMeta {
    /// Server-assigned request id (query responses).
    pub request_id: Option<String>,
    /// Result signature (query responses).
    pub signature: Option<Value>,
    /// Reported execution status, such as `"success"` or `"errors"`.
    pub status: Option<String>,
    /// Error objects from the trailer or from a non-success body.
    pub errors: Vec<Value>,
    /// Warning objects from the trailer.
    pub warnings: Vec<Value>,
    /// Execution metrics.
    pub metrics: Option<Value>,
    /// Bytes that could not be parsed as JSON, kept verbatim.
    pub raw: Option<Bytes>,
}

impl ResponseMeta {
    /// Check if the server reported any error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fields of a query preamble such as `{"requestID":"..","signature":{..},`.
    pub(crate) fn absorb_preamble(&mut self, codec: &dyn JsonCodec, preamble: &[u8]) {
        let fields = trim_end(preamble, |b| b == b',' || b.is_ascii_whitespace());
        let mut doc = BytesMut::with_capacity(fields.len() + 1);
        doc.put_slice(fields);
        doc.put_u8(b'}');
        match codec.parse(&doc) {
            Ok(Value::Object(map)) => self.absorb_object(map),
            Ok(_) => {}
            Err(error) => tracing::warn!(%error, "unparsable response preamble"),
        }
    }

    /// Members after the closing `]` of the row section, up to the closing `}`.
    pub(crate) fn absorb_trailer(&mut self, codec: &dyn JsonCodec, trailer: &[u8]) {
        let members = trim_start(trailer, |b| b == b',' || b.is_ascii_whitespace());
        if members.is_empty() {
            return;
        }
        let mut doc = BytesMut::with_capacity(members.len() + 1);
        doc.put_u8(b'{');
        doc.put_slice(members);
        match codec.parse(&doc) {
            Ok(Value::Object(map)) => self.absorb_object(map),
            Ok(_) => self.raw = Some(Bytes::copy_from_slice(trailer)),
            Err(error) => {
                tracing::warn!(%error, len = trailer.len(), "unparsable response trailer");
                self.raw = Some(Bytes::copy_from_slice(trailer));
            }
        }
    }

    /// A complete non-success body.
    ///
    /// A JSON object with an `errors` array contributes that array; any
    /// other object is itself the error. Anything else is kept as raw bytes.
    pub(crate) fn from_error_body(codec: &dyn JsonCodec, body: &[u8]) -> Self {
        let mut meta = Self::default();
        if body.iter().all(u8::is_ascii_whitespace) {
            return meta;
        }
        match codec.parse(body) {
            Ok(Value::Object(map)) if map.contains_key("errors") => meta.absorb_object(map),
            Ok(value @ Value::Object(_)) => meta.errors.push(value),
            Ok(_) | Err(_) => meta.raw = Some(Bytes::copy_from_slice(body)),
        }
        meta
    }

    fn absorb_object(&mut self, mut map: Map<String, Value>) {
        if let Some(Value::String(id)) = map.remove("requestID") {
            self.request_id = Some(id);
        }
        if let Some(signature) = map.remove("signature") {
            self.signature = Some(signature);
        }
        if let Some(Value::String(status)) = map.remove("status") {
            self.status = Some(status);
        }
        match map.remove("errors") {
            Some(Value::Array(errors)) => self.errors.extend(errors),
            Some(other) => self.errors.push(other),
            None => {}
        }
        // View responses report a single failure as `"error"` plus `"reason"`.
        if let Some(error) = map.remove("error") {
            let mut entry = Map::new();
            entry.insert("error".into(), error);
            if let Some(reason) = map.remove("reason") {
                entry.insert("reason".into(), reason);
            }
            self.errors.push(Value::Object(entry));
        }
        if let Some(Value::Array(warnings)) = map.remove("warnings") {
            self.warnings.extend(warnings);
        }
        if let Some(metrics) = map.remove("metrics") {
            self.metrics = Some(metrics);
        }
    }
}

fn trim_start(bytes: &[u8], strip: impl Fn(u8) -> bool) -> &[u8] {
    let start = bytes.iter().position(|&b| !strip(b)).unwrap_or(bytes.len());
    &bytes[start..]
}

fn trim_end(bytes: &[u8], strip: impl Fn(u8) -> bool) -> &[u8] {
    let end = bytes.iter().rposition(|&b| !strip(b)).map_or(0, |i| i + 1);
    &bytes[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_trailer_with_errors() {
        let mut meta = ResponseMeta::default();
        meta.absorb_trailer(
            &SerdeJsonCodec,
            br#",
"errors":[{"from":"local","reason":"timeout"}]
}"#,
        );
        assert!(meta.has_errors());
        assert_eq!(meta.errors, vec![json!({"from":"local","reason":"timeout"})]);
        assert!(meta.raw.is_none());
    }

    #[test]
    fn test_query_trailer() {
        let mut meta = ResponseMeta::default();
        meta.absorb_trailer(
            &SerdeJsonCodec,
            br#","status":"success","metrics":{"resultCount":2}}"#,
        );
        assert_eq!(meta.status.as_deref(), Some("success"));
        assert_eq!(meta.metrics, Some(json!({"resultCount":2})));
        assert!(!meta.has_errors());
    }

    #[test]
    fn test_closing_brace_only() {
        let mut meta = ResponseMeta::default();
        meta.absorb_trailer(&SerdeJsonCodec, b"\n}\n");
        assert_eq!(meta, ResponseMeta::default());

        meta.absorb_trailer(&SerdeJsonCodec, b"");
        assert_eq!(meta, ResponseMeta::default());
    }

    #[test]
    fn test_unparsable_trailer_is_kept() {
        let mut meta = ResponseMeta::default();
        meta.absorb_trailer(&SerdeJsonCodec, b",garbage");
        assert_eq!(meta.raw.as_deref(), Some(&b",garbage"[..]));
    }

    #[test]
    fn test_preamble() {
        let mut meta = ResponseMeta::default();
        meta.absorb_preamble(
            &SerdeJsonCodec,
            br#"{"requestID":"5c1f","signature":{"*":"*"},
"#,
        );
        assert_eq!(meta.request_id.as_deref(), Some("5c1f"));
        assert_eq!(meta.signature, Some(json!({"*":"*"})));

        let mut meta = ResponseMeta::default();
        meta.absorb_preamble(&SerdeJsonCodec, b"{");
        assert_eq!(meta, ResponseMeta::default());
    }

    #[test]
    fn test_error_bodies() {
        let meta = ResponseMeta::from_error_body(
            &SerdeJsonCodec,
            br#"{"error":"not_found","reason":"missing"}"#,
        );
        assert_eq!(
            meta.errors,
            vec![json!({"error":"not_found","reason":"missing"})]
        );

        let meta = ResponseMeta::from_error_body(
            &SerdeJsonCodec,
            br#"{"requestID":"x","errors":[{"code":3000}],"status":"fatal"}"#,
        );
        assert_eq!(meta.errors, vec![json!({"code":3000})]);
        assert_eq!(meta.status.as_deref(), Some("fatal"));

        let meta = ResponseMeta::from_error_body(&SerdeJsonCodec, b"Service Unavailable");
        assert!(meta.errors.is_empty());
        assert_eq!(meta.raw.as_deref(), Some(&b"Service Unavailable"[..]));

        let meta = ResponseMeta::from_error_body(&SerdeJsonCodec, b"  ");
        assert_eq!(meta, ResponseMeta::default());
    }
}
