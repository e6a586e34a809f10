//! Minimal HTTP/1.1 request representation and serialization.
//!
//! Only the request side is modelled here. Parsing response status lines and
//! chunked transfer framing is the transport's job; the decoder receives the
//! status code and de-chunked body segments as events.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// `User-Agent` header name.
pub const USER_AGENT: &str = "User-Agent";
/// `Content-Length` header name.
pub const CONTENT_LENGTH: &str = "Content-Length";
/// `Host` header name.
pub const HOST: &str = "Host";

const CRLF: &[u8] = b"\r\n";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl HttpMethod {
    /// The method token as sent on the request line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound HTTP/1.1 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpRequest {
    /// Create a request with no headers and an empty body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Set or replace a header.
    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() || !is_header_safe(&name) || !is_header_safe(&value) {
            return Err(ProtocolError::InvalidHeader { name });
        }
        self.put_header(name, value);
        Ok(())
    }

    fn put_header(&mut self, name: String, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Attach a body and set `Content-Length` to its length.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.put_header(CONTENT_LENGTH.to_owned(), self.body.len().to_string());
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request target, including any query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up a header value (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// All headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Number of bytes [`HttpRequest::encode`] will write.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let request_line = self.method.as_str().len() + 1 + self.path.len() + 1 + 8 + 2;
        let headers: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + 2 + value.len() + 2)
            .sum();
        request_line + headers + 2 + self.body.len()
    }

    /// Serialize the request line, headers and body into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());

        dst.put_slice(self.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.path.as_bytes());
        dst.put_slice(b" HTTP/1.1");
        dst.put_slice(CRLF);

        for (name, value) in &self.headers {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(CRLF);
        }
        dst.put_slice(CRLF);
        dst.put_slice(&self.body);
    }

    /// Serialize into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

fn is_header_safe(s: &str) -> bool {
    !s.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_get() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/b/_design/d/_view/v");
        request.set_header(HOST, "localhost:8092").unwrap();

        let bytes = request.to_bytes();
        assert_eq!(
            &bytes[..],
            b"GET /b/_design/d/_view/v HTTP/1.1\r\nHost: localhost:8092\r\n\r\n"
        );
        assert_eq!(bytes.len(), request.encoded_len());
    }

    #[test]
    fn test_encode_post_with_body() {
        let mut request = HttpRequest::new(HttpMethod::Post, "/query");
        request.set_body(Bytes::from_static(b"SELECT 1"));

        let bytes = request.to_bytes();
        assert_eq!(request.header("content-length"), Some("8"));
        assert!(bytes.starts_with(b"POST /query HTTP/1.1\r\nContent-Length: 8\r\n"));
        assert!(bytes.ends_with(b"\r\n\r\nSELECT 1"));
        assert_eq!(bytes.len(), request.encoded_len());
    }

    #[test]
    fn test_replacing_body_updates_content_length() {
        let mut request = HttpRequest::new(HttpMethod::Post, "/query");
        request.set_body(Bytes::from_static(b"SELECT 1"));
        request.set_body(Bytes::from_static(b"SELECT 10"));

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header(CONTENT_LENGTH), Some("9"));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/");
        request.set_header("user-agent", "a").unwrap();
        request.set_header(USER_AGENT, "b").unwrap();

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("USER-AGENT"), Some("b"));
    }

    #[test]
    fn test_header_injection_rejected() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/");
        let err = request.set_header(USER_AGENT, "x\r\nEvil: 1").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHeader { .. }));
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }
}
