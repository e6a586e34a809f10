//! Request encoding.
//!
//! Turns a [`Request`] into an [`HttpRequest`]. View lookups become `GET`s
//! against the design document path; raw queries are `POST`ed verbatim to
//! the query service.

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::http::{self, HttpMethod, HttpRequest};
use crate::request::{RawQuery, Request, ViewLookup};
use crate::{DEFAULT_USER_AGENT, DEV_DESIGN_PREFIX, QUERY_PATH};

/// Options applied to every encoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// `User-Agent` sent with raw queries.
    pub user_agent: String,
    /// Path raw queries are posted to.
    pub query_path: String,
    /// `Host` header value, if the transport wants one written.
    pub host: Option<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            query_path: QUERY_PATH.to_string(),
            host: None,
        }
    }
}

impl EncodeOptions {
    /// Create options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `User-Agent` value.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the raw query path.
    #[must_use]
    pub fn query_path(mut self, path: impl Into<String>) -> Self {
        self.query_path = path.into();
        self
    }

    /// Set the `Host` header value.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// Encode a request into its HTTP form.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidField`] when a path segment or the query
/// text cannot be sent as-is, and [`ProtocolError::InvalidHeader`] when a
/// configured header value would break HTTP framing.
pub fn encode_request(
    request: &Request,
    options: &EncodeOptions,
) -> Result<HttpRequest, ProtocolError> {
    let mut http = match request {
        Request::ViewLookup(lookup) => encode_view_lookup(lookup)?,
        Request::RawQuery(query) => encode_raw_query(query, options)?,
    };

    if let Some(host) = &options.host {
        http.set_header(http::HOST, host.as_str())?;
    }
    Ok(http)
}

fn encode_view_lookup(lookup: &ViewLookup) -> Result<HttpRequest, ProtocolError> {
    check_segment("bucket", &lookup.bucket)?;
    check_segment("design_doc", &lookup.design_doc)?;
    check_segment("view_name", &lookup.view_name)?;
    check_query_string(&lookup.query_string)?;

    let prefix = if lookup.development {
        DEV_DESIGN_PREFIX
    } else {
        ""
    };
    let mut path = format!(
        "/{}/_design/{}{}/_view/{}",
        lookup.bucket, prefix, lookup.design_doc, lookup.view_name
    );
    if !lookup.query_string.is_empty() {
        path.push('?');
        path.push_str(&lookup.query_string);
    }

    Ok(HttpRequest::new(HttpMethod::Get, path))
}

fn encode_raw_query(query: &RawQuery, options: &EncodeOptions) -> Result<HttpRequest, ProtocolError> {
    if query.text.trim().is_empty() {
        return Err(ProtocolError::invalid_field("text", "must not be empty"));
    }

    let body = Bytes::copy_from_slice(query.text.as_bytes());
    let mut http = HttpRequest::new(HttpMethod::Post, options.query_path.as_str());
    http.set_header(http::USER_AGENT, options.user_agent.as_str())?;
    http.set_body(body);
    Ok(http)
}

fn check_segment(field: &'static str, value: &str) -> Result<(), ProtocolError> {
    if value.is_empty() {
        return Err(ProtocolError::invalid_field(field, "must not be empty"));
    }
    if value
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace() || c.is_control())
    {
        return Err(ProtocolError::invalid_field(
            field,
            "contains a reserved path character",
        ));
    }
    Ok(())
}

fn check_query_string(value: &str) -> Result<(), ProtocolError> {
    if value.starts_with('?') {
        return Err(ProtocolError::invalid_field(
            "query_string",
            "must not start with '?'",
        ));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ProtocolError::invalid_field(
            "query_string",
            "must be percent-encoded",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode(request: impl Into<Request>) -> Result<HttpRequest, ProtocolError> {
        encode_request(&request.into(), &EncodeOptions::default())
    }

    #[test]
    fn test_view_lookup_path() {
        let http = encode(Request::view("travel", "hotels", "by_city")).unwrap();
        assert_eq!(http.method(), HttpMethod::Get);
        assert_eq!(http.path(), "/travel/_design/hotels/_view/by_city");
        assert!(http.headers().is_empty());
        assert!(http.body().is_empty());
    }

    #[test]
    fn test_view_lookup_development_and_query() {
        let lookup = Request::view("travel", "hotels", "by_city")
            .development(true)
            .with_query("limit=5&skip=10");
        let http = encode(lookup).unwrap();
        assert_eq!(
            http.path(),
            "/travel/_design/dev_hotels/_view/by_city?limit=5&skip=10"
        );
    }

    #[test]
    fn test_raw_query_post() {
        let options = EncodeOptions::new().user_agent("tests/1.0");
        let http = encode_request(&Request::query("SELECT * FROM b"), &options).unwrap();

        assert_eq!(http.method(), HttpMethod::Post);
        assert_eq!(http.path(), QUERY_PATH);
        assert_eq!(http.header(http::USER_AGENT), Some("tests/1.0"));
        assert_eq!(http.header(http::CONTENT_LENGTH), Some("15"));
        assert_eq!(&http.body()[..], b"SELECT * FROM b");
    }

    #[test]
    fn test_raw_query_content_length_counts_utf8_bytes() {
        let http = encode(Request::query("SELECT 'é'")).unwrap();
        assert_eq!(http.header(http::CONTENT_LENGTH), Some("11"));
        assert_eq!(http.body().len(), 11);
    }

    #[test]
    fn test_custom_query_path_and_host() {
        let options = EncodeOptions::new().query_path("/query/service").host("db:8093");
        let http = encode_request(&Request::query("SELECT 1"), &options).unwrap();
        assert_eq!(http.path(), "/query/service");
        assert_eq!(http.header(http::HOST), Some("db:8093"));
    }

    #[test]
    fn test_rejects_empty_segments() {
        let err = encode(Request::view("", "d", "v")).unwrap_err();
        assert_eq!(err, ProtocolError::invalid_field("bucket", "must not be empty"));

        let err = encode(Request::view("b", "d", "")).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "view_name", .. }));
    }

    #[test]
    fn test_rejects_reserved_characters() {
        assert!(encode(Request::view("b/x", "d", "v")).is_err());
        assert!(encode(Request::view("b", "d?x", "v")).is_err());
        assert!(encode(Request::view("b", "d", "v w")).is_err());
        assert!(encode(Request::view("b", "d", "v").with_query("?limit=1")).is_err());
        assert!(encode(Request::view("b", "d", "v").with_query("a=b c")).is_err());
    }

    #[test]
    fn test_rejects_empty_query_text() {
        let err = encode(Request::query("   ")).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "text", .. }));
    }

    #[test]
    fn test_rejects_bad_user_agent() {
        let options = EncodeOptions::new().user_agent("bad\nagent");
        let err = encode_request(&Request::query("SELECT 1"), &options).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidHeader { .. }));
    }

    proptest! {
        #[test]
        fn prop_view_path_layout(
            bucket in "[a-z0-9_-]{1,16}",
            design in "[a-z0-9_-]{1,16}",
            view in "[a-z0-9_-]{1,16}",
            query in "([a-z]{1,6}=[0-9]{1,4})?",
            dev in any::<bool>(),
        ) {
            let lookup = Request::view(bucket.clone(), design.clone(), view.clone())
                .with_query(query.clone())
                .development(dev);
            let http = encode(lookup).unwrap();

            let prefix = if dev { "dev_" } else { "" };
            let mut expected = format!("/{bucket}/_design/{prefix}{design}/_view/{view}");
            if !query.is_empty() {
                expected.push('?');
                expected.push_str(&query);
            }
            prop_assert_eq!(http.path(), expected.as_str());
        }
    }
}
