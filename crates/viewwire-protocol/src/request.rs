//! Logical requests.
//!
//! The set of requests is closed: every variant has exactly one wire
//! spelling in [`crate::encode`], and the decoder picks its parse path from
//! the matching [`RequestKind`].

use std::fmt;

/// A request against the view engine or the raw-query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look up rows of a view in a design document.
    ViewLookup(ViewLookup),
    /// Run a free-form statement against the query service.
    RawQuery(RawQuery),
}

impl Request {
    /// Create a view lookup with no query string in production mode.
    #[must_use]
    pub fn view(
        bucket: impl Into<String>,
        design_doc: impl Into<String>,
        view_name: impl Into<String>,
    ) -> ViewLookup {
        ViewLookup {
            bucket: bucket.into(),
            design_doc: design_doc.into(),
            view_name: view_name.into(),
            query_string: String::new(),
            development: false,
        }
    }

    /// Create a raw query request.
    #[must_use]
    pub fn query(text: impl Into<String>) -> Self {
        Self::RawQuery(RawQuery { text: text.into() })
    }

    /// The correlation tag for this request.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::ViewLookup(_) => RequestKind::ViewQuery,
            Self::RawQuery(_) => RequestKind::RawQuery,
        }
    }
}

impl From<ViewLookup> for Request {
    fn from(lookup: ViewLookup) -> Self {
        Self::ViewLookup(lookup)
    }
}

impl From<RawQuery> for Request {
    fn from(query: RawQuery) -> Self {
        Self::RawQuery(query)
    }
}

/// Parameters of a view lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLookup {
    /// Bucket holding the design document.
    pub bucket: String,
    /// Design document name, without the development prefix.
    pub design_doc: String,
    /// View name inside the design document.
    pub view_name: String,
    /// Pre-encoded query string, without the leading `?`.
    pub query_string: String,
    /// Target the development copy of the design document.
    pub development: bool,
}

impl ViewLookup {
    /// Set the pre-encoded query string (without `?`).
    #[must_use]
    pub fn with_query(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    /// Target the development or production design document.
    #[must_use]
    pub fn development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }
}

/// A free-form statement for the query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuery {
    /// Statement text, sent verbatim as the request body.
    pub text: String,
}

/// Which decode path a response must take.
///
/// One tag is queued per encoded request and popped when the matching
/// response header arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `total_rows` preamble followed by a row stream.
    ViewQuery,
    /// `"results"` array streamed out of a query response document.
    RawQuery,
}

impl RequestKind {
    /// Whether the preamble of this kind carries a total row count.
    #[must_use]
    pub fn reports_total_rows(self) -> bool {
        matches!(self, Self::ViewQuery)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ViewQuery => write!(f, "view-query"),
            Self::RawQuery => write!(f, "raw-query"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_builder_defaults() {
        let lookup = Request::view("b", "d", "v");
        assert!(lookup.query_string.is_empty());
        assert!(!lookup.development);

        let request: Request = lookup.with_query("stale=false").development(true).into();
        assert!(matches!(
            &request,
            Request::ViewLookup(v) if v.query_string == "stale=false" && v.development
        ));
        assert_eq!(request.kind(), RequestKind::ViewQuery);
    }

    #[test]
    fn test_query_kind() {
        let request = Request::query("SELECT 1");
        assert_eq!(request.kind(), RequestKind::RawQuery);
        assert!(!request.kind().reports_total_rows());
        assert!(RequestKind::ViewQuery.reports_total_rows());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RequestKind::ViewQuery.to_string(), "view-query");
        assert_eq!(RequestKind::RawQuery.to_string(), "raw-query");
    }
}
