//! Response body fixtures.

use bytes::Bytes;
use serde_json::{Value, json};

/// Filler used by [`BodyLayout::Synthetic`] in place of the framing token.
pub const SYNTHETIC_FRAMING: &str = "XXXXXXXX";

/// Shape of a view response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyLayout {
    /// `{"total_rows":N,"rows":[row,row]}` with optional trailer members.
    #[default]
    Json,
    /// `total_rows:N,XXXXXXXX` followed by concatenated row objects.
    Synthetic,
}

/// Builder for view response bodies.
#[derive(Debug, Clone, Default)]
pub struct ViewBody {
    layout: BodyLayout,
    total_rows: Option<u64>,
    rows: Vec<String>,
    errors: Vec<Value>,
    pretty: bool,
}

impl ViewBody {
    /// Start an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the body layout.
    #[must_use]
    pub fn layout(mut self, layout: BodyLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Announce a row count other than the number of rows.
    #[must_use]
    pub fn total_rows(mut self, total: u64) -> Self {
        self.total_rows = Some(total);
        self
    }

    /// Append one row object, given as JSON text.
    #[must_use]
    pub fn row(mut self, row: impl Into<String>) -> Self {
        self.rows.push(row.into());
        self
    }

    /// Append several row objects.
    #[must_use]
    pub fn rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Add an `errors` trailer entry. Ignored by the synthetic layout.
    #[must_use]
    pub fn error(mut self, error: Value) -> Self {
        self.errors.push(error);
        self
    }

    /// Put each row on its own line, the way the view engine streams them.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// The row texts in order.
    #[must_use]
    pub fn row_texts(&self) -> &[String] {
        &self.rows
    }

    /// The announced row count.
    #[must_use]
    pub fn announced_total(&self) -> u64 {
        self.total_rows.unwrap_or(self.rows.len() as u64)
    }

    /// Render the body.
    #[must_use]
    pub fn build(&self) -> Bytes {
        let total = self.announced_total();
        let body = match self.layout {
            BodyLayout::Synthetic => {
                format!("total_rows:{total},{SYNTHETIC_FRAMING}{}", self.rows.concat())
            }
            BodyLayout::Json => {
                let separator = if self.pretty { ",\r\n" } else { "," };
                let open = if self.pretty { "\r\n" } else { "" };
                let mut body = format!("{{\"total_rows\":{total},\"rows\":[{open}");
                body.push_str(&self.rows.join(separator));
                body.push_str(open);
                body.push(']');
                if !self.errors.is_empty() {
                    body.push_str(",\"errors\":");
                    body.push_str(&Value::Array(self.errors.clone()).to_string());
                }
                body.push_str("\n}");
                body
            }
        };
        Bytes::from(body)
    }
}

/// Builder for raw query response bodies.
#[derive(Debug, Clone)]
pub struct QueryBody {
    request_id: String,
    results: Vec<String>,
    status: String,
    errors: Vec<Value>,
}

impl QueryBody {
    /// Start a successful body with no results.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            results: Vec::new(),
            status: "success".into(),
            errors: Vec::new(),
        }
    }

    /// Append one result object, given as JSON text.
    #[must_use]
    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.results.push(result.into());
        self
    }

    /// Set the reported status.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Add an error entry.
    #[must_use]
    pub fn error(mut self, error: Value) -> Self {
        self.errors.push(error);
        self
    }

    /// The result texts in order.
    #[must_use]
    pub fn result_texts(&self) -> &[String] {
        &self.results
    }

    /// Render the body.
    #[must_use]
    pub fn build(&self) -> Bytes {
        let mut body = format!(
            "{{\n\"requestID\": {},\n\"signature\": {{\"*\":\"*\"}},\n\"results\": [\n",
            Value::String(self.request_id.clone())
        );
        body.push_str(&self.results.join(",\n"));
        body.push_str("\n],\n");
        if !self.errors.is_empty() {
            body.push_str(&format!(
                "\"errors\": {},\n",
                Value::Array(self.errors.clone())
            ));
        }
        body.push_str(&format!(
            "\"status\": {},\n\"metrics\": {}\n}}\n",
            Value::String(self.status.clone()),
            json!({"resultCount": self.results.len()})
        ));
        Bytes::from(body)
    }
}

/// Realistic view rows whose values contain braces, quotes and escapes.
#[must_use]
pub fn sample_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            json!({
                "id": format!("brewery-{i}"),
                "key": ["us", format!("city {{{i}}}")],
                "value": {
                    "name": format!("The \"Brace\" {{{i}}} Works"),
                    "path": format!("C:\\beer\\{i}"),
                    "tags": ["ale", "}", "{"],
                },
            })
            .to_string()
        })
        .collect()
}
