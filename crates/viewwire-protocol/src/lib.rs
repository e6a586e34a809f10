//! # viewwire-protocol
//!
//! IO-agnostic pieces of the view/query engine wire protocol.
//!
//! This crate turns logical [`Request`] values into outbound HTTP/1.1 bytes
//! and maps response status codes onto [`ResponseStatus`]. It contains no
//! networking logic and no decoding state; the streaming response decoder
//! lives in `viewwire-codec`.
//!
//! ## Example
//!
//! ```
//! use viewwire_protocol::{EncodeOptions, Request, encode_request};
//!
//! let request: Request = Request::view("beer-sample", "beer", "brewery_beers")
//!     .with_query("limit=10")
//!     .development(true)
//!     .into();
//!
//! let http = encode_request(&request, &EncodeOptions::default()).unwrap();
//! assert_eq!(http.path(), "/beer-sample/_design/dev_beer/_view/brewery_beers?limit=10");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod encode;
pub mod error;
pub mod http;
pub mod request;
pub mod status;

pub use encode::{EncodeOptions, encode_request};
pub use error::ProtocolError;
pub use http::{HttpMethod, HttpRequest};
pub use request::{RawQuery, Request, RequestKind, ViewLookup};
pub use status::ResponseStatus;

/// Path the raw-query service accepts POSTed statements on.
pub const QUERY_PATH: &str = "/query";

/// Prefix applied to design document names in development mode.
pub const DEV_DESIGN_PREFIX: &str = "dev_";

/// Length of the fixed framing token that follows the `total_rows` field.
///
/// The engine spells it `"rows":[`.
pub const FRAMING_TOKEN_LEN: usize = 8;

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = concat!("viewwire/", env!("CARGO_PKG_VERSION"));
