//! # viewwire-testing
//!
//! Test infrastructure for the view/query wire codec.
//!
//! ## Features
//!
//! - Body builders for view and raw query responses, in both the JSON layout
//!   the server sends and the compact synthetic layout
//! - Chunk splitting helpers for exercising arbitrary transport boundaries
//! - A synchronous harness that records every event it feeds
//! - A decoder task driven over a channel, for cross-task delivery tests
//!
//! ## Example
//!
//! ```rust
//! use viewwire_protocol::{Request, ResponseStatus};
//! use viewwire_testing::chunking::byte_by_byte;
//! use viewwire_testing::fixtures::{ViewBody, sample_rows};
//! use viewwire_testing::Harness;
//!
//! let mut harness = Harness::default();
//! harness.send(Request::view("beer-sample", "beer", "by_name")).unwrap();
//!
//! let body = ViewBody::new().rows(sample_rows(2)).build();
//! let response = harness.respond(200, byte_by_byte(&body)).unwrap();
//! assert_eq!(response.status(), ResponseStatus::Success);
//! assert_eq!(response.row_handle().emitted(), 2);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod chunking;
pub mod fixtures;
pub mod harness;

pub use fixtures::{BodyLayout, QueryBody, ViewBody};
pub use harness::{DecoderTask, Harness, HarnessError};
