//! Core types for the chttp middleware HTTP client.
//!
//! This crate provides the foundational types used by chttp:
//! - [`Method`] - HTTP method enum and verb-name lookup
//! - [`Context`] - per-request cancellation and deadline
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] and [`Body`] - HTTP response with a streamed body
//! - [`TransportError`] - failures while producing a response
//! - [`Error`] - classified failures of a JSON exchange
//! - [`to_json`] / [`from_json`] - JSON helpers
//! - [`header`] - HTTP header names and values (re-exported from `http` crate)

mod body;
mod context;
mod error;
mod finite;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{APPLICATION_JSON, Body, DecodeError, PartialBody, from_json, to_json};
pub use context::{CancellationToken, Context};
pub use error::{BoxError, Error, Result, TransportError, unmarshal_error_to};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, StatusCode, header};
