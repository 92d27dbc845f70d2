//! HTTP client with an ordered, runtime-extensible middleware chain and a
//! typed JSON layer on top.
//!
//! Every request runs through the middleware registered on its [`Client`],
//! first registered outermost, then through the terminal transport (hyper
//! over rustls unless replaced). [`JsonClient`] adds payload serialization and
//! classifies every outcome as an [`Error`].
//!
//! # Example
//!
//! ```ignore
//! use chttp::prelude::*;
//! use chttp::middleware::{self, Trace, TracingLogger};
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Pet {
//!     id: u64,
//!     name: String,
//! }
//!
//! let json = Client::builder()
//!     .timeout(Duration::from_secs(10))
//!     .with(middleware::json())
//!     .with(Trace::new(TracingLogger::new()))
//!     .build_json();
//!
//! let mut pet = Pet::default();
//! json.get(&Context::background(), "https://petstore.example/pet/1", NO_BODY, Some(&mut pet))
//!     .await?;
//! ```

mod chain;
mod client;
pub mod config;
pub mod cookie;
mod hyper_transport;
mod json;
pub mod middleware;
pub mod prelude;
pub mod redirect;
mod transport;
mod typed;

pub use client::{Client, ClientBuilder, Verb};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use hyper_transport::HyperTransport;
pub use json::{JsonClient, JsonVerb, NO_BODY};
pub use transport::{BoxedService, ServiceFuture};
pub use typed::{TypedJsonClient, TypedVerb};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use chttp_core::{
    APPLICATION_JSON, Body, BoxError, CancellationToken, Context, DecodeError, Error, Method,
    PartialBody, Request, RequestBuilder, Response, Result, TransportError, from_json, to_json,
    unmarshal_error_to,
};

// Re-export http types for status codes and headers
pub use chttp_core::{HeaderMap, StatusCode, header};

pub use url;
