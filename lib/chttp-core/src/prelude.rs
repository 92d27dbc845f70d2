//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use chttp_core::prelude::*;
//! ```

pub use crate::{
    Body, Context, Error, Method, Request, RequestBuilder, Response, Result, TransportError,
    from_json, to_json, unmarshal_error_to,
};
