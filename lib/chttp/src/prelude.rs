//! Prelude module for convenient imports.
//!
//! ```ignore
//! use chttp::prelude::*;
//! ```

pub use crate::middleware::{Middleware, Next};
pub use crate::{
    Body, Client, ClientBuilder, Context, Error, JsonClient, Method, NO_BODY, Request, Response,
    Result, TransportError, TypedJsonClient, unmarshal_error_to,
};

// Re-export serde derives for API models
pub use serde::{Deserialize, Serialize};
