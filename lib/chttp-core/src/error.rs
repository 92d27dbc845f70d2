//! Error types for chttp.
//!
//! - [`TransportError`] is what middleware and terminal transports return: the
//!   request never produced a usable response.
//! - [`Error`] classifies a whole JSON exchange: marshal, dispatch, read,
//!   status and decode failures.

use std::error::Error as StdError;

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::DecodeError;

/// A boxed error usable across threads.
pub type BoxError = Box<dyn StdError + Send + Sync>;

// ============================================================================
// Transport Error
// ============================================================================

/// Failure while producing a response: request construction, network,
/// middleware or redirect handling.
#[derive(Debug, Display, Error, From)]
pub enum TransportError {
    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The context deadline or the client timeout expired.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The context was cancelled.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// The response body stream failed.
    #[display("body error: {_0}")]
    #[from(skip)]
    Body(#[error(not(source))] String),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects attempted.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// Failure raised by a middleware or a redirect policy.
    #[display("{_0}")]
    #[from(skip)]
    Middleware(#[error(not(source))] String),
}

/// Result type alias, failing with [`TransportError`] unless told otherwise.
pub type Result<T, E = TransportError> = std::result::Result<T, E>;

impl TransportError {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create a body stream error.
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body(message.into())
    }

    /// Create a middleware-defined error.
    #[must_use]
    pub fn middleware(message: impl Into<String>) -> Self {
        Self::Middleware(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

// ============================================================================
// JSON Exchange Error
// ============================================================================

/// Classified failure of a JSON request.
///
/// Only [`Error::Status`] carries a body worth decoding as a structured API
/// error; see [`Error::is_status_failure`].
#[derive(Debug, Display, Error)]
pub enum Error {
    /// The request payload could not be serialized; nothing was sent.
    #[display("marshaling request error: {_0}")]
    Marshal(serde_json::Error),

    /// The request never produced a response.
    #[display("requesting error: {_0}")]
    Dispatch(TransportError),

    /// A response arrived but its body could not be fully read.
    #[display("reading response body error: {source}")]
    Read {
        /// HTTP status code.
        status: u16,
        /// Bytes received before the failure.
        body: Bytes,
        /// What interrupted the read.
        source: TransportError,
    },

    /// The server answered with a status code of 300 or above.
    #[display("http error, status_code={status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Full response body.
        body: Bytes,
    },

    /// A success response body did not match the expected shape.
    #[display("unmarshaling response error: {source}")]
    Decode {
        /// HTTP status code.
        status: u16,
        /// Full response body.
        body: Bytes,
        /// Deserialization failure, with the JSON path.
        source: DecodeError,
    },
}

impl Error {
    /// `true` only when the server answered with a failure status and no
    /// other cause applies.
    #[must_use]
    pub const fn is_status_failure(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Returns the HTTP status code when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Read { status, .. } | Self::Status { status, .. } | Self::Decode { status, .. } => {
                Some(*status)
            }
            Self::Marshal(_) | Self::Dispatch(_) => None,
        }
    }

    /// Returns the raw (possibly partial) response body when one was read.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Read { body, .. } | Self::Status { body, .. } | Self::Decode { body, .. } => {
                Some(body)
            }
            Self::Marshal(_) | Self::Dispatch(_) => None,
        }
    }

    /// Decode the body of a status failure.
    ///
    /// Returns `None` for every other kind of error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(Debug, Deserialize)]
    /// struct ApiError {
    ///     code: String,
    ///     message: String,
    /// }
    ///
    /// if let Err(err) = json.get(&ctx, &url, NO_BODY, Some(&mut user)).await {
    ///     if let Some(Ok(api)) = err.unmarshal_error_body::<ApiError>() {
    ///         println!("API error: {} - {}", api.code, api.message);
    ///     }
    /// }
    /// ```
    pub fn unmarshal_error_body<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Option<std::result::Result<T, DecodeError>> {
        match self {
            Self::Status { body, .. } => Some(crate::from_json(body)),
            _ => None,
        }
    }

    /// Decode the body of a status failure into `sink`.
    ///
    /// Returns `Ok(true)` when the body was decoded, `Ok(false)` when this is
    /// not a status failure and nothing was attempted.
    pub fn unmarshal_error_body_into<T: serde::de::DeserializeOwned>(
        &self,
        sink: &mut T,
    ) -> std::result::Result<bool, DecodeError> {
        match self.unmarshal_error_body() {
            Some(decoded) => {
                *sink = decoded?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Recover a typed API error payload from any error.
///
/// Walks the source chain of `err`; when it finds an [`Error`] that is a
/// status failure, the carried body is decoded into `T` and returned in place
/// of the error. A decode failure replaces the original error. Any other error
/// is returned unchanged.
///
/// ```ignore
/// match json.get(&ctx, &url, NO_BODY, Some(&mut pet)).await {
///     Ok(()) => {}
///     Err(err) => match unmarshal_error_to::<ApiError, _>(err) {
///         Ok(api) => println!("rejected: {}", api.message),
///         Err(other) => return Err(other),
///     },
/// }
/// ```
pub fn unmarshal_error_to<T, E>(err: E) -> std::result::Result<T, BoxError>
where
    T: serde::de::DeserializeOwned,
    E: Into<BoxError>,
{
    let err = err.into();

    let decoded = {
        let mut current: Option<&(dyn StdError + 'static)> = Some(&*err);
        let mut found = None;
        while let Some(candidate) = current {
            if let Some(error) = candidate.downcast_ref::<Error>() {
                found = Some(error);
                break;
            }
            current = candidate.source();
        }
        found.and_then(Error::unmarshal_error_body::<T>)
    };

    match decoded {
        Some(Ok(value)) => Ok(value),
        Some(Err(decode)) => Err(Box::new(decode)),
        None => Err(err),
    }
}
