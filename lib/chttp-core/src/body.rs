//! Response bodies and JSON serialization utilities.

use std::fmt;

use bytes::{Bytes, BytesMut};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::TransportError;
use crate::finite;

/// Content type used by the JSON helpers.
pub const APPLICATION_JSON: &str = "application/json";

/// Error returned when a response body could not be deserialized.
///
/// Carries the JSON path of the offending field.
pub type DecodeError = serde_path_to_error::Error<serde_json::Error>;

/// A streamed response body.
///
/// The body is pulled lazily from the transport; dropping it releases the
/// underlying connection.
pub struct Body {
    inner: BoxBody<Bytes, TransportError>,
}

impl Body {
    /// Wrap any body producing [`Bytes`] frames.
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes, Error = TransportError> + Send + Sync + 'static,
    {
        Self {
            inner: BoxBody::new(body),
        }
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Empty::new().map_err(|never| match never {}))
    }

    /// Whether the transport already knows the body has no more data.
    #[must_use]
    pub fn is_end_stream(&self) -> bool {
        http_body::Body::is_end_stream(&self.inner)
    }

    /// Exact length, when the transport announced one.
    #[must_use]
    pub fn size_hint(&self) -> Option<u64> {
        http_body::Body::size_hint(&self.inner).exact()
    }

    /// Read every data frame into one buffer.
    ///
    /// On failure the bytes received so far are returned alongside the cause.
    pub async fn read_all(self) -> std::result::Result<Bytes, PartialBody> {
        let mut buffer = BytesMut::new();
        match self.read_into(&mut buffer).await {
            Ok(()) => Ok(buffer.freeze()),
            Err(source) => Err(PartialBody {
                received: buffer.freeze(),
                source,
            }),
        }
    }

    /// Append every data frame to `buffer`.
    ///
    /// Frames are appended as they arrive, so `buffer` holds the received
    /// bytes even when the read fails or the future is dropped part-way.
    pub async fn read_into(self, buffer: &mut BytesMut) -> std::result::Result<(), TransportError> {
        let mut body = self.inner;
        while let Some(frame) = body.frame().await {
            // trailers are ignored
            if let Ok(data) = frame?.into_data() {
                buffer.extend_from_slice(&data);
            }
        }
        Ok(())
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("size_hint", &self.size_hint())
            .finish_non_exhaustive()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::new(Full::new(bytes).map_err(|never| match never {}))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

/// A body read that failed part-way.
#[derive(Debug)]
pub struct PartialBody {
    /// Bytes received before the failure.
    pub received: Bytes,
    /// What interrupted the read.
    pub source: TransportError,
}

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use chttp_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> serde_json::Result<Bytes> {
    finite::check(value)?;
    serde_json::to_vec(value).map(Bytes::from)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so the error names the exact path to the field
/// that failed to deserialize.
///
/// # Example
///
/// ```
/// use chttp_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
}
