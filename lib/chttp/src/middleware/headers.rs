//! Header-setting middleware.

use std::fmt;

use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};

use super::{Middleware, Next};
use crate::transport::ServiceFuture;
use crate::{APPLICATION_JSON, HeaderMap, Request, Result, TransportError};

/// Adds a fixed set of headers to every request.
///
/// With `force`, existing values are replaced; otherwise a header the request
/// already carries is left untouched.
///
/// ```ignore
/// use chttp::middleware::Headers;
///
/// client.with(Headers::from_pairs([("api_key", "secret")], true)?);
/// ```
#[derive(Debug, Clone)]
pub struct Headers {
    headers: HeaderMap,
    force: bool,
}

impl Headers {
    /// Set `headers`, overwriting existing values when `force` is true.
    #[must_use]
    pub const fn new(headers: HeaderMap, force: bool) -> Self {
        Self { headers, force }
    }

    /// Build from string pairs.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] when a name or value is not a
    /// valid header.
    pub fn from_pairs<I, K, V>(pairs: I, force: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::try_from(name.as_ref())
                .map_err(|err| TransportError::invalid_request(format!("header name: {err}")))?;
            let value = HeaderValue::try_from(value.as_ref()).map_err(|err| {
                TransportError::invalid_request(format!("header value for {name}: {err}"))
            })?;
            headers.append(name, value);
        }
        Ok(Self::new(headers, force))
    }

    fn apply(&self, target: &mut HeaderMap) {
        for name in self.headers.keys() {
            if !self.force && target.contains_key(name) {
                continue;
            }
            target.remove(name);
            for value in self.headers.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }
}

impl Middleware for Headers {
    fn handle(&self, mut request: Request, next: Next) -> ServiceFuture {
        self.apply(request.headers_mut());
        next.run(request)
    }
}

/// `Content-Type` and `Accept` set to `application/json` unless already present.
#[must_use]
pub fn json() -> Headers {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    Headers::new(headers, false)
}

/// Adds headers computed from each request, replacing existing values.
///
/// ```ignore
/// use chttp::middleware::CustomHeaders;
/// use chttp::{HeaderMap, Method};
///
/// client.with(CustomHeaders::new(|request| {
///     let mut headers = HeaderMap::new();
///     if request.method() == Method::Post {
///         headers.insert("accept", "*/*".parse().unwrap());
///     }
///     headers
/// }));
/// ```
#[derive(Clone)]
pub struct CustomHeaders<F> {
    headers: F,
}

impl<F> CustomHeaders<F>
where
    F: Fn(&Request) -> HeaderMap + Send + Sync + 'static,
{
    /// Compute headers with `headers`.
    pub const fn new(headers: F) -> Self {
        Self { headers }
    }
}

impl<F> fmt::Debug for CustomHeaders<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHeaders").finish_non_exhaustive()
    }
}

impl<F> Middleware for CustomHeaders<F>
where
    F: Fn(&Request) -> HeaderMap + Send + Sync + 'static,
{
    fn handle(&self, mut request: Request, next: Next) -> ServiceFuture {
        let computed = (self.headers)(&request);
        Headers::new(computed, true).apply(request.headers_mut());
        next.run(request)
    }
}
