//! Redirect policy.
//!
//! The client follows redirects itself, outside the middleware chain: every
//! hop is a new dispatch through a fresh chain snapshot, so middleware sees
//! each hop as its own request.
//!
//! - 301, 302 and 303 switch to `GET` (`HEAD` stays `HEAD`) and drop the body.
//! - 307 and 308 keep the method and body.
//! - `Authorization` and `Cookie` are not forwarded to another host.
//! - A redirect status without a `Location` header is returned as-is.

use std::fmt;
use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION};
use url::Url;

use crate::{Method, Request, Response, Result, TransportError};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// What to do with a redirect response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send the next request.
    Follow,
    /// Return the redirect response to the caller.
    Stop,
}

/// A redirect about to be followed.
#[derive(Debug)]
pub struct Attempt<'a> {
    status: u16,
    next: &'a Request,
    previous: &'a [Url],
}

impl<'a> Attempt<'a> {
    /// Status of the redirect response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// The request that would be sent next.
    #[must_use]
    pub const fn next(&self) -> &'a Request {
        self.next
    }

    /// URLs already requested, oldest first. Never empty.
    #[must_use]
    pub const fn previous(&self) -> &'a [Url] {
        self.previous
    }
}

type CheckFn = dyn Fn(&Attempt<'_>) -> Result<Action> + Send + Sync;

#[derive(Clone)]
enum Kind {
    Limited(usize),
    None,
    Custom(Arc<CheckFn>),
}

/// Decides whether a redirect is followed.
///
/// ```ignore
/// use chttp::redirect::{Action, Policy};
///
/// let same_host = Policy::custom(|attempt| {
///     let first = &attempt.previous()[0];
///     if attempt.next().url().host() == first.host() {
///         Ok(Action::Follow)
///     } else {
///         Ok(Action::Stop)
///     }
/// });
/// ```
#[derive(Clone)]
pub struct Policy {
    kind: Kind,
}

impl Policy {
    /// Follow at most `max` redirects, then fail with
    /// [`TransportError::TooManyRedirects`].
    #[must_use]
    pub const fn limited(max: usize) -> Self {
        Self {
            kind: Kind::Limited(max),
        }
    }

    /// Never follow: the redirect response is returned.
    #[must_use]
    pub const fn none() -> Self {
        Self { kind: Kind::None }
    }

    /// Decide with `check`; an error aborts the request.
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Attempt<'_>) -> Result<Action> + Send + Sync + 'static,
    {
        Self {
            kind: Kind::Custom(Arc::new(check)),
        }
    }

    pub(crate) fn check(&self, status: u16, next: &Request, previous: &[Url]) -> Result<Action> {
        match &self.kind {
            Kind::Limited(max) if previous.len() > *max => Err(TransportError::TooManyRedirects {
                count: previous.len(),
                max: *max,
            }),
            Kind::Limited(_) => Ok(Action::Follow),
            Kind::None => Ok(Action::Stop),
            Kind::Custom(check) => check(&Attempt {
                status,
                next,
                previous,
            }),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::limited(DEFAULT_MAX_REDIRECTS)
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Limited(max) => f.debug_tuple("Limited").field(max).finish(),
            Kind::None => f.write_str("None"),
            Kind::Custom(_) => f.write_str("Custom"),
        }
    }
}

// ============================================================================
// Hop Construction
// ============================================================================

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn redirect_method(status: u16, original: Method) -> Method {
    match status {
        307 | 308 => original,
        _ if original == Method::Head => Method::Head,
        _ => Method::Get,
    }
}

fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }

    base_url
        .join(location)
        .map_err(|e| TransportError::InvalidRedirect(format!("{location}: {e}")))
}

/// The request to send after `response`, or `None` when it is not a
/// followable redirect.
pub(crate) fn next_request(previous: &Request, response: &Response) -> Result<Option<Request>> {
    let status = response.status();
    if !is_redirect(status) {
        return Ok(None);
    }
    let Some(location) = response.headers().get(LOCATION) else {
        return Ok(None);
    };
    let location = location
        .to_str()
        .map_err(|e| TransportError::InvalidRedirect(e.to_string()))?;

    let url = resolve_redirect_url(previous.url(), location)?;
    let method = redirect_method(status, previous.method());
    let keep_body = matches!(status, 307 | 308);

    let mut headers = previous.headers().clone();
    headers.remove(CONTENT_LENGTH);
    if !keep_body {
        headers.remove(CONTENT_TYPE);
    }
    if url.host_str() != previous.url().host_str() {
        headers.remove(AUTHORIZATION);
        headers.remove(COOKIE);
    }

    let mut builder = Request::builder(method, url)
        .headers(headers)
        .context(previous.context().clone());
    if keep_body && let Some(body) = previous.body() {
        builder = builder.body(body.clone());
    }
    Ok(Some(builder.build()))
}
