//! Middleware contract and bundled interceptors.
//!
//! A middleware receives the outgoing [`Request`] and a [`Next`] continuation
//! standing for "everything registered after me, then the network". It may
//! rewrite the request, skip `next` entirely and answer on its own, call it
//! several times, and inspect or replace whatever comes back.
//!
//! Middleware registered first runs first (outermost).
//!
//! # Bundled Middleware
//!
//! - [`Headers`] - static headers, optionally overwriting existing ones
//! - [`CustomHeaders`] - headers computed from each request
//! - [`json()`] - `Content-Type` and `Accept` set to `application/json`
//! - [`Trace`] - one structured log entry per request
//! - [`DebugDump`] - dumps requests and response heads when active
//!
//! # Example
//!
//! ```ignore
//! use chttp::Client;
//! use chttp::middleware::{self, Next, Trace, TracingLogger};
//!
//! let client = Client::builder()
//!     .with(middleware::json())
//!     .with(Trace::new(TracingLogger::new()))
//!     .build();
//!
//! client.with(middleware::from_fn(|request, next: Next| async move {
//!     let response = next.run(request).await?;
//!     tracing::info!(status = response.status(), "observed");
//!     Ok(response)
//! }));
//! ```
//!
//! Any `tower::Layer` over [`BoxedService`] can be appended with
//! [`Client::layer`](crate::Client::layer) as well.

mod debug;
mod headers;
mod logger;
mod trace;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Service, ServiceExt};

use crate::transport::{BoxedService, ServiceFuture};
use crate::{Request, Response, Result, TransportError};

pub use debug::DebugDump;
pub use headers::{CustomHeaders, Headers, json};
pub use logger::{LogEntry, LogLevel, Logger, NoopLogger, TracingLogger};
pub use trace::Trace;

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};

// ============================================================================
// Contract
// ============================================================================

/// A request interceptor.
pub trait Middleware: Send + Sync + 'static {
    /// Handle `request`, delegating to `next` when appropriate.
    fn handle(&self, request: Request, next: Next) -> ServiceFuture;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn handle(&self, request: Request, next: Next) -> ServiceFuture {
        (**self).handle(request, next)
    }
}

/// The rest of the chain, ending with the terminal transport.
///
/// Cloning is cheap; each [`Next::run`] drives a fresh clone, so the
/// continuation may be called any number of times.
#[derive(Clone)]
pub struct Next {
    inner: BoxedService,
}

impl Next {
    pub(crate) fn new(inner: BoxedService) -> Self {
        Self { inner }
    }

    /// Send `request` down the rest of the chain.
    pub fn run(&self, request: Request) -> ServiceFuture {
        let service = self.inner.clone();
        Box::pin(service.oneshot(request))
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

// ============================================================================
// Closure Adapter
// ============================================================================

/// Middleware built from a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// Turn a closure `(request, next) -> future` into a [`Middleware`].
///
/// ```ignore
/// let deny = middleware::from_fn(|_request, _next| async {
///     Err(TransportError::middleware("offline mode"))
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    FromFn { f }
}

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn handle(&self, request: Request, next: Next) -> ServiceFuture {
        Box::pin((self.f)(request, next))
    }
}

// ============================================================================
// Tower Adapter
// ============================================================================

/// Layer running a [`Middleware`] in front of the wrapped service.
#[derive(Clone)]
pub struct MiddlewareLayer {
    middleware: Arc<dyn Middleware>,
}

impl MiddlewareLayer {
    /// Wrap a middleware.
    pub fn new<M: Middleware>(middleware: M) -> Self {
        Self {
            middleware: Arc::new(middleware),
        }
    }
}

impl fmt::Debug for MiddlewareLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareLayer").finish_non_exhaustive()
    }
}

impl Layer<BoxedService> for MiddlewareLayer {
    type Service = MiddlewareService;

    fn layer(&self, inner: BoxedService) -> Self::Service {
        MiddlewareService {
            middleware: Arc::clone(&self.middleware),
            next: inner,
        }
    }
}

/// Service that hands each request to a [`Middleware`].
#[derive(Clone)]
pub struct MiddlewareService {
    middleware: Arc<dyn Middleware>,
    next: BoxedService,
}

impl fmt::Debug for MiddlewareService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareService").finish_non_exhaustive()
    }
}

impl Service<Request> for MiddlewareService {
    type Response = Response;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // readiness of the rest of the chain is driven by `Next::run`
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.middleware
            .handle(request, Next::new(self.next.clone()))
    }
}
