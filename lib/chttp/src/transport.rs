//! Per-request composition of the middleware chain around the terminal transport.
//!
//! Every dispatch builds a fresh, single-use service stack from a chain
//! snapshot: the first-registered interceptor ends up outermost and the
//! terminal transport innermost.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tower::ServiceExt;
use tower::util::BoxCloneService;

use crate::{Request, Response, Result, TransportError};

// ============================================================================
// Type-Erased Services
// ============================================================================

/// Type-erased service for middleware composition.
///
/// Both the terminal transport and every stage of the chain have this shape.
pub type BoxedService = BoxCloneService<Request, Response, TransportError>;

/// Future returned by middleware and services.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// One chain entry: wraps "everything after me" into a new service.
pub(crate) type Interceptor = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Thread-safe handle on the terminal transport.
///
/// `BoxedService` is not `Sync`; the mutex is only held long enough to clone it.
#[derive(Clone)]
pub(crate) struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    pub(crate) fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    /// A fresh clone of the wrapped service.
    pub(crate) fn service(&self) -> BoxedService {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Stack `snapshot` around `terminal`, first entry outermost.
pub(crate) fn compose(snapshot: &[Interceptor], terminal: BoxedService) -> BoxedService {
    snapshot
        .iter()
        .rev()
        .fold(terminal, |next, interceptor| interceptor(next))
}

/// Run exactly one request through `snapshot` and `terminal`.
///
/// Errors from any stage propagate unchanged.
pub(crate) fn dispatch(
    snapshot: &[Interceptor],
    terminal: BoxedService,
    request: Request,
) -> ServiceFuture {
    let service = compose(snapshot, terminal);
    Box::pin(service.oneshot(request))
}
