//! Per-request summary logging.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use super::{LogEntry, Logger, Middleware, Next, NoopLogger};
use crate::transport::ServiceFuture;
use crate::Request;

/// Logs one entry per request once the rest of the chain has answered.
///
/// Fields: `method`, `host`, `path`, `request_time`, then `status_code` and
/// `content_length` (`-1` when unknown) on success or `error` on failure.
/// The call runs inside an `http_request` tracing span.
///
/// # Example
///
/// ```ignore
/// use chttp::middleware::{Trace, TracingLogger};
///
/// client.with(Trace::new(TracingLogger::new()));
/// ```
#[derive(Clone)]
pub struct Trace {
    logger: Arc<dyn Logger>,
}

impl Trace {
    /// Trace into `logger`.
    #[must_use]
    pub fn new<L: Logger>(logger: L) -> Self {
        Self {
            logger: Arc::new(logger),
        }
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(NoopLogger)
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace").finish_non_exhaustive()
    }
}

impl Middleware for Trace {
    fn handle(&self, request: Request, next: Next) -> ServiceFuture {
        let logger = Arc::clone(&self.logger);
        let method = request.method();
        let host = host_of(request.url());
        let path = request.url().path().to_owned();

        let span = tracing::info_span!("http_request", %method, %host, %path);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = next.run(request).await;

                let mut entry = LogEntry::new("http client response")
                    .field("method", method)
                    .field("host", &host)
                    .field("path", &path)
                    .field("request_time", format!("{:?}", start.elapsed()));
                match &result {
                    Ok(response) => {
                        let length = response
                            .content_length()
                            .or_else(|| response.body().size_hint());
                        entry = entry.field("status_code", response.status()).field(
                            "content_length",
                            length.map_or_else(|| "-1".to_owned(), |len| len.to_string()),
                        );
                    }
                    Err(err) => entry = entry.field("error", err),
                }
                logger.log(&entry);

                result
            }
            .instrument(span),
        )
    }
}

/// `host[:port]` as sent in the `Host` header.
pub(super) fn host_of(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    }
}
