//! Wire-level dumps for debugging.

use std::fmt;
use std::sync::Arc;

use super::trace::host_of;
use super::{LogEntry, Logger, Middleware, Next, NoopLogger};
use crate::transport::ServiceFuture;
use crate::{HeaderMap, Request, Response};

/// Dumps each request (line, headers and body) before sending it and the
/// response head afterwards. Does nothing unless `active`.
///
/// Every entry carries `method`, `host` and `path`; the dump itself is in the
/// `request` or `response` field, failures in `error`.
///
/// ```ignore
/// let verbose = std::env::var("DEBUG").is_ok_and(|value| value == "true");
/// client.with(DebugDump::new(verbose, TracingLogger::debug()));
/// ```
#[derive(Clone)]
pub struct DebugDump {
    active: bool,
    logger: Arc<dyn Logger>,
}

impl DebugDump {
    /// Dump into `logger` when `active`.
    #[must_use]
    pub fn new<L: Logger>(active: bool, logger: L) -> Self {
        Self {
            active,
            logger: Arc::new(logger),
        }
    }
}

impl Default for DebugDump {
    fn default() -> Self {
        Self::new(false, NoopLogger)
    }
}

impl fmt::Debug for DebugDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugDump")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Middleware for DebugDump {
    fn handle(&self, request: Request, next: Next) -> ServiceFuture {
        if !self.active {
            return next.run(request);
        }

        let logger = Arc::clone(&self.logger);
        let entry = |message| {
            LogEntry::new(message)
                .field("method", request.method())
                .field("host", host_of(request.url()))
                .field("path", request.url().path())
        };
        logger.log(&entry("dump request").field("request", dump_request(&request)));
        let after = entry("dump response");

        Box::pin(async move {
            let result = next.run(request).await;
            match &result {
                Ok(response) => logger.log(&after.field("response", dump_response(response))),
                Err(err) => logger.log(&LogEntry::new("error requesting").field("error", err)),
            }
            result
        })
    }
}

fn dump_request(request: &Request) -> String {
    let url = request.url();
    let mut target = url.path().to_owned();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut dump = format!("{} {target} HTTP/1.1\r\n", request.method());
    dump.push_str(&format!("Host: {}\r\n", host_of(url)));
    dump_headers(&mut dump, request.headers());
    dump.push_str("\r\n");
    if let Some(body) = request.body() {
        dump.push_str(&String::from_utf8_lossy(body));
    }
    dump
}

fn dump_response(response: &Response) -> String {
    let reason = http::StatusCode::from_u16(response.status())
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or_default();
    let mut dump = format!("HTTP/1.1 {} {reason}\r\n", response.status());
    dump_headers(&mut dump, response.headers());
    dump.push_str("\r\n");
    dump
}

fn dump_headers(dump: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        dump.push_str(&format!("{name}: {value}\r\n"));
    }
}
