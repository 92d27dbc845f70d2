//! Per-request cancellation and deadline.
//!
//! A [`Context`] is attached to every [`Request`](crate::Request) when it is
//! built. The client races the whole exchange (every redirect hop and, for the
//! JSON layer, the body read) against it.
//!
//! ```
//! use std::time::Duration;
//! use chttp_core::{CancellationToken, Context};
//!
//! let token = CancellationToken::new();
//! let ctx = Context::background()
//!     .with_timeout(Duration::from_secs(5))
//!     .with_cancellation(token.clone());
//!
//! assert!(ctx.deadline().is_some());
//! token.cancel();
//! assert!(ctx.is_cancelled());
//! ```

use std::time::{Duration, Instant};

pub use tokio_util::sync::CancellationToken;

/// Cancellation signal and optional deadline for a request.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl Context {
    /// An empty context: never cancelled, no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Set a deadline `timeout` from now.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` once the attached token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Completes when the attached token is cancelled; pending forever without one.
    pub async fn cancelled(&self) {
        match &self.cancellation {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }
}
