//! The middleware client and its request executor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{COOKIE, SET_COOKIE};
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::{debug, warn};
use url::Url;

use crate::chain::Chain;
use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::cookie::CookieJar;
use crate::hyper_transport::HyperTransport;
use crate::json::JsonClient;
use crate::middleware::{Middleware, MiddlewareLayer};
use crate::redirect::{self, Action, Policy};
use crate::transport::{self, BoxedService, Interceptor, SyncService};
use crate::{Context, Method, Request, Response, Result, TransportError};

// ============================================================================
// Client
// ============================================================================

/// HTTP client running every request through an ordered middleware chain.
///
/// Middleware can be appended at any time, also while requests are in
/// flight; a request only sees the middleware registered when it was
/// dispatched.
///
/// # Example
///
/// ```ignore
/// use chttp::{Client, Context, middleware};
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(10))
///     .with(middleware::json())
///     .build();
///
/// let response = client.get(&Context::background(), "https://example.com", None).await?;
/// let body = response.bytes().await?;
/// ```
pub struct Client {
    chain: Arc<Chain>,
    config: ClientConfig,
    terminal: SyncService,
}

impl Clone for Client {
    /// An independent client: same middleware and configuration, but later
    /// appends on either side are not seen by the other.
    ///
    /// The terminal transport (and its connection pool) and the cookie jar
    /// are shared.
    fn clone(&self) -> Self {
        Self {
            chain: Arc::new(self.chain.fork()),
            config: self.config.clone(),
            terminal: self.terminal.clone(),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("chain", &self.chain)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client over the default hyper transport, without middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Network configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of registered middleware.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.chain.len()
    }

    /// Append a middleware; it runs after every middleware already registered.
    pub fn with<M: Middleware>(&self, middleware: M) -> &Self {
        self.chain.append([middleware_interceptor(middleware)]);
        self
    }

    /// Append several middleware at once.
    ///
    /// Requests dispatched concurrently see either none or all of them.
    pub fn extend<I>(&self, middleware: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Middleware,
    {
        self.chain
            .append(middleware.into_iter().map(middleware_interceptor));
        self
    }

    /// Append a tower layer.
    pub fn layer<L>(&self, layer: L) -> &Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.chain.append([layer_interceptor(layer)]);
        self
    }

    /// JSON client over this client, sharing its middleware chain.
    #[must_use]
    pub fn json(&self) -> JsonClient {
        JsonClient::new(self)
    }

    /// Same client, same chain: appends through either handle are seen by both.
    pub(crate) fn share(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            config: self.config.clone(),
            terminal: self.terminal.clone(),
        }
    }

    // ========================================================================
    // Executor
    // ========================================================================

    /// Send a request built from the arguments.
    ///
    /// An empty `body` is not attached. The returned body is unread; the
    /// caller decides whether to read it.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidUrl`] for a malformed `url`, otherwise
    /// whatever the middleware chain, the transport, the redirect policy or
    /// the context produce.
    pub async fn request(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<Response> {
        let request = build_request(ctx, method, url, body)?;
        self.execute(request).await
    }

    /// Send a prepared request.
    ///
    /// The request's [`Context`] and the client timeout bound the whole
    /// exchange, redirects included.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let ctx = self.bind(request.context());
        bounded(&ctx, self.follow(request)).await
    }

    /// `ctx` with the client timeout folded into its deadline.
    pub(crate) fn bind(&self, ctx: &Context) -> Context {
        match self.config.timeout {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        }
    }

    async fn follow(&self, mut request: Request) -> Result<Response> {
        let mut previous: Vec<Url> = Vec::new();
        // a caller-supplied Cookie header is never overridden by the jar
        let explicit_cookie = request.headers().contains_key(COOKIE);

        loop {
            if let Some(jar) = &self.config.cookie_jar
                && !explicit_cookie
            {
                attach_cookies(jar.as_ref(), &mut request);
            }

            let snapshot = self.chain.snapshot();
            debug!(
                method = %request.method(),
                url = %request.url(),
                middleware = snapshot.len(),
                "dispatching request"
            );

            let current = request.clone();
            let response =
                transport::dispatch(&snapshot, self.terminal.service(), request).await?;

            if let Some(jar) = &self.config.cookie_jar {
                jar.set_cookies(
                    &mut response.headers().get_all(SET_COOKIE).iter(),
                    current.url(),
                );
            }

            let Some(next) = redirect::next_request(&current, &response)? else {
                return Ok(response);
            };

            previous.push(current.url().clone());
            match self.config.redirect.check(response.status(), &next, &previous) {
                Ok(Action::Follow) => {}
                Ok(Action::Stop) => return Ok(response),
                Err(err) => {
                    warn!(
                        status = response.status(),
                        location = %next.url(),
                        error = %err,
                        "redirect rejected"
                    );
                    return Err(err);
                }
            }

            debug!(
                status = response.status(),
                location = %next.url(),
                hop = previous.len(),
                "following redirect"
            );
            request = next;
        }
    }

    // ========================================================================
    // Verbs
    // ========================================================================

    /// Verb handle by method name; unknown names resolve to `GET`.
    ///
    /// ```ignore
    /// let response = client.method("POST").call(&ctx, url, Some(body)).await?;
    /// ```
    #[must_use]
    pub fn method(&self, name: &str) -> Verb<'_> {
        Verb {
            client: self,
            method: Method::lookup(name),
        }
    }

    /// Send a `GET` request.
    pub async fn get(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Get, url, body).await
    }

    /// Send a `HEAD` request.
    pub async fn head(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Head, url, body).await
    }

    /// Send a `POST` request.
    pub async fn post(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Post, url, body).await
    }

    /// Send a `PUT` request.
    pub async fn put(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Put, url, body).await
    }

    /// Send a `PATCH` request.
    pub async fn patch(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Patch, url, body).await
    }

    /// Send a `DELETE` request.
    pub async fn delete(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Delete, url, body).await
    }

    /// Send a `CONNECT` request.
    pub async fn connect(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Connect, url, body).await
    }

    /// Send an `OPTIONS` request.
    pub async fn options(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Options, url, body).await
    }

    /// Send a `TRACE` request.
    pub async fn trace(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.request(ctx, Method::Trace, url, body).await
    }
}

/// A [`Client`] bound to one method. See [`Client::method`].
#[derive(Debug, Clone, Copy)]
pub struct Verb<'a> {
    client: &'a Client,
    method: Method,
}

impl Verb<'_> {
    /// The resolved method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Send the request.
    pub async fn call(&self, ctx: &Context, url: &str, body: Option<Bytes>) -> Result<Response> {
        self.client.request(ctx, self.method, url, body).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub(crate) fn build_request(
    ctx: &Context,
    method: Method,
    url: &str,
    body: Option<Bytes>,
) -> Result<Request> {
    let url = Url::parse(url)?;
    let mut builder = Request::builder(method, url).context(ctx.clone());
    if let Some(body) = body.filter(|body| !body.is_empty()) {
        builder = builder.body(body);
    }
    Ok(builder.build())
}

/// Race `future` against the cancellation and deadline of `ctx`.
pub(crate) async fn bounded<T, F>(ctx: &Context, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if ctx.is_cancelled() {
        return Err(TransportError::Cancelled);
    }

    let timed = async {
        match ctx.deadline() {
            Some(deadline) => {
                tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), future)
                    .await
                    .unwrap_or(Err(TransportError::Timeout))
            }
            None => future.await,
        }
    };

    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(TransportError::Cancelled),
        result = timed => result,
    }
}

fn attach_cookies(jar: &dyn CookieJar, request: &mut Request) {
    request.headers_mut().remove(COOKIE);
    if let Some(value) = jar.cookies(request.url()) {
        request.headers_mut().insert(COOKIE, value);
    }
}

fn middleware_interceptor<M: Middleware>(middleware: M) -> Interceptor {
    layer_interceptor(MiddlewareLayer::new(middleware))
}

fn layer_interceptor<L>(layer: L) -> Interceptor
where
    L: Layer<BoxedService> + Send + Sync + 'static,
    L::Service: Service<Request, Response = Response, Error = TransportError>
        + Clone
        + Send
        + 'static,
    <L::Service as Service<Request>>::Future: Send + 'static,
{
    Arc::new(move |service: BoxedService| BoxCloneService::new(layer.layer(service)))
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use chttp::{Client, cookie::MemoryJar, middleware, redirect::Policy};
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(30))
///     .cookie_jar(MemoryJar::new())
///     .redirect(Policy::limited(3))
///     .with(middleware::json())
///     .build();
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
    interceptors: Vec<Interceptor>,
    transport: Option<BoxedService>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("middleware_count", &self.interceptors.len())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientBuilder {
    // ========================================================================
    // Configuration
    // ========================================================================

    /// Bound every request, redirects included.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Store and send cookies with `jar`.
    #[must_use]
    pub fn cookie_jar<J: CookieJar>(mut self, jar: J) -> Self {
        self.config = self.config.cookie_jar(Arc::new(jar));
        self
    }

    /// Set the redirect policy.
    #[must_use]
    pub fn redirect(mut self, policy: Policy) -> Self {
        self.config = self.config.redirect(policy);
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = ClientConfigBuilder::from(config);
        self
    }

    // ========================================================================
    // Middleware
    // ========================================================================

    /// Append a middleware. First added runs first.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.interceptors.push(middleware_interceptor(middleware));
        self
    }

    /// Append a tower layer. First added runs first.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.interceptors.push(layer_interceptor(layer));
        self
    }

    /// Replace the terminal transport (the hyper client by default).
    #[must_use]
    pub fn transport<S>(mut self, transport: S) -> Self
    where
        S: Service<Request, Response = Response, Error = TransportError> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.transport = Some(BoxCloneService::new(transport));
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        let terminal = self
            .transport
            .unwrap_or_else(|| BoxCloneService::new(HyperTransport::new()));

        Client {
            chain: Arc::new(Chain::new(self.interceptors)),
            config: self.config.build(),
            terminal: SyncService::new(terminal),
        }
    }

    /// Build the client and wrap it in a [`JsonClient`].
    #[must_use]
    pub fn build_json(self) -> JsonClient {
        JsonClient::new(&self.build())
    }
}
