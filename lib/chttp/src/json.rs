//! JSON request/response layer.
//!
//! [`JsonClient`] serializes request payloads, sends them through the
//! middleware [`Client`], reads the whole response and classifies the outcome
//! as an [`Error`]:
//!
//! | Outcome | Result |
//! |---------|--------|
//! | payload does not serialize | [`Error::Marshal`], nothing sent |
//! | no response | [`Error::Dispatch`] |
//! | body read interrupted | [`Error::Read`] with the partial body |
//! | status 300 or above | [`Error::Status`] with the full body |
//! | body does not match the sink | [`Error::Decode`] |
//!
//! The layer sets no headers itself; register [`middleware::json()`] for
//! `Content-Type` and `Accept`.
//!
//! [`middleware::json()`]: crate::middleware::json

use bytes::BytesMut;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower::Layer;
use tower_service::Service;

use crate::client::{ClientBuilder, bounded};
use crate::middleware::Middleware;
use crate::transport::BoxedService;
use crate::typed::TypedJsonClient;
use crate::{
    Client, Context, Error, Method, Request, Response, Result, TransportError, from_json, to_json,
};

/// Request payload placeholder for calls without a body.
///
/// ```ignore
/// json.get(&ctx, &url, NO_BODY, Some(&mut pet)).await?;
/// ```
pub const NO_BODY: Option<&()> = None;

/// JSON client over a middleware [`Client`].
///
/// Built with [`Client::json`] or [`JsonClient::new`], it shares the chain of
/// the wrapped client: middleware appended through either is seen by both.
/// Cloning a `JsonClient` gives an independent chain, like [`Client::clone`].
#[derive(Debug)]
pub struct JsonClient {
    client: Client,
}

impl Clone for JsonClient {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl Default for JsonClient {
    fn default() -> Self {
        Self::new(&Client::new())
    }
}

impl JsonClient {
    /// Wrap `client`, sharing its middleware chain.
    #[must_use]
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.share(),
        }
    }

    /// Builder for the underlying client; finish with
    /// [`ClientBuilder::build_json`].
    #[must_use]
    pub fn builder() -> ClientBuilder {
        Client::builder()
    }

    /// The wrapped client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Typed view of this client, sharing its middleware chain.
    #[must_use]
    pub fn typed<R>(&self) -> TypedJsonClient<R> {
        TypedJsonClient::new(self)
    }

    /// Append a middleware to the shared chain.
    pub fn with<M: Middleware>(&self, middleware: M) -> &Self {
        self.client.with(middleware);
        self
    }

    /// Append several middleware to the shared chain at once.
    pub fn extend<I>(&self, middleware: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Middleware,
    {
        self.client.extend(middleware);
        self
    }

    /// Append a tower layer to the shared chain.
    pub fn layer<L>(&self, layer: L) -> &Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.client.layer(layer);
        self
    }

    // ========================================================================
    // Exchange
    // ========================================================================

    /// Send `body` as JSON and decode the response into `sink`.
    ///
    /// `sink` is left untouched when the response body is empty.
    ///
    /// # Errors
    ///
    /// See the [module documentation](self).
    pub async fn request_into<B, T>(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<&B>,
        sink: Option<&mut T>,
    ) -> std::result::Result<(), Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = body.map(to_json).transpose().map_err(Error::Marshal)?;

        let ctx = self.client.bind(ctx);
        let response = self.client.request(&ctx, method, url, payload).await;
        decode(&ctx, response, sink).await
    }

    /// Send `body` as JSON and decode the response as `T`.
    ///
    /// An empty response body yields `T::default()`.
    pub async fn request<B, T>(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let mut result = T::default();
        self.request_into(ctx, method, url, body, Some(&mut result))
            .await?;
        Ok(result)
    }

    /// Classify an outcome of [`Client::request`] and decode it into `sink`.
    ///
    /// The body read is bounded by `ctx` and the client timeout.
    pub async fn decode_response_into<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        response: Result<Response>,
        sink: Option<&mut T>,
    ) -> std::result::Result<(), Error> {
        decode(&self.client.bind(ctx), response, sink).await
    }

    // ========================================================================
    // Verbs
    // ========================================================================

    /// Verb handle by method name; unknown names resolve to `GET`.
    #[must_use]
    pub fn method(&self, name: &str) -> JsonVerb<'_> {
        JsonVerb {
            client: self,
            method: Method::lookup(name),
        }
    }
}

macro_rules! json_verbs {
    ($($(#[$doc:meta])* $name:ident => $method:ident;)*) => {
        impl JsonClient {
            $(
                $(#[$doc])*
                pub async fn $name<B, T>(
                    &self,
                    ctx: &Context,
                    url: &str,
                    body: Option<&B>,
                    sink: Option<&mut T>,
                ) -> std::result::Result<(), Error>
                where
                    B: Serialize + ?Sized,
                    T: DeserializeOwned,
                {
                    self.request_into(ctx, Method::$method, url, body, sink).await
                }
            )*
        }
    };
}

json_verbs! {
    /// JSON `GET`.
    get => Get;
    /// JSON `HEAD`.
    head => Head;
    /// JSON `POST`.
    post => Post;
    /// JSON `PUT`.
    put => Put;
    /// JSON `PATCH`.
    patch => Patch;
    /// JSON `DELETE`.
    delete => Delete;
    /// JSON `CONNECT`.
    connect => Connect;
    /// JSON `OPTIONS`.
    options => Options;
    /// JSON `TRACE`.
    trace => Trace;
}

/// A [`JsonClient`] bound to one method. See [`JsonClient::method`].
#[derive(Debug, Clone, Copy)]
pub struct JsonVerb<'a> {
    client: &'a JsonClient,
    method: Method,
}

impl JsonVerb<'_> {
    /// The resolved method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Send the request.
    pub async fn call<B, T>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
        sink: Option<&mut T>,
    ) -> std::result::Result<(), Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.client
            .request_into(ctx, self.method, url, body, sink)
            .await
    }
}

/// Read, classify and decode one response. The body is consumed on every path.
pub(crate) async fn decode<T: DeserializeOwned>(
    ctx: &Context,
    response: Result<Response>,
    sink: Option<&mut T>,
) -> std::result::Result<(), Error> {
    let (status, _headers, body) = response.map_err(Error::Dispatch)?.into_parts();

    let mut buffer = BytesMut::new();
    if let Err(source) = bounded(ctx, body.read_into(&mut buffer)).await {
        return Err(Error::Read {
            status,
            body: buffer.freeze(),
            source,
        });
    }
    let data = buffer.freeze();

    if status >= 300 {
        return Err(Error::Status { status, body: data });
    }

    if let Some(sink) = sink
        && !data.is_empty()
    {
        match from_json(&data) {
            Ok(value) => *sink = value,
            Err(source) => {
                return Err(Error::Decode {
                    status,
                    body: data,
                    source,
                });
            }
        }
    }

    Ok(())
}
