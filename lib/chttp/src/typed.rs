//! JSON client bound to one result type.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::json::{JsonClient, decode};
use crate::{Context, Error, Method, Response, Result};

/// A [`JsonClient`] whose calls all decode into `R`.
///
/// An empty success body yields `R::default()`.
///
/// ```ignore
/// let pets: TypedJsonClient<Vec<Pet>> = json.typed();
/// let sold = pets.get(&ctx, "https://petstore.example/pet/findByStatus?status=sold", NO_BODY).await?;
/// ```
pub struct TypedJsonClient<R> {
    json: JsonClient,
    _result: PhantomData<fn() -> R>,
}

impl<R> Clone for TypedJsonClient<R> {
    fn clone(&self) -> Self {
        Self {
            json: self.json.clone(),
            _result: PhantomData,
        }
    }
}

impl<R> fmt::Debug for TypedJsonClient<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedJsonClient")
            .field("json", &self.json)
            .field("result", &std::any::type_name::<R>())
            .finish()
    }
}

impl<R> Default for TypedJsonClient<R> {
    fn default() -> Self {
        Self::new(&JsonClient::default())
    }
}

impl<R> TypedJsonClient<R> {
    /// Wrap `json`, sharing its middleware chain.
    #[must_use]
    pub fn new(json: &JsonClient) -> Self {
        Self {
            json: JsonClient::new(json.client()),
            _result: PhantomData,
        }
    }

    /// The untyped client.
    #[must_use]
    pub const fn json(&self) -> &JsonClient {
        &self.json
    }

    /// Verb handle by method name; unknown names resolve to `GET`.
    #[must_use]
    pub fn method(&self, name: &str) -> TypedVerb<'_, R> {
        TypedVerb {
            client: self,
            method: Method::lookup(name),
        }
    }
}

impl<R: DeserializeOwned + Default> TypedJsonClient<R> {
    /// Send `body` as JSON and decode the response.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.json.request(ctx, method, url, body).await
    }

    /// Classify an outcome of [`Client::request`](crate::Client::request) and decode it.
    pub async fn decode_response(
        &self,
        ctx: &Context,
        response: Result<Response>,
    ) -> std::result::Result<R, Error> {
        let mut result = R::default();
        decode(&self.json.client().bind(ctx), response, Some(&mut result)).await?;
        Ok(result)
    }

    /// Typed `GET`.
    pub async fn get<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Get, url, body).await
    }

    /// Typed `HEAD`.
    pub async fn head<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Head, url, body).await
    }

    /// Typed `POST`.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Post, url, body).await
    }

    /// Typed `PUT`.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Put, url, body).await
    }

    /// Typed `PATCH`.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Patch, url, body).await
    }

    /// Typed `DELETE`.
    pub async fn delete<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Delete, url, body).await
    }

    /// Typed `CONNECT`.
    pub async fn connect<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Connect, url, body).await
    }

    /// Typed `OPTIONS`.
    pub async fn options<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Options, url, body).await
    }

    /// Typed `TRACE`.
    pub async fn trace<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.request(ctx, Method::Trace, url, body).await
    }
}

/// A [`TypedJsonClient`] bound to one method. See [`TypedJsonClient::method`].
pub struct TypedVerb<'a, R> {
    client: &'a TypedJsonClient<R>,
    method: Method,
}

impl<R> fmt::Debug for TypedVerb<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedVerb")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl<R> TypedVerb<'_, R> {
    /// The resolved method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }
}

impl<R: DeserializeOwned + Default> TypedVerb<'_, R> {
    /// Send the request.
    pub async fn call<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        url: &str,
        body: Option<&B>,
    ) -> std::result::Result<R, Error> {
        self.client.request(ctx, self.method, url, body).await
    }
}
