//! Petstore API client
//!
//! A hand-written API client on top of chttp's JSON client: shared
//! middleware, typed results and API error recovery.

// Example-specific lint allowances
#![allow(missing_docs)]

mod models;

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use chttp::header::{CONTENT_TYPE, HeaderValue};
use chttp::middleware::{self, Headers};
use chttp::prelude::*;
use chttp::url::Url;

pub use models::*;

// ============================================================================
// Client
// ============================================================================

/// Entry point grouping the petstore resources.
#[derive(Debug, Clone)]
pub struct Petstore {
    pub pets: PetClient,
    pub store: StoreClient,
    pub users: UserClient,
}

impl Petstore {
    /// Connect every resource to `host` with the same API key.
    pub fn new(host: &str, api_key: &str) -> Result<Self, Error> {
        Ok(Self {
            pets: PetClient::new(host, api_key)?,
            store: StoreClient::new(host, api_key)?,
            users: UserClient::new(host, api_key)?,
        })
    }
}

fn json_client(api_key: &str) -> Result<JsonClient, Error> {
    let api_key = Headers::from_pairs([("api_key", api_key)], true).map_err(Error::Dispatch)?;
    Ok(JsonClient::builder()
        .timeout(Duration::from_secs(10))
        .with(middleware::json())
        .with(api_key)
        .build_json())
}

/// `base` + `path`, with `query` appended when not empty.
fn endpoint(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
    let mut url = Url::parse(&format!("{base}{path}"))
        .map_err(|err| Error::Dispatch(TransportError::from(err)))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

// ============================================================================
// Pets
// ============================================================================

/// Everything about pets.
#[derive(Debug, Clone)]
pub struct PetClient {
    path: String,
    json: JsonClient,
}

impl PetClient {
    pub fn new(host: &str, api_key: &str) -> Result<Self, Error> {
        Ok(Self {
            path: format!("{}/pet", host.trim_end_matches('/')),
            json: json_client(api_key)?,
        })
    }

    /// `PUT /pet`: update an existing pet.
    pub async fn update(&self, ctx: &Context, pet: &Pet) -> Result<Pet, Error> {
        let url = endpoint(&self.path, "", &[])?;
        let mut result = Pet::default();
        self.json
            .put(ctx, url.as_str(), Some(pet), Some(&mut result))
            .await?;
        Ok(result)
    }

    /// `POST /pet`: add a new pet to the store.
    pub async fn add(&self, ctx: &Context, pet: &Pet) -> Result<Pet, Error> {
        let url = endpoint(&self.path, "", &[])?;
        let mut result = Pet::default();
        self.json
            .post(ctx, url.as_str(), Some(pet), Some(&mut result))
            .await?;
        Ok(result)
    }

    /// `GET /pet/findByStatus`.
    pub async fn find_by_status(&self, ctx: &Context, status: PetStatus) -> Result<Vec<Pet>, Error> {
        let url = endpoint(&self.path, "/findByStatus", &[("status", status.as_str())])?;
        self.json
            .typed::<Vec<Pet>>()
            .get(ctx, url.as_str(), NO_BODY)
            .await
    }

    /// `GET /pet/findByTags`.
    pub async fn find_by_tags(&self, ctx: &Context, tags: &[&str]) -> Result<Vec<Pet>, Error> {
        let query: Vec<(&str, &str)> = tags.iter().map(|tag| ("tags[]", *tag)).collect();
        let url = endpoint(&self.path, "/findByTags", &query)?;
        self.json
            .typed::<Vec<Pet>>()
            .get(ctx, url.as_str(), NO_BODY)
            .await
    }

    /// `GET /pet/{petId}`.
    pub async fn find(&self, ctx: &Context, pet_id: i64) -> Result<Pet, Error> {
        let url = endpoint(&self.path, &format!("/{pet_id}"), &[])?;
        self.json
            .request(ctx, Method::Get, url.as_str(), NO_BODY)
            .await
    }

    /// `POST /pet/{petId}`: update name and status with query parameters.
    pub async fn update_by_id(
        &self,
        ctx: &Context,
        pet_id: i64,
        name: Option<&str>,
        status: Option<PetStatus>,
    ) -> Result<Pet, Error> {
        let mut query = Vec::new();
        if let Some(name) = name {
            query.push(("name", name));
        }
        if let Some(status) = status {
            query.push(("status", status.as_str()));
        }
        let url = endpoint(&self.path, &format!("/{pet_id}"), &query)?;

        let mut result = Pet::default();
        self.json
            .post(ctx, url.as_str(), NO_BODY, Some(&mut result))
            .await?;
        Ok(result)
    }

    /// `DELETE /pet/{petId}`.
    pub async fn delete(&self, ctx: &Context, pet_id: i64) -> Result<(), Error> {
        let url = endpoint(&self.path, &format!("/{pet_id}"), &[])?;
        self.json
            .delete(ctx, url.as_str(), NO_BODY, None::<&mut ()>)
            .await
    }

    /// `POST /pet/{petId}/uploadImage`: raw bytes in, JSON out.
    pub async fn upload_image(
        &self,
        ctx: &Context,
        pet_id: i64,
        image: Bytes,
    ) -> Result<ApiResponse, Error> {
        let url = endpoint(&self.path, &format!("/{pet_id}/uploadImage"), &[])?;
        let request = Request::builder(Method::Post, url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            )
            .body(image)
            .context(ctx.clone())
            .build();

        let response = self.json.client().execute(request).await;
        let mut result = ApiResponse::default();
        self.json
            .decode_response_into(ctx, response, Some(&mut result))
            .await?;
        Ok(result)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Access to petstore orders.
#[derive(Debug, Clone)]
pub struct StoreClient {
    path: String,
    json: JsonClient,
}

impl StoreClient {
    pub fn new(host: &str, api_key: &str) -> Result<Self, Error> {
        Ok(Self {
            path: format!("{}/store", host.trim_end_matches('/')),
            json: json_client(api_key)?,
        })
    }

    /// `GET /store/inventory`: pet counts by status.
    pub async fn inventory(&self, ctx: &Context) -> Result<BTreeMap<String, i64>, Error> {
        let url = endpoint(&self.path, "/inventory", &[])?;
        self.json.request(ctx, Method::Get, url.as_str(), NO_BODY).await
    }

    /// `POST /store/order`.
    pub async fn place_order(&self, ctx: &Context, order: &Order) -> Result<Order, Error> {
        let url = endpoint(&self.path, "/order", &[])?;
        self.json
            .request(ctx, Method::Post, url.as_str(), Some(order))
            .await
    }

    /// `GET /store/order/{orderId}`.
    pub async fn find_order(&self, ctx: &Context, order_id: i64) -> Result<Order, Error> {
        let url = endpoint(&self.path, &format!("/order/{order_id}"), &[])?;
        self.json
            .request(ctx, Method::Get, url.as_str(), NO_BODY)
            .await
    }

    /// `DELETE /store/order/{orderId}`.
    pub async fn delete_order(&self, ctx: &Context, order_id: i64) -> Result<(), Error> {
        let url = endpoint(&self.path, &format!("/order/{order_id}"), &[])?;
        self.json
            .delete(ctx, url.as_str(), NO_BODY, None::<&mut ()>)
            .await
    }
}

// ============================================================================
// Users
// ============================================================================

/// Operations about users.
#[derive(Debug, Clone)]
pub struct UserClient {
    path: String,
    json: JsonClient,
}

impl UserClient {
    pub fn new(host: &str, api_key: &str) -> Result<Self, Error> {
        Ok(Self {
            path: format!("{}/user", host.trim_end_matches('/')),
            json: json_client(api_key)?,
        })
    }

    /// `POST /user`.
    pub async fn create(&self, ctx: &Context, user: &User) -> Result<User, Error> {
        let url = endpoint(&self.path, "", &[])?;
        self.json
            .request(ctx, Method::Post, url.as_str(), Some(user))
            .await
    }

    /// `POST /user/createWithList`.
    pub async fn create_with_list(&self, ctx: &Context, users: &[User]) -> Result<Vec<User>, Error> {
        let url = endpoint(&self.path, "/createWithList", &[])?;
        self.json
            .request(ctx, Method::Post, url.as_str(), Some(users))
            .await
    }

    /// `GET /user/login`: returns the session token.
    pub async fn login(&self, ctx: &Context, username: &str, password: &str) -> Result<String, Error> {
        let url = endpoint(
            &self.path,
            "/login",
            &[("username", username), ("password", password)],
        )?;
        self.json
            .request(ctx, Method::Get, url.as_str(), NO_BODY)
            .await
    }

    /// `GET /user/logout`.
    pub async fn logout(&self, ctx: &Context) -> Result<(), Error> {
        let url = endpoint(&self.path, "/logout", &[])?;
        self.json
            .get(ctx, url.as_str(), NO_BODY, None::<&mut ()>)
            .await
    }

    /// `GET /user/{username}`.
    pub async fn get_by_name(&self, ctx: &Context, username: &str) -> Result<User, Error> {
        let url = endpoint(&self.path, &format!("/{username}"), &[])?;
        self.json
            .request(ctx, Method::Get, url.as_str(), NO_BODY)
            .await
    }

    /// `PUT /user/{username}`.
    pub async fn update(&self, ctx: &Context, username: &str, user: &User) -> Result<User, Error> {
        let url = endpoint(&self.path, &format!("/{username}"), &[])?;
        self.json
            .request(ctx, Method::Put, url.as_str(), Some(user))
            .await
    }

    /// `DELETE /user/{username}`.
    pub async fn delete(&self, ctx: &Context, username: &str) -> Result<(), Error> {
        let url = endpoint(&self.path, &format!("/{username}"), &[])?;
        self.json
            .delete(ctx, url.as_str(), NO_BODY, None::<&mut ()>)
            .await
    }
}

// ============================================================================
// Tests using wiremock
// ============================================================================
