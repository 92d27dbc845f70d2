//! Integration tests for the JSON client.

use std::collections::HashMap;
use std::time::Duration;

use assert2::{check, let_assert};
use chttp::{Client, Context, Error, JsonClient, NO_BODY, TransportError, unmarshal_error_to};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Pair {
    foo: String,
    bar: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u32,
    message: String,
}

/// Echo server: POST /echo answers with the request body.
async fn echo_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .respond_with(|request: &wiremock::Request| {
            ResponseTemplate::new(200).set_body_raw(request.body.clone(), "application/json")
        })
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_round_trip() {
    let mock_server = echo_server().await;
    let json = JsonClient::builder().build_json();

    let sent = Pair {
        foo: "bar".to_owned(),
        bar: "baz".to_owned(),
    };
    let mut received = Pair::default();
    json.post(
        &Context::background(),
        &format!("{}/echo", mock_server.uri()),
        Some(&sent),
        Some(&mut received),
    )
    .await
    .expect("echo");

    check!(received == sent);
}

#[tokio::test]
async fn test_request_returns_decoded_value() {
    let mock_server = echo_server().await;
    let json = Client::new().json();

    let sent = HashMap::from([("Foo", "bar")]);
    let received: HashMap<String, String> = json
        .request(
            &Context::background(),
            chttp::Method::Post,
            &format!("{}/echo", mock_server.uri()),
            Some(&sent),
        )
        .await
        .expect("echo");

    check!(received.get("Foo").map(String::as_str) == Some("bar"));
}

#[tokio::test]
async fn test_json_middleware_sets_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/typed"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let json = JsonClient::builder()
        .with(chttp::middleware::json())
        .build_json();
    let numbers = json
        .typed::<Vec<u32>>()
        .get(&Context::background(), &format!("{}/typed", mock_server.uri()), NO_BODY)
        .await
        .expect("numbers");

    check!(numbers == [1, 2, 3]);
}

#[tokio::test]
async fn test_status_failure_keeps_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fail"))
        .respond_with(ResponseTemplate::new(500).set_body_string("123"))
        .mount(&mock_server)
        .await;

    let json = JsonClient::default();
    let mut sink = 0_u32;
    let result = json
        .get(
            &Context::background(),
            &format!("{}/fail", mock_server.uri()),
            NO_BODY,
            Some(&mut sink),
        )
        .await;

    let_assert!(Err(err) = result);
    check!(err.is_status_failure());
    check!(err.status() == Some(500));
    check!(err.body().map(|body| &body[..]) == Some(&b"123"[..]));
    check!(err.to_string() == "http error, status_code=500");
    check!(sink == 0);

    let decoded: u32 = err.unmarshal_error_body().expect("status").expect("number");
    check!(decoded == 123);
}

#[tokio::test]
async fn test_broken_body_is_decode_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"broken"))
        .mount(&mock_server)
        .await;

    let json = JsonClient::default();
    let mut sink = String::new();
    let result = json
        .get(
            &Context::background(),
            &format!("{}/broken", mock_server.uri()),
            NO_BODY,
            Some(&mut sink),
        )
        .await;

    let_assert!(Err(err) = result);
    let_assert!(Error::Decode { status: 200, .. } = &err);
    check!(!err.is_status_failure());
    check!(err.to_string().starts_with("unmarshaling response error"));
}

#[tokio::test]
async fn test_marshal_failure_sends_nothing() {
    let mock_server = echo_server().await;
    let json = JsonClient::default();

    let unserializable = HashMap::from([((1_u8, 2_u8), 3_u8)]);
    let result = json
        .post(
            &Context::background(),
            &format!("{}/echo", mock_server.uri()),
            Some(&unserializable),
            None::<&mut ()>,
        )
        .await;

    let_assert!(Err(Error::Marshal(_)) = result);
    let requests = mock_server.received_requests().await.expect("recording");
    check!(requests.is_empty());
}

#[tokio::test]
async fn test_dispatch_failure() {
    let json = JsonClient::builder()
        .with(chttp::middleware::from_fn(|_request, _next| async {
            Err(TransportError::middleware("denied"))
        }))
        .build_json();

    let result = json
        .get(
            &Context::background(),
            "http://localhost/never",
            NO_BODY,
            None::<&mut ()>,
        )
        .await;

    let_assert!(Err(Error::Dispatch(TransportError::Middleware(message))) = result);
    check!(message == "denied");
}

#[tokio::test]
async fn test_timeout_is_dispatch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let json = JsonClient::builder()
        .timeout(Duration::from_millis(100))
        .build_json();
    let result = json
        .get(
            &Context::background(),
            &format!("{}/slow", mock_server.uri()),
            NO_BODY,
            None::<&mut ()>,
        )
        .await;

    let_assert!(Err(Error::Dispatch(err)) = result);
    check!(err.is_timeout());
}

#[tokio::test]
async fn test_api_error_recovered_from_status_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pet/0"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(r#"{"code":1,"message":"Pet not found"}"#),
        )
        .mount(&mock_server)
        .await;

    let json = JsonClient::default();
    let mut pet = HashMap::<String, String>::new();
    let err = json
        .get(
            &Context::background(),
            &format!("{}/pet/0", mock_server.uri()),
            NO_BODY,
            Some(&mut pet),
        )
        .await
        .expect_err("not found");

    let api: ApiError = unmarshal_error_to(err).expect("api error");
    check!(api.code == 1);
    check!(api.message == "Pet not found");
}

#[tokio::test]
async fn test_other_errors_pass_through_unmarshal_error_to() {
    let json = JsonClient::builder()
        .with(chttp::middleware::from_fn(|_request, _next| async {
            Err(TransportError::middleware("denied"))
        }))
        .build_json();

    let err = json
        .get(
            &Context::background(),
            "http://localhost/never",
            NO_BODY,
            None::<&mut ()>,
        )
        .await
        .expect_err("denied");

    let passed = unmarshal_error_to::<ApiError, _>(err).expect_err("not a status failure");
    let_assert!(Some(Error::Dispatch(_)) = passed.downcast_ref::<Error>());
}
