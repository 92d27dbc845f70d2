//! Integration tests for the middleware client against a mock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert2::{check, let_assert};
use bytes::Bytes;
use chttp::cookie::MemoryJar;
use chttp::middleware::{self, Next};
use chttp::redirect::{Action, Policy};
use chttp::{CancellationToken, Client, Context, Method, Request, TransportError};
use http::HeaderValue;
use tokio::sync::Notify;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string, header, method, path},
};

async fn ok_server(route: &str) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;
    mock_server
}

/// Ten middleware each append their index; the server sees them in order.
#[tokio::test]
async fn test_middleware_runs_in_registration_order() {
    let mock_server = ok_server("/ordered").await;

    let client = Client::new();
    for index in 0..10_u16 {
        client.with(middleware::from_fn(move |mut request: Request, next: Next| {
            request
                .headers_mut()
                .append("x-index", HeaderValue::from(index));
            next.run(request)
        }));
    }
    check!(client.middleware_count() == 10);

    let response = client
        .get(&Context::background(), &format!("{}/ordered", mock_server.uri()), None)
        .await
        .expect("response");
    check!(response.status() == 200);

    let requests = mock_server.received_requests().await.expect("recording");
    let_assert!([received] = requests.as_slice());
    let seen: Vec<&str> = received
        .headers
        .get_all("x-index")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    check!(seen == ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
}

/// A middleware that never calls `next` keeps the request off the network.
#[tokio::test]
async fn test_short_circuit_never_reaches_server() {
    let mock_server = ok_server("/blocked").await;

    let client = Client::builder()
        .with(middleware::from_fn(|_request, _next| async {
            Err(TransportError::middleware("offline mode"))
        }))
        .build();

    let result = client
        .get(&Context::background(), &format!("{}/blocked", mock_server.uri()), None)
        .await;

    let_assert!(Err(TransportError::Middleware(message)) = result);
    check!(message == "offline mode");
    let requests = mock_server.received_requests().await.expect("recording");
    check!(requests.is_empty());
}

/// A middleware may call `next` more than once.
#[tokio::test]
async fn test_middleware_can_retry_through_next() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .with(middleware::from_fn(|request: Request, next: Next| async move {
            let response = next.run(request.clone()).await?;
            if response.status() >= 500 {
                return next.run(request).await;
            }
            Ok(response)
        }))
        .build();

    let response = client
        .get(&Context::background(), &format!("{}/flaky", mock_server.uri()), None)
        .await
        .expect("response");

    check!(response.status() == 200);
    let requests = mock_server.received_requests().await.expect("recording");
    check!(requests.len() == 2);
}

/// Middleware appended to a clone stays out of the original.
#[tokio::test]
async fn test_clone_has_independent_middleware() {
    let mock_server = ok_server("/clone").await;
    let url = format!("{}/clone", mock_server.uri());

    let original = Client::builder()
        .with(middleware::Headers::from_pairs([("x-origin", "original")], true).expect("headers"))
        .build();
    let copy = original.clone();
    copy.with(middleware::Headers::from_pairs([("x-copy", "yes")], true).expect("headers"));

    check!(original.middleware_count() == 1);
    check!(copy.middleware_count() == 2);

    let ctx = Context::background();
    original.get(&ctx, &url, None).await.expect("original");
    copy.get(&ctx, &url, None).await.expect("copy");

    let requests = mock_server.received_requests().await.expect("recording");
    let_assert!([from_original, from_copy] = requests.as_slice());
    check!(from_original.headers.get("x-copy").is_none());
    check!(from_copy.headers.get("x-origin").is_some());
    check!(from_copy.headers.get("x-copy").is_some());
}

/// A middleware appended while a request is in flight only applies to later requests.
#[tokio::test]
async fn test_append_during_dispatch_applies_to_later_requests() {
    let mock_server = ok_server("/late").await;
    let url = format!("{}/late", mock_server.uri());

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let client = Client::new();
    {
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        client.with(middleware::from_fn(move |request: Request, next: Next| {
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            async move {
                if request.header("x-gate").is_some() {
                    entered.notify_one();
                    release.notified().await;
                }
                next.run(request).await
            }
        }));
    }

    // the JSON view shares the chain, so later appends reach it
    let shared = client.json();
    let in_flight = {
        let url = url.clone();
        tokio::spawn(async move {
            let request = Request::builder(Method::Get, url.parse().expect("url"))
                .header(
                    http::HeaderName::from_static("x-gate"),
                    HeaderValue::from_static("1"),
                )
                .build();
            shared.client().execute(request).await
        })
    };

    entered.notified().await;
    client.with(middleware::Headers::from_pairs([("x-late", "1")], true).expect("headers"));
    release.notify_one();

    let first = in_flight.await.expect("join").expect("response");
    check!(first.status() == 200);
    client
        .get(&Context::background(), &url, None)
        .await
        .expect("second");

    let requests = mock_server.received_requests().await.expect("recording");
    let_assert!([gated, later] = requests.as_slice());
    check!(gated.headers.get("x-late").is_none());
    check!(later.headers.get("x-late").is_some());
}

/// Method names resolve case-sensitively; unknown names fall back to GET.
#[tokio::test]
async fn test_method_lookup() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/pet/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pet/1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let ctx = Context::background();
    let url = format!("{}/pet/1", mock_server.uri());

    let deleted = client.method("DELETE").call(&ctx, &url, None).await.expect("delete");
    check!(deleted.status() == 204);

    let fallback = client.method("delete");
    check!(fallback.method() == Method::Get);
    let fetched = fallback.call(&ctx, &url, None).await.expect("get");
    check!(fetched.status() == 200);
}

/// A non-empty body reaches the server unchanged.
#[tokio::test]
async fn test_body_is_sent_when_present() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let response = client
        .post(
            &Context::background(),
            &format!("{}/echo", mock_server.uri()),
            Some(Bytes::from_static(b"payload")),
        )
        .await
        .expect("response");

    check!(response.status() == 201);
}

// ============================================================================
// Redirects
// ============================================================================

/// 303 turns a POST into a body-less GET.
#[tokio::test]
async fn test_see_other_switches_to_get() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", "/result"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/result"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let response = client
        .post(
            &Context::background(),
            &format!("{}/submit", mock_server.uri()),
            Some(Bytes::from_static(b"form")),
        )
        .await
        .expect("response");

    check!(response.status() == 200);
    let body = response.bytes().await.expect("body");
    check!(&body[..] == b"done");

    let requests = mock_server.received_requests().await.expect("recording");
    let_assert!([_, followed] = requests.as_slice());
    check!(followed.body.is_empty());
}

/// 307 repeats the method and the body.
#[tokio::test]
async fn test_temporary_redirect_keeps_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/new"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let response = client
        .put(
            &Context::background(),
            &format!("{}/old", mock_server.uri()),
            Some(Bytes::from_static(b"payload")),
        )
        .await
        .expect("response");

    check!(response.status() == 200);
}

/// Every hop runs through the middleware chain.
#[tokio::test]
async fn test_middleware_sees_each_hop() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/a"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/b"))
        .mount(&mock_server)
        .await;
    Mock::given(path("/b"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let hops = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hops);
    let client = Client::builder()
        .with(middleware::from_fn(move |request: Request, next: Next| {
            counter.fetch_add(1, Ordering::SeqCst);
            next.run(request)
        }))
        .build();

    let response = client
        .get(&Context::background(), &format!("{}/a", mock_server.uri()), None)
        .await
        .expect("response");

    check!(response.status() == 200);
    check!(hops.load(Ordering::SeqCst) == 2);
}

/// Exceeding the redirect limit fails the request.
#[tokio::test]
async fn test_redirect_limit() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&mock_server)
        .await;

    let client = Client::builder().redirect(Policy::limited(2)).build();
    let result = client
        .get(&Context::background(), &format!("{}/loop", mock_server.uri()), None)
        .await;

    let_assert!(Err(TransportError::TooManyRedirects { max: 2, .. }) = result);
    let requests = mock_server.received_requests().await.expect("recording");
    check!(requests.len() == 3);
}

/// `Policy::none` hands back the redirect response.
#[tokio::test]
async fn test_redirect_policy_none() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/elsewhere"))
        .mount(&mock_server)
        .await;

    let client = Client::builder().redirect(Policy::none()).build();
    let response = client
        .get(&Context::background(), &format!("{}/moved", mock_server.uri()), None)
        .await
        .expect("response");

    check!(response.status() == 301);
    check!(response.header("location") == Some("/elsewhere"));
}

/// A custom policy can stop on a condition of its own.
#[tokio::test]
async fn test_custom_redirect_policy() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/private"))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .redirect(Policy::custom(|attempt| {
            if attempt.next().url().path().starts_with("/private") {
                Ok(Action::Stop)
            } else {
                Ok(Action::Follow)
            }
        }))
        .build();
    let response = client
        .get(&Context::background(), &format!("{}/start", mock_server.uri()), None)
        .await
        .expect("response");

    check!(response.status() == 302);
}

// ============================================================================
// Cookies
// ============================================================================

/// Cookies set on a redirect hop are sent on the next hop.
#[tokio::test]
async fn test_cookies_follow_redirects() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/login"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/home")
                .insert_header("Set-Cookie", "session=abc; Path=/"),
        )
        .mount(&mock_server)
        .await;
    Mock::given(path("/home"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder().cookie_jar(MemoryJar::new()).build();
    let response = client
        .get(&Context::background(), &format!("{}/login", mock_server.uri()), None)
        .await
        .expect("response");

    check!(response.status() == 200);
}

// ============================================================================
// Deadlines
// ============================================================================

/// The client timeout bounds a slow server.
#[tokio::test]
async fn test_client_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = Client::builder().timeout(Duration::from_millis(100)).build();
    let result = client
        .get(&Context::background(), &format!("{}/slow", mock_server.uri()), None)
        .await;

    let_assert!(Err(err) = result);
    check!(err.is_timeout());
}

/// The context deadline applies when it is earlier than the client timeout.
#[tokio::test]
async fn test_context_deadline() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = Client::builder().timeout(Duration::from_secs(30)).build();
    let ctx = Context::background().with_timeout(Duration::from_millis(100));
    let result = client
        .get(&ctx, &format!("{}/slow", mock_server.uri()), None)
        .await;

    let_assert!(Err(err) = result);
    check!(err.is_timeout());
}

/// Cancelling the context aborts the request.
#[tokio::test]
async fn test_cancellation() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let token = CancellationToken::new();
    let ctx = Context::background().with_cancellation(token.clone());
    let client = Client::new();
    let url = format!("{}/slow", mock_server.uri());

    let pending = tokio::spawn(async move { client.get(&ctx, &url, None).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let result = pending.await.expect("join");
    let_assert!(Err(err) = result);
    check!(err.is_cancelled());
}
