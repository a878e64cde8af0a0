//! Integration tests for the `reqwest` fetch adapter -- exercises a real
//! HTTP stack against a local wiremock `MockServer`.

#![cfg(feature = "reqwest")]

use fetchkit::{Client, FormData, ReqwestFetch, StatusCode, middleware};
use wiremock::matchers::{body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: a client rooted at the mock server.
fn test_client(server: &MockServer) -> Client {
    Client::builder(ReqwestFetch::new())
        .base_url(server.uri())
        .build()
        .expect("client build should succeed")
}

/// `get_with_params_and_query`: the composed URL reaches the server.
#[tokio::test]
async fn get_with_params_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .and(query_param("fields", "name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let mut wrapper = test_client(&server)
        .get("/users/:id")
        .set_params([("id", "42")])
        .set_query([("fields", "name")])
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(wrapper.status(), Some(StatusCode::OK));
    assert_eq!(wrapper.auto().await.unwrap()["id"], 42);
}

/// `post_json_body`: JSON body and content type are forwarded.
#[tokio::test]
async fn post_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#"{"name":"widget"}"#))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let wrapper = test_client(&server)
        .post("/items")
        .set_json(&serde_json::json!({"name": "widget"}))
        .unwrap()
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(wrapper.status(), Some(StatusCode::CREATED));
}

/// `multipart_form`: form parts are encoded as multipart.
#[tokio::test]
async fn multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("report.txt"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let form = FormData::new()
        .text("title", "q3")
        .file("doc", &b"numbers"[..], Some("report.txt".to_owned()), Some("text/plain".to_owned()));
    let wrapper = test_client(&server)
        .post("/upload")
        .set_body(form)
        .unwrap()
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(wrapper.status(), Some(StatusCode::NO_CONTENT));
}

/// `status_error_via_dispatch`: a 404 becomes an error only with the
/// status stage installed.
#[tokio::test]
async fn status_error_via_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "gone"})))
        .mount(&server)
        .await;

    let builder = test_client(&server).get("/missing");
    let wrapper = builder.send().await.expect("send should succeed");
    assert!(!wrapper.ok());

    let err = builder
        .append_response_middleware(middleware::error_for_status())
        .dispatch()
        .await
        .unwrap_err();
    assert!(err.is_status());
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert!(err.message().ends_with(": gone"), "{}", err.message());
}

/// `connect_error`: an unreachable port fails as a send error.
#[tokio::test]
async fn connect_error() {
    let client = Client::new(ReqwestFetch::new());
    let err = client
        .get("http://127.0.0.1:1/")
        .send()
        .await
        .unwrap_err();

    assert!(err.is_request());
    assert!(err.is_send_request());
}
