//! Drive a `fetchkit` client with an in-process fetch function.
//!
//! ```text
//! RUST_LOG=fetchkit=trace cargo run --example mock_fetch
//! ```

use fetchkit::header::CONTENT_TYPE;
use fetchkit::{BoxError, Client, Error, HeaderMap, Request, Response, StatusCode, fetch_fn, middleware};
use tracing_subscriber::EnvFilter;

/// Answers `/users/<n>` with a JSON user and everything else with 404.
async fn fake_api(req: Request) -> Result<Response, BoxError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "application/json".parse()?);

    let id = req
        .url()
        .split_once("/users/")
        .and_then(|(_, rest)| rest.split(['?', '#']).next())
        .and_then(|id| id.parse::<u32>().ok());
    let (status, body) = match id {
        Some(id) => (StatusCode::OK, format!(r#"{{"id":{id},"name":"user {id}"}}"#)),
        None => (StatusCode::NOT_FOUND, r#"{"message":"no such route"}"#.to_owned()),
    };
    Ok(Response::new(status, body)
        .with_url(req.url())
        .with_headers(headers))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::builder(fetch_fn(fake_api))
        .base_url("https://api.example.com")
        .user_agent("fetchkit-demo/0.1")
        .middleware(middleware::bearer_auth("demo-token"))
        .response_middleware(middleware::error_for_status())
        .build()?;

    let users = client.get("/users/:id");
    for id in ["1", "2"] {
        let mut resp = users.set_params([("id", id)]).dispatch().await?;
        let body = resp.auto().await?;
        println!("{} -> {body}", resp.request().url());
    }

    match client.get("/nowhere").dispatch().await {
        Ok(resp) => println!("unexpected success: {:?}", resp.status()),
        Err(err) => println!("error: {err} (sent: {})", err.is_send_request()),
    }
    Ok(())
}
