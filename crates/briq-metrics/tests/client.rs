//! Tests for the Briq HTTP client against a mock API server.

use assert_matches::assert_matches;
use hyper::{
    body::Incoming, header, server::conn::http1, service::service_fn, Request, Response,
    StatusCode,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use std::{
    convert::Infallible,
    net::{Ipv4Addr, SocketAddr},
};

use briq_metrics::client::{BriqClient, Error, ListUsers, ListUsersRequest};

const SECRET_KEY: &str = "test-secret";
/// Base64 encoding of `test-secret:`.
const EXPECTED_AUTH: &str = "Basic dGVzdC1zZWNyZXQ6";

const USERS_JSON: &str = r#"{
    "users": [
        { "username": "alice", "active_balance": 100, "inactive_balance": 5, "points": 42 },
        { "username": "bob", "active_balance": 0, "inactive_balance": 0, "points": 0 }
    ]
}"#;

type Handler = fn(&Request<Incoming>) -> Response<String>;

async fn spawn_mock_api(handler: Handler) -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let local_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service =
                    service_fn(move |req| async move { Ok::<_, Infallible>(handler(&req)) });
                http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                    .ok();
            });
        }
    });
    local_addr
}

fn response(status: StatusCode, body: &str) -> Response<String> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_owned())
        .unwrap()
}

fn users_handler(req: &Request<Incoming>) -> Response<String> {
    let auth = req.headers().get(header::AUTHORIZATION);
    if auth.map_or(true, |auth| auth != EXPECTED_AUTH) {
        return response(StatusCode::UNAUTHORIZED, r#"{"error":"unauthorized"}"#);
    }
    if req.uri().path() != "/api/v0/users" {
        return response(StatusCode::NOT_FOUND, "{}");
    }
    assert_eq!(req.headers()[header::ACCEPT], "application/json");
    response(StatusCode::OK, USERS_JSON)
}

fn api_url(addr: SocketAddr) -> String {
    format!("http://{addr}/api/v0")
}

#[tokio::test]
async fn listing_users() {
    let addr = spawn_mock_api(users_handler).await;
    let client = BriqClient::new(SECRET_KEY, &api_url(addr)).unwrap();

    let list = client.list_users(ListUsersRequest::default()).await.unwrap();
    let summary: Vec<_> = list
        .users
        .iter()
        .map(|user| {
            let balances = (user.active_balance, user.inactive_balance, user.points);
            (user.username.as_str(), balances)
        })
        .collect();
    assert_eq!(summary, [("alice", (100, 5, 42)), ("bob", (0, 0, 0))]);
}

#[tokio::test]
async fn wrong_secret_key_is_reported() {
    let addr = spawn_mock_api(users_handler).await;
    let client = BriqClient::new("wrong-secret", &api_url(addr)).unwrap();

    let err = client.fetch_users().await.unwrap_err();
    assert_matches!(
        &err,
        Error::UnexpectedStatus { status, body, .. }
            if *status == StatusCode::UNAUTHORIZED && body.contains("unauthorized")
    );

    // The same error is available via the opaque interface.
    let err = client
        .list_users(ListUsersRequest::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("status code: 401"), "{err}");
}

#[tokio::test]
async fn server_error_is_reported() {
    let addr = spawn_mock_api(|_| response(StatusCode::SERVICE_UNAVAILABLE, "Mistake!")).await;
    let client = BriqClient::new(SECRET_KEY, &api_url(addr)).unwrap();

    let err = client.fetch_users().await.unwrap_err();
    assert_matches!(
        err,
        Error::UnexpectedStatus { status, body, .. }
            if status == StatusCode::SERVICE_UNAVAILABLE && body == "Mistake!"
    );
}

#[tokio::test]
async fn malformed_response_is_reported() {
    let addr = spawn_mock_api(|_| response(StatusCode::OK, r#"{"users": 42}"#)).await;
    let client = BriqClient::new(SECRET_KEY, &api_url(addr)).unwrap();

    let err = client.fetch_users().await.unwrap_err();
    assert_matches!(err, Error::DeserializeResponse { .. });
}

#[tokio::test]
async fn unreachable_api_is_reported() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = BriqClient::new(SECRET_KEY, &api_url(addr)).unwrap();
    let err = client.fetch_users().await.unwrap_err();
    assert_matches!(err, Error::SendRequest { .. });
}
