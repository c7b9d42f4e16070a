// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway, auth service and a stub backend wired together over real sockets.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use gatekeeper::{
    api,
    auth::{codec::DEFAULT_TOKEN_TTL, AuthService, ManualClock, PasswordHasher, TokenCodec},
    credentials::InMemoryCredentialStore,
    gateway::{self, Forwarder, Pipeline, RouteRule, RouteTable},
    server,
    state::{AuthState, GatewayState},
};

const SECRET: &[u8] = b"end-to-end-shared-secret-of-32-bytes!";

struct Harness {
    gateway: SocketAddr,
    backend_hits: Arc<AtomicUsize>,
    clock: Arc<ManualClock>,
    client: reqwest::Client,
    shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Harness {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.gateway)
    }

    async fn register_and_login(&self, email: &str) -> (String, String) {
        let creds = json!({ "email": email, "password": "correct horse battery" });

        let response = self.client.post(self.url("/auth/register")).json(&creds).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let registered: Value = response.json().await.unwrap();
        let user_id = registered["user_id"].as_str().unwrap().to_string();

        let response = self.client.post(self.url("/auth/login")).json(&creds).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let login: Value = response.json().await.unwrap();
        let token = login["token"].as_str().unwrap().to_string();

        (user_id, token)
    }
}

async fn spawn(app: Router, shutdown: &CancellationToken) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve_listener(listener, app, shutdown.clone()));
    addr
}

/// Reports what the backend received.
async fn inspect(State(hits): State<Arc<AtomicUsize>>, headers: HeaderMap, request: Request) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "path": request.uri().path(),
        "query": request.uri().query(),
        "user_id": header("x-user-id"),
        "forwarded_for": header("x-forwarded-for"),
        "forwarded_host": header("x-forwarded-host"),
    }))
    .into_response()
}

/// Streams the request body straight back.
async fn echo(State(hits): State<Arc<AtomicUsize>>, body: Body) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    Body::from_stream(body.into_data_stream()).into_response()
}

async fn harness() -> Harness {
    let shutdown = CancellationToken::new();
    let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp()));
    let codec = Arc::new(TokenCodec::with_clock(SECRET, DEFAULT_TOKEN_TTL, clock.clone()).unwrap());

    let backend_hits = Arc::new(AtomicUsize::new(0));
    let backend = Router::new()
        .route("/todo/echo", post(echo))
        .fallback(inspect)
        .with_state(backend_hits.clone());
    let backend_addr = spawn(backend, &shutdown).await;

    let auth = AuthService::new(
        Arc::new(InMemoryCredentialStore::new()),
        codec.clone(),
        PasswordHasher::new(1024, 1).unwrap(),
    );
    let auth_addr = spawn(api::router(AuthState::new(auth)), &shutdown).await;

    let routes = RouteTable::new(vec![
        RouteRule::new("/auth", &format!("http://{auth_addr}"), false).unwrap(),
        RouteRule::new("/todo", &format!("http://{backend_addr}"), true).unwrap(),
    ])
    .unwrap();
    let forwarder = Forwarder::new(Duration::from_secs(2), Duration::from_secs(5)).unwrap();
    let state = GatewayState::new(Pipeline::standard(Arc::new(routes), codec), forwarder);
    let gateway = spawn(gateway::router(state, 1024 * 1024), &shutdown).await;

    Harness {
        gateway,
        backend_hits,
        clock,
        client: reqwest::Client::new(),
        shutdown,
    }
}

#[tokio::test]
async fn login_then_reach_protected_backend_until_expiry() {
    let h = harness().await;
    let (user_id, token) = h.register_and_login("ada@example.com").await;

    let response = h
        .client
        .get(h.url("/todo/items?done=false"))
        .bearer_auth(&token)
        .header("x-user-id", "someone-else")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seen: Value = response.json().await.unwrap();
    assert_eq!(seen["path"], "/todo/items");
    assert_eq!(seen["query"], "done=false");
    assert_eq!(seen["user_id"], user_id.as_str());
    assert_eq!(seen["forwarded_for"], "127.0.0.1");
    assert_eq!(seen["forwarded_host"], h.gateway.to_string().as_str());
    assert_eq!(h.backend_hits.load(Ordering::SeqCst), 1);

    h.clock.advance(DEFAULT_TOKEN_TTL);

    let response = h.client.get(h.url("/todo/items")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.backend_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn protected_route_without_token_never_reaches_backend() {
    let h = harness().await;

    let response = h.client.get(h.url("/todo/items")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "invalid token" }));

    let response = h
        .client
        .get(h.url("/todo/items"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(h.backend_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn public_route_validates_token_through_gateway() {
    let h = harness().await;
    let (user_id, token) = h.register_and_login("grace@example.com").await;

    let response = h.client.get(h.url("/auth/validate")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_id"], user_id.as_str());
    assert!(body["expires"].as_str().is_some());

    let response = h
        .client
        .post(h.url("/auth/login"))
        .json(&json!({ "email": "grace@example.com", "password": "wrong password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_body_streams_through_both_ways() {
    let h = harness().await;
    let (_, token) = h.register_and_login("linus@example.com").await;

    let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
        (0..16).map(|i| Ok(vec![b'a' + i as u8; 4096])).collect();
    let expected: Vec<u8> = chunks.iter().flat_map(|c| c.as_ref().unwrap().clone()).collect();

    let response = h
        .client
        .post(h.url("/todo/echo"))
        .bearer_auth(&token)
        .body(reqwest::Body::wrap_stream(futures_util::stream::iter(chunks)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().to_vec(), expected);
}

#[tokio::test]
async fn unknown_prefix_and_health() {
    let h = harness().await;

    let response = h.client.get(h.url("/todos")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h.client.get(h.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}
