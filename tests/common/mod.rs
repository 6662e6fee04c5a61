//! Shared utilities for gateway integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use service_gateway::auth::{AuthError, JwtVerifier, TokenVerifier, VerifiedClaims};
use service_gateway::config::GatewayConfig;
use service_gateway::proxy::ProxyTransport;
use service_gateway::registry::{RegistryError, ServiceRegistry};
use service_gateway::routing::RouteEntry;
use service_gateway::{GatewayError, GatewayServer};

/// Base64 of "iamtestsecretkey1234567890abcdef".
pub const SECRET: &str = "aWFtdGVzdHNlY3JldGtleTEyMzQ1Njc4OTBhYmNkZWY=";
/// Base64 of "iamanothertestsecretkey1234567890abcdef".
pub const OTHER_SECRET: &str = "aWFtYW5vdGhlcnRlc3RzZWNyZXRrZXkxMjM0NTY3ODkwYWJjZGVm";

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// Sign an HS256 token for `test-user` expiring at `exp`.
pub fn mint(secret_b64: &str, exp: u64) -> String {
    let secret = STANDARD.decode(secret_b64).unwrap();
    encode(
        &Header::new(Algorithm::HS256),
        &json!({ "sub": "test-user", "iat": now(), "exp": exp }),
        &EncodingKey::from_secret(&secret),
    )
    .unwrap()
}

pub fn valid_token() -> String {
    mint(SECRET, now() + 3600)
}

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.jwt.secret = SECRET.to_string();
    config
}

/// Registry whose answer can be changed or broken between polls.
pub struct TestRegistry {
    names: Mutex<Vec<String>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl TestRegistry {
    pub fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            names: Mutex::new(names.iter().map(|s| s.to_string()).collect()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_names(&self, names: &[&str]) {
        *self.names.lock().unwrap() = names.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceRegistry for TestRegistry {
    async fn list_service_names(&self) -> Result<BTreeSet<String>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("connection refused".to_string()));
        }
        Ok(self.names.lock().unwrap().iter().cloned().collect())
    }
}

/// Real verifier wrapped with a call counter.
pub struct CountingVerifier {
    inner: JwtVerifier,
    calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn new(config: &GatewayConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: JwtVerifier::new(&config.jwt).unwrap(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenVerifier for CountingVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(token)
    }
}

/// What the transport should do with the next request.
#[derive(Clone)]
pub enum TransportBehavior {
    Echo,
    Fail(StatusCode, &'static str),
    Panic,
}

/// Transport that records forwarded requests instead of sending them.
pub struct RecordingTransport {
    behavior: Mutex<TransportBehavior>,
    forwarded: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(TransportBehavior::Echo),
            forwarded: Mutex::new(Vec::new()),
        })
    }

    pub fn set_behavior(&self, behavior: TransportBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// (service, path-and-query) pairs in arrival order.
    pub fn forwarded(&self) -> Vec<(String, String)> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProxyTransport for RecordingTransport {
    async fn forward(&self, route: &RouteEntry, request: Request<Body>) -> Result<Response, GatewayError> {
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            TransportBehavior::Echo => {
                let uri = request.uri().to_string();
                self.forwarded
                    .lock()
                    .unwrap()
                    .push((route.service.clone(), uri.clone()));
                Ok(Response::new(Body::from(format!("{} {}", route.service, uri))))
            }
            TransportBehavior::Fail(status, reason) => Err(GatewayError::upstream(status, reason)),
            TransportBehavior::Panic => panic!("transport exploded"),
        }
    }
}

pub struct Harness {
    pub server: GatewayServer,
    pub registry: Arc<TestRegistry>,
    pub verifier: Arc<CountingVerifier>,
    pub transport: Arc<RecordingTransport>,
}

impl Harness {
    /// Gateway over fakes, with the first route table already built.
    pub async fn start(config: GatewayConfig, services: &[&str]) -> Self {
        let harness = Self::with_registry(config, TestRegistry::new(services));
        harness.server.prime_routes().await;
        harness
    }

    /// Gateway over fakes with no route table built yet.
    pub fn with_registry(config: GatewayConfig, registry: Arc<TestRegistry>) -> Self {
        let verifier = CountingVerifier::new(&config);
        let transport = RecordingTransport::new();
        let server = GatewayServer::with_components(
            &config,
            verifier.clone(),
            registry.clone(),
            transport.clone(),
        );
        Self {
            server,
            registry,
            verifier,
            transport,
        }
    }

    pub async fn send(&self, path: &str, authorization: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        self.server
            .router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn send_authorized(&self, path: &str) -> Response {
        let header = format!("Bearer {}", valid_token());
        self.send(path, Some(&header)).await
    }
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Check the five envelope fields and that `status` matches the status line.
pub async fn assert_envelope(response: Response, status: StatusCode, path: &str) -> Value {
    assert_eq!(response.status(), status);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body = body_json(response).await;
    let obj = body.as_object().expect("envelope must be an object");
    assert_eq!(obj.len(), 5, "unexpected envelope fields: {:?}", obj.keys());
    assert!(obj["timestamp"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(obj["status"], status.as_u16());
    assert_eq!(obj["error"], status.canonical_reason().unwrap());
    assert!(obj["message"].is_string());
    assert_eq!(obj["path"], path);
    body
}

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
