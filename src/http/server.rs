//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Construct every gateway component explicitly from config
//! - Create the Axum Router with the auth gate in front of the proxy handler
//! - Wire up middleware (panic catcher, request ID, tracing)
//! - Resolve routes against the live table and hand requests to the transport
//! - Run the route refresher alongside the server until shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::auth::{authenticate, AuthGate, JwtVerifier, TokenVerifier, VerifierInitError};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{catch_panic, error_response};
use crate::observability::metrics;
use crate::proxy::{HttpForwarder, ProxyTransport};
use crate::registry::{build_registry, RegistryCache, RegistryError, ServiceRegistry};
use crate::routing::{RouteRefresher, RouteTable, RouteTableHandle};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: RouteTableHandle,
    pub cache: Arc<RegistryCache>,
    pub transport: Arc<dyn ProxyTransport>,
    pub request_timeout: Duration,
}

/// Fatal problems while assembling the gateway.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("JWT verifier: {0}")]
    Verifier(#[from] VerifierInitError),

    #[error("service registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The gateway: explicitly constructed components plus the router over them.
pub struct GatewayServer {
    router: Router,
    refresher: RouteRefresher,
    state: AppState,
}

impl GatewayServer {
    /// Build all components from configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, StartupError> {
        let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::new(&config.jwt)?);
        let registry = build_registry(&config.registry)?;
        let transport: Arc<dyn ProxyTransport> =
            Arc::new(HttpForwarder::new(config.transport.upstream_url_template.clone()));
        Ok(Self::with_components(config, verifier, registry, transport))
    }

    /// Build from caller-supplied collaborators.
    pub fn with_components(
        config: &GatewayConfig,
        verifier: Arc<dyn TokenVerifier>,
        registry: Arc<dyn ServiceRegistry>,
        transport: Arc<dyn ProxyTransport>,
    ) -> Self {
        let cache = Arc::new(RegistryCache::from_config(registry, &config.registry));
        let routes = RouteTableHandle::new(RouteTable::empty(config.routing.api_prefix.clone()));
        let refresher = RouteRefresher::new(cache.clone(), routes.clone(), &config.routing);

        let state = AppState {
            routes,
            cache,
            transport,
            request_timeout: Duration::from_secs(config.transport.request_timeout_secs),
        };
        let router = build_router(state.clone(), AuthGate::new(verifier));

        Self {
            router,
            refresher,
            state,
        }
    }

    /// Router with all layers, for serving or for driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Rebuild the route table now if the registry cache has moved on.
    pub async fn refresh_routes(&self) -> Result<bool, GatewayError> {
        self.refresher.refresh_once().await
    }

    /// Build the first route table. Failure is logged, not fatal.
    pub async fn prime_routes(&self) -> bool {
        match self.refresh_routes().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Initial route build failed; serving 503 until the registry answers");
                false
            }
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.prime_routes().await;

        let refresher_shutdown = shutdown.resubscribe();
        let refresher = tokio::spawn(self.refresher.run(refresher_shutdown));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        let _ = refresher.await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState, gate: AuthGate) -> Router {
    let proxied = Router::new()
        .route("/", any(proxy_handler))
        .route("/{*path}", any(proxy_handler))
        .route_layer(middleware::from_fn_with_state(gate, authenticate));

    Router::new()
        .route("/health", get(health_handler).fallback(method_not_allowed))
        .merge(proxied)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span::<Body>))
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
        .layer(middleware::from_fn(catch_panic))
}

/// Main proxy handler.
/// Looks up the route in the current table and forwards the request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = match forward(&state, request).await {
        Ok(response) => response,
        Err(e) => error_response(&e, &path),
    };

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

async fn forward(state: &AppState, mut request: Request<Body>) -> Result<Response, GatewayError> {
    // One table for the whole routing decision.
    let table = state.routes.current();
    if table.generation() == 0 && state.cache.peek().is_none() {
        return Err(GatewayError::RegistryUnavailable(
            "no registry snapshot has been fetched yet".to_string(),
        ));
    }

    let path = request.uri().path().to_string();
    let matched = table
        .resolve(&path)
        .ok_or_else(|| GatewayError::NoRoute { path: path.clone() })?;

    let forward_uri = match request.uri().query() {
        Some(query) => format!("{}?{}", matched.path.forward_path(), query),
        None => matched.path.forward_path().to_string(),
    };
    *request.uri_mut() = Uri::try_from(forward_uri)
        .map_err(|e| GatewayError::Internal(format!("rewritten uri invalid: {}", e)))?;

    let entry = matched.entry.clone();
    tracing::trace!(service = %entry.service, prefix = %entry.path_prefix, "Route matched");

    tokio::time::timeout(state.request_timeout, state.transport.forward(&entry, request))
        .await
        .map_err(|_| GatewayError::upstream(StatusCode::GATEWAY_TIMEOUT, "upstream request timed out"))?
}

async fn method_not_allowed(request: Request<Body>) -> Response {
    let err = GatewayError::http(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    error_response(&err, request.uri().path())
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    routes: usize,
    route_generation: u64,
    snapshot_age_secs: Option<u64>,
    registry_ttl_secs: u64,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let table = state.routes.current();
    let snapshot = state.cache.peek();
    let status = if snapshot.is_some() { "UP" } else { "DEGRADED" };
    Json(HealthStatus {
        status,
        routes: table.len(),
        route_generation: table.generation(),
        snapshot_age_secs: snapshot.map(|s| s.age().as_secs()),
        registry_ttl_secs: state.cache.ttl().as_secs(),
    })
}
