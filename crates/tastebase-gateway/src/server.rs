use std::net::SocketAddr;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{any, get},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::GatewayConfig, handlers, middleware as gateway_middleware, proxy};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

pub fn build_app(cfg: &GatewayConfig) -> Router {
    let state = AppState::new(cfg.clone());

    Router::new()
        // Gateway-local endpoints
        .route("/healthz", get(handlers::healthz))
        // Everything under /api goes to the backend
        .route("/api", any(proxy::forward))
        .route("/api/", any(proxy::forward))
        .route("/api/{*path}", any(proxy::forward))
        // Middleware stack (order: body buffering -> cors -> trace)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gateway_middleware::parse_json_body,
        ))
        .layer(cors_layer(&cfg.allowed_origin))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri()
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

/// CORS is a stateless pass-through: `*` allows any origin, anything
/// else is pinned to the single configured origin.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origin == "*" {
        return layer.allow_origin(Any);
    }

    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(
                origin = %allowed_origin,
                error = %e,
                "invalid allowed origin, falling back to any"
            );
            layer.allow_origin(Any)
        }
    }
}

pub struct GatewayServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    config: GatewayConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: GatewayConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> GatewayServer {
        GatewayServer {
            addr: self.config.addr(),
            app: build_app(&self.config),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("gateway listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
