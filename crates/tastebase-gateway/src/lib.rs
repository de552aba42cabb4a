//! Tastebase API gateway.
//!
//! Fronts the backend service: accepts client traffic under `/api`,
//! strips the prefix and forwards to the configured backend target,
//! translating backend unavailability into a stable 502 contract. CORS
//! and body buffering happen here so the backend sees clean requests.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod proxy;
pub mod server;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use server::{AppState, GatewayServer, ServerBuilder, build_app};
