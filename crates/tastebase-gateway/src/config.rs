//! Gateway configuration.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Backend base URL requests under `/api` are forwarded to.
    #[serde(default = "default_backend_target")]
    pub backend_target: String,

    /// Origin allowed by CORS; `*` allows any.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Ceiling for a full connect-and-respond round trip to the backend,
    /// in seconds. Exceeding it is treated like a connection refusal.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    4000
}

fn default_backend_target() -> String {
    "http://localhost:3001".into()
}

fn default_allowed_origin() -> String {
    "*".into()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend_target: default_backend_target(),
            allowed_origin: default_allowed_origin(),
            timeout_secs: default_timeout_secs(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be > 0".into());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be > 0".into());
        }
        if self.body_limit_bytes == 0 {
            return Err("body_limit_bytes must be > 0".into());
        }
        reqwest::Url::parse(&self.backend_target)
            .map_err(|e| format!("backend_target is not a valid URL: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub mod loader {
    use super::GatewayConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Load configuration from `tastebase.toml` (if present) with
    /// `GATEWAY_*` environment overrides, e.g. `GATEWAY_PORT=4000`,
    /// `GATEWAY_BACKEND_TARGET=http://localhost:3001`,
    /// `GATEWAY_ALLOWED_ORIGIN=https://app.example.com`.
    pub fn load_config(path: Option<&str>) -> Result<GatewayConfig, String> {
        let mut builder = Config::builder();

        let file_path = PathBuf::from(path.unwrap_or("tastebase.toml"));
        if file_path.exists() {
            builder = builder.add_source(File::from(file_path));
        }

        builder = builder.add_source(Environment::with_prefix("GATEWAY").try_parsing(true));

        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: GatewayConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
