//! Environment-backed gateway configuration.

use std::env;
use std::path::PathBuf;

use crate::client::DEFAULT_BASE_URL;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub gemini_base_url: String,
    pub dump_dir: PathBuf,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("GATEWAY_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8080),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            dump_dir: env::var("GATEWAY_DUMP_DIR")
                .unwrap_or_else(|_| "./data".to_string())
                .into(),
        }
    }
}
