//! Application configuration from environment variables.

use anyhow::Result;

#[derive(Clone, Debug)]
pub struct Config {
    /// Host of the key-value store backing the `Store` contract (spec §6).
    pub store_host: String,
    pub store_port: u16,
    /// Host/port the single HTTP+WebSocket listener binds on.
    pub ws_host: String,
    pub ws_port: u16,
    /// CORS allow-origin pattern. `"*"` allows any origin; otherwise an
    /// exact match or a single-`*`-wildcard pattern (e.g.
    /// `"https://*.example.com"`).
    pub cors_origin_pattern: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            store_host: std::env::var("STORE_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            store_port: std::env::var("STORE_PORT")
                .unwrap_or_else(|_| "6379".into())
                .parse()?,
            ws_host: std::env::var("WS_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            ws_port: std::env::var("WS_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            cors_origin_pattern: std::env::var("CORS_ORIGIN_PATTERN")
                .unwrap_or_else(|_| "*".into()),
        })
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.store_host, self.store_port)
    }
}
