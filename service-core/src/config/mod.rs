//! Shared configuration layer.
//!
//! Every iReporter service loads the same base section (the HTTP bind
//! address) from an optional `configuration` file plus `APP__`-prefixed
//! environment variables, with the environment winning. Service-specific
//! sections live in each service crate and are assembled on top of this.

use crate::error::AppError;
use config::{Config as Loader, File};
use serde::Deserialize;

/// Base settings common to every service.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load the base section. A missing `configuration` file is fine; the
    /// defaults bind to `0.0.0.0:8080`.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let loaded = Loader::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(loaded.try_deserialize()?)
    }

    /// The socket address string the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let cfg: Config = Loader::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = Config {
            host: "127.0.0.1".to_string(),
            port: 9090,
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9090");
    }
}
