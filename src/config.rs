//! Service configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default directory holding the model artifact
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Settings for the prediction server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Directory holding `conflict_predictor.json` and `scaler.json`
    pub model_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
        }
    }
}

impl ServiceConfig {
    /// Socket address to listen on
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if host and port do not form a valid
    /// socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            Error::Configuration(format!(
                "invalid listen address {}:{}: {e}",
                self.host, self.port
            ))
        })
    }
}
