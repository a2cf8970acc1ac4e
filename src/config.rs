use anyhow::{Context, Result};
use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
    time::Duration,
};

use crate::model::ModelSource;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model: ModelSource,
    pub inference_timeout: Duration,
    /// Upper bound on model calls running at once
    pub max_inferences: usize,
    pub log_features: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading through `lookup` instead of the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(s) => s.parse::<u16>().with_context(|| format!("invalid PORT {:?}", s))?,
            None => 5000,
        };
        let model_path = lookup("MODEL_PATH").unwrap_or_else(|| "model.json".to_string());
        let meta_path = lookup("META_PATH").map(PathBuf::from);
        let timeout_ms: u64 = match lookup("INFERENCE_TIMEOUT_MS") {
            Some(s) => s
                .parse::<u64>()
                .with_context(|| format!("invalid INFERENCE_TIMEOUT_MS {:?}", s))?,
            None => 2000,
        };
        let max_inferences = match lookup("MAX_INFERENCES") {
            Some(s) => s
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("invalid MAX_INFERENCES {:?}", s))?,
            None => 8,
        };

        Ok(Self {
            host,
            port,
            model: ModelSource::from_paths(model_path, meta_path),
            inference_timeout: Duration::from_millis(timeout_ms),
            max_inferences,
            log_features: lookup("LOG_FEATURES").as_deref() == Some("1"),
        })
    }

    /// First address `HOST` resolves to; accepts IPv4, IPv6 and host names.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("cannot resolve HOST {:?}", self.host))?
            .next()
            .with_context(|| format!("HOST {:?} resolved to no address", self.host))
    }
}
