//! HTTP configuration (`http.json`)

use crate::retry::{RetryConfig, RetryConfigLayer};
use serde::{Deserialize, Serialize};
use tether_foundation::{JsonStore, Result};
use tracing::debug;

/// Config file name
pub const HTTP_CONFIG_FILE: &str = "http.json";

/// Transport and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfig {
    /// TCP connect timeout for the transport client
    pub connect_timeout_ms: u64,

    /// Applied when a request sets no timeout of its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,

    /// Proxy URL for all requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Retry wrapper settings
    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            default_timeout_ms: None,
            proxy: None,
            retry: RetryConfig::no_retry(),
        }
    }
}

/// One `http.json` as written on disk; absent keys are `None`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConfigLayer {
    pub connect_timeout_ms: Option<u64>,
    pub default_timeout_ms: Option<u64>,
    pub proxy: Option<String>,
    pub retry: Option<RetryConfigLayer>,
}

impl HttpConfig {
    /// Load global, then project configuration; project keys win
    pub fn load() -> Result<Self> {
        let mut stores = Vec::new();
        if let Ok(global) = JsonStore::global() {
            stores.push(global);
        }
        stores.push(JsonStore::current_project()?);
        Self::load_from(&stores)
    }

    /// Merge the files of `stores` in order over the defaults
    pub fn load_from(stores: &[JsonStore]) -> Result<Self> {
        let mut config = Self::default();
        for store in stores {
            if let Some(layer) = store.load_optional::<HttpConfigLayer>(HTTP_CONFIG_FILE)? {
                debug!(dir = %store.base_dir().display(), "Merging HTTP config");
                config.merge(layer);
            }
        }
        Ok(config)
    }

    /// Overlay the keys `layer` sets
    pub fn merge(&mut self, layer: HttpConfigLayer) {
        if let Some(connect_timeout_ms) = layer.connect_timeout_ms {
            self.connect_timeout_ms = connect_timeout_ms;
        }
        if layer.default_timeout_ms.is_some() {
            self.default_timeout_ms = layer.default_timeout_ms;
        }
        if layer.proxy.is_some() {
            self.proxy = layer.proxy;
        }
        if let Some(retry) = layer.retry {
            self.retry.merge(retry);
        }
    }
}
