use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for the Cosmos DB backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct CosmosConfig {
    /// Account endpoint, e.g. `https://my-account.documents.azure.com:443/`.
    pub endpoint: String,

    /// Base64 account master key.
    pub master_key: String,

    /// Value sent in `x-ms-version`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Allow plain-HTTP endpoints (emulator, mock servers).
    #[serde(default)]
    pub allow_http: bool,

    /// Default `x-ms-max-item-count` for queries without their own cap.
    #[serde(default = "default_max_item_count")]
    pub max_item_count: u32,
}

fn default_api_version() -> String {
    "2018-12-31".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_item_count() -> u32 {
    100
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:8081/".to_string(),
            master_key: String::new(),
            api_version: default_api_version(),
            request_timeout_ms: default_request_timeout_ms(),
            allow_http: false,
            max_item_count: default_max_item_count(),
        }
    }
}

impl fmt::Debug for CosmosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosConfig")
            .field("endpoint", &self.endpoint)
            .field("master_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("allow_http", &self.allow_http)
            .field("max_item_count", &self.max_item_count)
            .finish()
    }
}

impl CosmosConfig {
    /// Validates configuration invariants.
    pub fn validate(&self) -> StoreResult<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(StoreError::invalid_config("endpoint must not be empty"));
        }

        let lower = endpoint.to_ascii_lowercase();
        let is_http = lower.starts_with("http://");
        let is_https = lower.starts_with("https://");
        if !is_http && !is_https {
            return Err(StoreError::invalid_config(
                "endpoint must start with http:// or https://",
            ));
        }
        if is_http && !self.allow_http {
            return Err(StoreError::invalid_config(
                "http endpoint requires allow_http=true",
            ));
        }

        if self.master_key.trim().is_empty() {
            return Err(StoreError::invalid_config("master_key must not be empty"));
        }
        if STANDARD.decode(self.master_key.trim()).is_err() {
            return Err(StoreError::invalid_config("master_key must be valid base64"));
        }

        if self.api_version.trim().is_empty() {
            return Err(StoreError::invalid_config("api_version must not be empty"));
        }

        if self.request_timeout_ms == 0 {
            return Err(StoreError::invalid_config("request_timeout_ms must be > 0"));
        }

        if self.max_item_count == 0 {
            return Err(StoreError::invalid_config("max_item_count must be > 0"));
        }

        Ok(())
    }
}
