//! Probe configuration.
//!
//! Every endpoint, credential and identifier comes from a CLI flag or a
//! `SHIPCHECK_*` environment variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SHIPCHECK_COSMOS_ENDPOINT` | https://localhost:8081/ | Cosmos account endpoint |
//! | `SHIPCHECK_COSMOS_KEY` | (none) | Cosmos master key (base64) |
//! | `SHIPCHECK_COSMOS_API_VERSION` | 2018-12-31 | `x-ms-version` header |
//! | `SHIPCHECK_COSMOS_ALLOW_HTTP` | false | Allow a plain-HTTP endpoint (emulator) |
//! | `SHIPCHECK_DATABASE` | Shipment | Database id |
//! | `SHIPCHECK_CONTAINER` | Items | Primary container id |
//! | `SHIPCHECK_CONTAINER_PK_PATH` | /partitionKey | Primary container partition key path |
//! | `SHIPCHECK_XREF_CONTAINER` | ShipmentXref | Cross-reference container id |
//! | `SHIPCHECK_XREF_PK_PATH` | /PartitionKey | Cross-reference partition key path |
//! | `SHIPCHECK_PARTITION_KEY` | shipcheck | Partition key value for the run's record |
//! | `SHIPCHECK_API_BASE_URL` | http://localhost:8080 | Order API base URL |
//! | `SHIPCHECK_ORDER_PATH` | /load-xapi/v2/orders | Order submission path |
//! | `SHIPCHECK_API_TOKEN` | (none) | Static bearer token |
//! | `SHIPCHECK_FIXTURE` | Postman.json | Fixture path, relative to the working directory |
//! | `SHIPCHECK_REQUEST_TIMEOUT` | 30 | HTTP timeout (seconds) |
//! | `SHIPCHECK_VERIFY_ATTEMPTS` | 5 | Verification queries before giving up |
//! | `SHIPCHECK_VERIFY_INTERVAL_MS` | 500 | Delay between verification queries |
//! | `SHIPCHECK_LOG_LEVEL` | info | Log level |
//!
//! The repository's sample order lives at `fixtures/Postman.json`; from the
//! repository root pass `--fixture fixtures/Postman.json` or set
//! `SHIPCHECK_FIXTURE`.
//!
//! # Example
//!
//! ```rust
//! use shipcheck_probe::ProbeConfig;
//!
//! let config = ProbeConfig {
//!     api_base_url: "https://orders.internal.example".to_string(),
//!     verify_attempts: 1,
//!     ..ProbeConfig::for_testing()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use shipcheck_store::ContainerSpec;
use url::Url;

use crate::dispatch::ApiConfig;
use crate::environment::EnvironmentSpec;
use crate::error::{ProbeError, ProbeResult};
use crate::verify::RetryPolicy;

/// Settings for a probe run.
#[derive(Clone, Parser)]
#[command(name = "shipcheck")]
#[command(about = "Order submission smoke probe")]
pub struct ProbeConfig {
    /// Cosmos DB account endpoint.
    #[arg(long, env = "SHIPCHECK_COSMOS_ENDPOINT", default_value = "https://localhost:8081/")]
    pub cosmos_endpoint: String,

    /// Cosmos DB master key (base64).
    #[arg(long, env = "SHIPCHECK_COSMOS_KEY", default_value = "", hide_env_values = true)]
    pub cosmos_key: String,

    /// Cosmos REST API version.
    #[arg(long, env = "SHIPCHECK_COSMOS_API_VERSION", default_value = "2018-12-31")]
    pub cosmos_api_version: String,

    /// Allow a plain-HTTP Cosmos endpoint.
    #[arg(long, env = "SHIPCHECK_COSMOS_ALLOW_HTTP", default_value = "false")]
    pub cosmos_allow_http: bool,

    /// Database id.
    #[arg(long, env = "SHIPCHECK_DATABASE", default_value = "Shipment")]
    pub database: String,

    /// Primary container id.
    #[arg(long, env = "SHIPCHECK_CONTAINER", default_value = "Items")]
    pub container: String,

    /// Primary container partition key path.
    #[arg(long, env = "SHIPCHECK_CONTAINER_PK_PATH", default_value = "/partitionKey")]
    pub container_pk_path: String,

    /// Cross-reference container id.
    #[arg(long, env = "SHIPCHECK_XREF_CONTAINER", default_value = "ShipmentXref")]
    pub xref_container: String,

    /// Cross-reference container partition key path.
    #[arg(long, env = "SHIPCHECK_XREF_PK_PATH", default_value = "/PartitionKey")]
    pub xref_pk_path: String,

    /// Partition key value written on the transaction record.
    #[arg(long, env = "SHIPCHECK_PARTITION_KEY", default_value = "shipcheck")]
    pub partition_key: String,

    /// Order API base URL.
    #[arg(long, env = "SHIPCHECK_API_BASE_URL", default_value = "http://localhost:8080")]
    pub api_base_url: String,

    /// Order submission path.
    #[arg(long, env = "SHIPCHECK_ORDER_PATH", default_value = "/load-xapi/v2/orders")]
    pub order_path: String,

    /// Static bearer token for the order API.
    #[arg(long, env = "SHIPCHECK_API_TOKEN", default_value = "", hide_env_values = true)]
    pub api_token: String,

    /// Fixture file, resolved against the working directory.
    #[arg(long, env = "SHIPCHECK_FIXTURE", default_value = "Postman.json")]
    pub fixture: PathBuf,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "SHIPCHECK_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Verification queries before reporting a miss.
    #[arg(long, env = "SHIPCHECK_VERIFY_ATTEMPTS", default_value = "5")]
    pub verify_attempts: u32,

    /// Milliseconds between verification queries.
    #[arg(long, env = "SHIPCHECK_VERIFY_INTERVAL_MS", default_value = "500")]
    pub verify_interval_ms: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SHIPCHECK_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cosmos_endpoint: "https://localhost:8081/".to_string(),
            cosmos_key: String::new(),
            cosmos_api_version: "2018-12-31".to_string(),
            cosmos_allow_http: false,
            database: "Shipment".to_string(),
            container: "Items".to_string(),
            container_pk_path: "/partitionKey".to_string(),
            xref_container: "ShipmentXref".to_string(),
            xref_pk_path: "/PartitionKey".to_string(),
            partition_key: "shipcheck".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
            order_path: "/load-xapi/v2/orders".to_string(),
            api_token: String::new(),
            fixture: PathBuf::from("Postman.json"),
            request_timeout: 30,
            verify_attempts: 5,
            verify_interval_ms: 500,
            log_level: "info".to_string(),
        }
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("cosmos_endpoint", &self.cosmos_endpoint)
            .field("cosmos_key", &"<redacted>")
            .field("cosmos_api_version", &self.cosmos_api_version)
            .field("cosmos_allow_http", &self.cosmos_allow_http)
            .field("database", &self.database)
            .field("container", &self.container)
            .field("container_pk_path", &self.container_pk_path)
            .field("xref_container", &self.xref_container)
            .field("xref_pk_path", &self.xref_pk_path)
            .field("partition_key", &self.partition_key)
            .field("api_base_url", &self.api_base_url)
            .field("order_path", &self.order_path)
            .field("api_token", &"<redacted>")
            .field("fixture", &self.fixture)
            .field("request_timeout", &self.request_timeout)
            .field("verify_attempts", &self.verify_attempts)
            .field("verify_interval_ms", &self.verify_interval_ms)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ProbeConfig {
    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cosmos_endpoint.trim().is_empty() {
            errors.push("Cosmos endpoint cannot be empty".to_string());
        }

        if self.cosmos_key.trim().is_empty() {
            errors.push("Cosmos key is required (SHIPCHECK_COSMOS_KEY)".to_string());
        } else if STANDARD.decode(self.cosmos_key.trim()).is_err() {
            errors.push("Cosmos key must be base64".to_string());
        }

        for (name, value) in [
            ("Database id", &self.database),
            ("Container id", &self.container),
            ("Cross-reference container id", &self.xref_container),
            ("Partition key value", &self.partition_key),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{name} cannot be empty"));
            }
        }

        for (name, value) in [
            ("Container partition key path", &self.container_pk_path),
            ("Cross-reference partition key path", &self.xref_pk_path),
        ] {
            if !value.starts_with('/') || value.len() < 2 {
                errors.push(format!("{name} must look like /field, got '{value}'"));
            }
        }

        match Url::parse(&self.api_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "API base URL must be http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("API base URL is invalid: {e}")),
        }

        if !self.order_path.starts_with('/') {
            errors.push("Order path must start with '/'".to_string());
        }

        if self.api_token.trim().is_empty() {
            errors.push("API token is required (SHIPCHECK_API_TOKEN)".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.verify_attempts == 0 {
            errors.push("Verify attempts cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates and wraps failures in [`ProbeError::Config`].
    pub fn ensure_valid(&self) -> ProbeResult<()> {
        self.validate().map_err(ProbeError::Config)
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses a dummy key and token, allows plain HTTP and polls quickly.
    pub fn for_testing() -> Self {
        Self {
            cosmos_endpoint: "http://127.0.0.1:8081/".to_string(),
            cosmos_key: "c2hpcGNoZWNrLXRlc3Qta2V5".to_string(),
            cosmos_allow_http: true,
            api_token: "test-token".to_string(),
            request_timeout: 5,
            verify_attempts: 3,
            verify_interval_ms: 10,
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Verification polling policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.verify_attempts,
            interval: Duration::from_millis(self.verify_interval_ms),
        }
    }

    /// Database and container layout to provision.
    pub fn environment_spec(&self) -> EnvironmentSpec {
        EnvironmentSpec {
            database_id: self.database.clone(),
            primary: ContainerSpec::new(&self.container, &self.container_pk_path),
            xref: ContainerSpec::new(&self.xref_container, &self.xref_pk_path),
        }
    }

    /// Order API settings.
    pub fn api_config(&self) -> ProbeResult<ApiConfig> {
        let base_url = Url::parse(&self.api_base_url).map_err(|e| {
            ProbeError::Config(vec![format!("API base URL is invalid: {e}")])
        })?;
        Ok(ApiConfig {
            base_url,
            order_path: self.order_path.clone(),
            bearer_token: self.api_token.clone(),
            timeout: self.request_timeout(),
        })
    }

    /// Cosmos backend settings.
    #[cfg(feature = "cosmos")]
    pub fn cosmos_config(&self) -> shipcheck_store::backends::cosmos::CosmosConfig {
        shipcheck_store::backends::cosmos::CosmosConfig {
            endpoint: self.cosmos_endpoint.clone(),
            master_key: self.cosmos_key.clone(),
            api_version: self.cosmos_api_version.clone(),
            request_timeout_ms: self.request_timeout.saturating_mul(1000),
            allow_http: self.cosmos_allow_http,
            ..Default::default()
        }
    }
}
