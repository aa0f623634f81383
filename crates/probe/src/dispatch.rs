//! Order API dispatch.

use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, info};
use url::Url;

use crate::error::{ProbeError, ProbeResult};

/// Status the order API returns for an accepted order.
pub const EXPECTED_STATUS: u16 = 201;

/// Order API connection settings.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL the order path is resolved against.
    pub base_url: Url,
    /// Order submission path, e.g. `/load-xapi/v2/orders`.
    pub order_path: String,
    /// Static bearer token.
    pub bearer_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("order_path", &self.order_path)
            .field("bearer_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What the order API answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl DispatchOutcome {
    /// True for 201 Created.
    pub fn is_created(&self) -> bool {
        self.status == EXPECTED_STATUS
    }

    /// Fails with [`ProbeError::UnexpectedStatus`] unless the order was created.
    pub fn ensure_created(&self) -> ProbeResult<()> {
        if self.is_created() {
            Ok(())
        } else {
            Err(ProbeError::UnexpectedStatus {
                expected: EXPECTED_STATUS,
                actual: self.status,
                body: self.body.clone(),
            })
        }
    }
}

/// POSTs fixture bodies to the order API.
#[derive(Debug, Clone)]
pub struct OrderDispatcher {
    client: reqwest::Client,
    endpoint: Url,
}

impl OrderDispatcher {
    /// Builds a client carrying the bearer token and JSON content type on
    /// every request.
    pub fn new(config: &ApiConfig) -> ProbeResult<Self> {
        let endpoint = config.base_url.join(&config.order_path).map_err(|e| {
            ProbeError::Config(vec![format!(
                "cannot resolve order path '{}': {e}",
                config.order_path
            )])
        })?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .map_err(|_| {
                ProbeError::Config(vec![
                    "API token contains characters not allowed in a header".to_string(),
                ])
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, endpoint })
    }

    /// Fully resolved order endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POSTs `body` and captures the status and body text.
    ///
    /// Any status is returned as an outcome; only transport failures are
    /// errors here.
    pub async fn send(&self, body: String) -> ProbeResult<DispatchOutcome> {
        debug!(endpoint = %self.endpoint, bytes = body.len(), "sending order");

        let response = self.client.post(self.endpoint.clone()).body(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        info!(status, "order API responded");
        debug!(body = %body, "order API response body");

        Ok(DispatchOutcome { status, body })
    }
}
