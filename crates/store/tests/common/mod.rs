//! Shared helpers for Cosmos backend tests.

#![allow(dead_code)]

use shipcheck_store::backends::cosmos::{CosmosConfig, CosmosStore};
use wiremock::MockServer;

/// Base64 of `shipcheck-test-key`.
pub const TEST_MASTER_KEY: &str = "c2hpcGNoZWNrLXRlc3Qta2V5";

/// Builds a Cosmos client pointed at a mock server.
pub fn cosmos_store(server: &MockServer) -> CosmosStore {
    let config = CosmosConfig {
        endpoint: server.uri(),
        master_key: TEST_MASTER_KEY.to_string(),
        allow_http: true,
        request_timeout_ms: 5_000,
        ..Default::default()
    };
    CosmosStore::new(config).expect("create Cosmos store")
}
