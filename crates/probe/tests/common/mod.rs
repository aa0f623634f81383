//! Shared helpers for probe integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::{Value, json};
use shipcheck_probe::ProbeConfig;
use tempfile::TempDir;
use wiremock::MockServer;

/// A small but realistic order fixture.
pub fn sample_fixture() -> Value {
    json!({
        "correlationId": "PLACEHOLDER",
        "order": {
            "code": "PLACEHOLDER",
            "customer": {"code": "ACME01"},
            "mode": "TL"
        },
        "stops": [
            {"sequence": 1, "type": "pickup", "location": {"city": "Omaha", "state": "NE"}},
            {"sequence": 2, "type": "delivery", "location": {"city": "Dallas", "state": "TX"}}
        ],
        "routes": [
            {"sequence": 1, "fromStop": 1, "toStop": 2}
        ]
    })
}

/// Writes `document` to `Postman.json` in a fresh temp dir.
///
/// Keep the returned [`TempDir`] alive for as long as the file is needed.
pub fn write_fixture(document: &Value) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("Postman.json");
    std::fs::write(&path, serde_json::to_vec_pretty(document).expect("serialize fixture"))
        .expect("write fixture");
    (dir, path)
}

/// Test configuration pointing the order API at `server`.
pub fn probe_config(server: &MockServer, fixture: PathBuf) -> ProbeConfig {
    ProbeConfig {
        api_base_url: server.uri(),
        fixture,
        ..ProbeConfig::for_testing()
    }
}
