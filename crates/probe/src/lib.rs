//! # shipcheck-probe
//!
//! An order-submission smoke probe. One run:
//!
//! 1. loads and validates the order fixture (no network calls on failure),
//! 2. ensures the database and its two containers exist,
//! 3. stamps the fixture with a fresh correlation id and order code,
//! 4. POSTs it to the order API and requires `201 Created`,
//! 5. writes a transaction record and polls until it can be read back.
//!
//! Progress is tracked in a [`RunContext`] and summarized as a [`RunReport`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use shipcheck_probe::{Probe, ProbeConfig};
//! use shipcheck_store::backends::memory::MemoryStore;
//!
//! # async fn example() -> Result<(), shipcheck_probe::ProbeError> {
//! let probe = Probe::new(MemoryStore::new(), ProbeConfig::for_testing())?;
//! let report = probe.run().await;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod fixture;
pub mod ids;
pub mod probe;
pub mod record;
pub mod verify;

pub use config::ProbeConfig;
pub use context::{RunContext, RunPhase, RunReport};
pub use error::{FailureKind, ProbeError, ProbeResult, ValidationError};
pub use fixture::FixtureDocument;
pub use ids::RunIdentifiers;
pub use probe::Probe;

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence; otherwise the shipcheck crates log at `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "shipcheck={level},shipcheck_probe={level},shipcheck_store={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
