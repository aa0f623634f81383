//! shipcheck
//!
//! Order submission smoke probe: POST a fixture order, then confirm the
//! transaction record can be read back from Cosmos DB.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use shipcheck_probe::{FixtureDocument, ProbeConfig, RunIdentifiers, init_logging};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "shipcheck", version, about = "Order submission smoke probe")]
struct Cli {
    #[command(flatten)]
    config: ProbeConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full flow: provision, POST, persist, verify (default).
    Run,
    /// Provision the database and containers, then check they are reachable.
    Connect,
    /// Validate a fixture file offline.
    Validate {
        /// Fixture to check; defaults to the configured fixture.
        path: Option<PathBuf>,
    },
    /// Print a freshly generated identifier pair.
    Ids,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    match cli.command.unwrap_or(Command::Run) {
        Command::Validate { path } => {
            let path = path.unwrap_or_else(|| cli.config.fixture.clone());
            validate(path).await
        }
        Command::Ids => {
            println!("{}", serde_json::to_string_pretty(&RunIdentifiers::generate())?);
            Ok(())
        }
        Command::Connect => {
            require_valid(&cli.config);
            connect(cli.config).await
        }
        Command::Run => {
            require_valid(&cli.config);
            run(cli.config).await
        }
    }
}

fn require_valid(config: &ProbeConfig) {
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }
}

async fn validate(path: PathBuf) -> anyhow::Result<()> {
    match validate_fixture(&path).await {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Loads and validates a fixture, returning the summary printed by `validate`.
async fn validate_fixture(path: &Path) -> anyhow::Result<Value> {
    let fixture = FixtureDocument::load(path).await?;
    Ok(json!({
        "fixture": path.display().to_string(),
        "valid": true,
        "stops": fixture.stop_count(),
        "routes": fixture.route_count(),
    }))
}

#[cfg(feature = "cosmos")]
fn cosmos_probe(
    config: ProbeConfig,
) -> anyhow::Result<shipcheck_probe::Probe<shipcheck_store::backends::cosmos::CosmosStore>> {
    use shipcheck_store::backends::cosmos::CosmosStore;

    let store = CosmosStore::new(config.cosmos_config())
        .map_err(|e| anyhow::anyhow!("Invalid Cosmos configuration: {}", e))?;
    Ok(shipcheck_probe::Probe::new(store, config)?)
}

/// Provisions and checks the document store.
#[cfg(feature = "cosmos")]
async fn connect(config: ProbeConfig) -> anyhow::Result<()> {
    info!(
        endpoint = %config.cosmos_endpoint,
        database = %config.database,
        "Checking Cosmos DB connection"
    );
    let probe = cosmos_probe(config)?;
    let env = probe.check_connection().await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "database": env.database.id(),
            "containers": [
                {"id": env.primary.id(), "partitionKeyPath": env.primary.partition_key_path()},
                {"id": env.xref.id(), "partitionKeyPath": env.xref.partition_key_path()},
            ],
            "connected": true,
        }))?
    );
    Ok(())
}

/// Runs the full probe and exits non-zero unless the record was verified.
#[cfg(feature = "cosmos")]
async fn run(config: ProbeConfig) -> anyhow::Result<()> {
    info!(
        api = %config.api_base_url,
        order_path = %config.order_path,
        fixture = %config.fixture.display(),
        database = %config.database,
        "Starting shipcheck run"
    );
    let probe = cosmos_probe(config)?;
    let report = probe.run().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Fallback when the cosmos feature is not enabled.
#[cfg(not(feature = "cosmos"))]
async fn connect(_config: ProbeConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The connect command requires the 'cosmos' feature. \
         Build with: cargo build -p shipcheck --features cosmos"
    )
}

/// Fallback when the cosmos feature is not enabled.
#[cfg(not(feature = "cosmos"))]
async fn run(_config: ProbeConfig) -> anyhow::Result<()> {
    anyhow::bail!(
        "The run command requires the 'cosmos' feature. \
         Build with: cargo build -p shipcheck --features cosmos"
    )
}
