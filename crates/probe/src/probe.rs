//! The end-to-end probe run.

use tracing::{error, info, instrument};

use shipcheck_store::DocumentStore;

use crate::config::ProbeConfig;
use crate::context::{RunContext, RunPhase, RunReport};
use crate::dispatch::OrderDispatcher;
use crate::environment::{self, Environment};
use crate::error::{ProbeError, ProbeResult};
use crate::fixture::FixtureDocument;
use crate::ids::RunIdentifiers;
use crate::record::TransactionRecord;
use crate::verify::Verifier;

/// Runs the order smoke flow against a document store.
pub struct Probe<S: DocumentStore> {
    store: S,
    config: ProbeConfig,
    dispatcher: OrderDispatcher,
}

impl<S: DocumentStore> Probe<S> {
    /// Validates `config` and prepares the HTTP client. Makes no network
    /// calls.
    pub fn new(store: S, config: ProbeConfig) -> ProbeResult<Self> {
        config.ensure_valid()?;
        let dispatcher = OrderDispatcher::new(&config.api_config()?)?;
        Ok(Self {
            store,
            config,
            dispatcher,
        })
    }

    /// Provisions the database and containers, then re-reads them.
    pub async fn check_connection(&self) -> ProbeResult<Environment> {
        let env = environment::provision(&self.store, &self.config.environment_spec()).await?;
        environment::check(&self.store, &env).await?;
        Ok(env)
    }

    /// Runs the whole flow and reports how far it got. Failures are captured
    /// in the report rather than returned.
    pub async fn run(&self) -> RunReport {
        let mut ctx = RunContext::new();
        if let Err(err) = self.execute(&mut ctx).await {
            error!(phase = %ctx.phase(), kind = %err.kind(), error = %err, "probe run failed");
            ctx.fail(&err);
        }

        let report = ctx.report();
        info!(
            phase = %report.phase,
            verified = report.verified,
            order_code = report.order_code.as_deref().unwrap_or_default(),
            http_status = report.http_status.unwrap_or_default(),
            attempts = report.attempts.unwrap_or_default(),
            "probe run finished"
        );
        report
    }

    #[instrument(skip_all, fields(store = %self.store.kind()))]
    async fn execute(&self, ctx: &mut RunContext) -> ProbeResult<()> {
        // A malformed fixture must stop the run before anything touches the
        // network, so it is loaded before provisioning.
        let mut fixture = FixtureDocument::load(&self.config.fixture).await?;
        info!(
            fixture = %self.config.fixture.display(),
            stops = fixture.stop_count(),
            routes = fixture.route_count(),
            "fixture validated"
        );

        let env = environment::provision(&self.store, &self.config.environment_spec()).await?;
        ctx.advance(RunPhase::Connected)?;

        let ids = RunIdentifiers::generate();
        fixture.assign_identifiers(&ids);
        info!(
            correlation_id = %ids.correlation_id,
            order_code = %ids.order_code,
            "identifiers assigned"
        );
        ctx.identifiers = Some(ids.clone());
        ctx.fixture = Some(fixture.clone());
        ctx.advance(RunPhase::FixtureLoaded)?;

        let outcome = self.dispatcher.send(fixture.to_body()?).await?;
        ctx.dispatch = Some(outcome.clone());
        outcome.ensure_created()?;
        ctx.advance(RunPhase::RequestSent)?;

        let verifier = Verifier::new(&self.store, &env.primary, self.config.retry_policy());
        let record = TransactionRecord::new(&self.config.partition_key, &ids, &fixture);
        verifier.persist(&record).await?;
        ctx.record_id = Some(record.id);
        ctx.advance(RunPhase::RecordPersisted)?;

        match verifier
            .await_order(&record.partition_key, &record.order_code)
            .await
        {
            Ok(attempts) => ctx.attempts = Some(attempts),
            Err(err) => {
                if let ProbeError::VerificationMiss { attempts, .. } = &err {
                    ctx.attempts = Some(*attempts);
                }
                return Err(err);
            }
        }
        ctx.advance(RunPhase::Verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipcheck_store::backends::memory::MemoryStore;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ProbeConfig {
            api_token: String::new(),
            ..ProbeConfig::for_testing()
        };
        match Probe::new(MemoryStore::new(), config) {
            Err(ProbeError::Config(errors)) => {
                assert!(errors.iter().any(|e| e.contains("API token")));
            }
            Err(other) => panic!("expected Config error, got {other:?}"),
            Ok(_) => panic!("expected Config error"),
        }
    }

    #[tokio::test]
    async fn test_check_connection_provisions_both_containers() {
        let store = MemoryStore::new();
        let probe = Probe::new(store.clone(), ProbeConfig::for_testing()).unwrap();

        let env = probe.check_connection().await.unwrap();

        assert_eq!(env.primary.id(), "Items");
        assert_eq!(env.xref.id(), "ShipmentXref");
        assert_eq!(env.xref.partition_key_path(), "/PartitionKey");
    }

    #[tokio::test]
    async fn test_missing_fixture_fails_before_connecting() {
        let store = MemoryStore::new();
        let config = ProbeConfig {
            fixture: "/no/such/Postman.json".into(),
            ..ProbeConfig::for_testing()
        };
        let probe = Probe::new(store.clone(), config).unwrap();

        let report = probe.run().await;

        assert!(!report.is_success());
        let failure = report.failure.unwrap();
        assert_eq!(failure.phase, RunPhase::Disconnected);
        assert_eq!(failure.kind, crate::error::FailureKind::Fixture);
        assert_eq!(store.call_count(), 0);
    }
}
