//! Record persistence and read-back verification.

use std::time::Duration;

use serde_json::Value;
use shipcheck_store::core::find_first;
use shipcheck_store::{ContainerRef, DocumentStore, Query};
use tracing::{debug, info, warn};

use crate::error::{ProbeError, ProbeResult};
use crate::record::TransactionRecord;

/// How often to look for the record before calling it a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total queries to issue. Values below 1 are treated as 1.
    pub attempts: u32,
    /// Pause between queries.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// One query, no waiting.
    pub fn single() -> Self {
        Self {
            attempts: 1,
            interval: Duration::ZERO,
        }
    }
}

/// The lookup used to confirm a run's record: partition key and order code.
pub fn order_query(partition_key: &str, order_code: &str) -> Query {
    Query::new()
        .with_eq("partitionKey", partition_key)
        .with_eq("orderCode", order_code)
}

/// Writes and reads back transaction records in one container.
pub struct Verifier<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    container: &'a ContainerRef,
    policy: RetryPolicy,
}

impl<'a, S: DocumentStore + ?Sized> Verifier<'a, S> {
    /// Creates a verifier over `container`.
    pub fn new(store: &'a S, container: &'a ContainerRef, policy: RetryPolicy) -> Self {
        Self {
            store,
            container,
            policy,
        }
    }

    /// Writes `record` under its own partition key.
    pub async fn persist(&self, record: &TransactionRecord) -> ProbeResult<Value> {
        let document = serde_json::to_value(record)?;
        let stored = self
            .store
            .create_item(self.container, &record.partition_key, &document)
            .await?;
        info!(
            record_id = %record.id,
            container = self.container.id(),
            partition_key = %record.partition_key,
            "transaction record saved"
        );
        Ok(stored)
    }

    /// Runs the order query once, following continuation pages until the
    /// first match.
    pub async fn find_order(&self, partition_key: &str, order_code: &str) -> ProbeResult<bool> {
        let query = order_query(partition_key, order_code);
        match find_first(self.store, self.container, &query).await? {
            Some(item) => {
                debug!(item = %item, "found matching record");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Polls [`find_order`](Self::find_order) under the retry policy and
    /// returns the number of queries it took.
    pub async fn await_order(&self, partition_key: &str, order_code: &str) -> ProbeResult<u32> {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            if self.find_order(partition_key, order_code).await? {
                info!(order_code, attempt, "order verified");
                return Ok(attempt);
            }
            if attempt < attempts {
                debug!(order_code, attempt, "order not visible yet; retrying");
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        warn!(order_code, attempts, "order not found");
        Err(ProbeError::VerificationMiss {
            order_code: order_code.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shipcheck_store::ContainerSpec;
    use shipcheck_store::backends::memory::MemoryStore;
    use uuid::Uuid;

    async fn items(store: &MemoryStore) -> ContainerRef {
        let db = store.ensure_database("Shipment").await.unwrap().handle;
        store
            .ensure_container(&db, &ContainerSpec::new("Items", "/partitionKey"))
            .await
            .unwrap()
            .handle
    }

    fn record(order_code: &str) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            partition_key: "shipcheck".to_string(),
            correlation_id: "CORR".to_string(),
            order_code: order_code.to_string(),
            content: json!({"order": {"code": order_code}}),
        }
    }

    #[test]
    fn test_order_query_sql() {
        assert_eq!(
            order_query("pk", "ABC").to_sql(),
            "SELECT * FROM c WHERE c.partitionKey = @partitionKey AND c.orderCode = @orderCode"
        );
    }

    #[tokio::test]
    async fn test_persist_then_find() {
        let store = MemoryStore::new();
        let container = items(&store).await;
        let verifier = Verifier::new(&store, &container, RetryPolicy::single());

        verifier.persist(&record("ORDER1")).await.unwrap();

        assert!(verifier.find_order("shipcheck", "ORDER1").await.unwrap());
        assert!(!verifier.find_order("shipcheck", "ORDER2").await.unwrap());
        assert!(!verifier.find_order("other", "ORDER1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_order_with_small_pages() {
        let store = MemoryStore::new().with_page_size(1);
        let container = items(&store).await;
        let verifier = Verifier::new(&store, &container, RetryPolicy::single());

        for code in ["A", "B", "C"] {
            verifier.persist(&record(code)).await.unwrap();
        }
        assert!(verifier.find_order("shipcheck", "C").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_order_rides_out_visibility_lag() {
        let store = MemoryStore::new().with_visibility_lag(2);
        let container = items(&store).await;
        let policy = RetryPolicy {
            attempts: 5,
            interval: Duration::from_millis(500),
        };
        let verifier = Verifier::new(&store, &container, policy);

        verifier.persist(&record("LAGGED")).await.unwrap();
        let used = verifier.await_order("shipcheck", "LAGGED").await.unwrap();
        assert_eq!(used, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_order_reports_miss() {
        let store = MemoryStore::new();
        let container = items(&store).await;
        let verifier = Verifier::new(&store, &container, RetryPolicy::default());

        match verifier.await_order("shipcheck", "MISSING").await {
            Err(ProbeError::VerificationMiss {
                order_code,
                attempts,
            }) => {
                assert_eq!(order_code, "MISSING");
                assert_eq!(attempts, 5);
            }
            other => panic!("expected VerificationMiss, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let store = MemoryStore::new().with_visibility_lag(1);
        let container = items(&store).await;
        let verifier = Verifier::new(&store, &container, RetryPolicy::single());

        verifier.persist(&record("ONCE")).await.unwrap();
        let before = store.call_count();
        assert!(verifier.await_order("shipcheck", "ONCE").await.is_err());
        assert_eq!(store.call_count() - before, 1);
    }
}
