//! The transaction record written after a successful POST.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::fixture::FixtureDocument;
use crate::ids::RunIdentifiers;

/// One record per run, stored in the primary container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Fresh UUID v4.
    pub id: Uuid,
    /// Partition key value.
    pub partition_key: String,
    /// Correlation id sent with the order.
    pub correlation_id: String,
    /// Order code sent with the order.
    pub order_code: String,
    /// The mutated fixture, verbatim.
    pub content: Value,
}

impl TransactionRecord {
    /// Builds the record for a run.
    pub fn new(
        partition_key: impl Into<String>,
        ids: &RunIdentifiers,
        fixture: &FixtureDocument,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            partition_key: partition_key.into(),
            correlation_id: ids.correlation_id.clone(),
            order_code: ids.order_code.clone(),
            content: fixture.as_value().clone(),
        }
    }
}
