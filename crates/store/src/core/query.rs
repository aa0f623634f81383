//! Parameterized equality queries.
//!
//! A [`Query`] is a conjunction of `field = value` filters over top-level
//! document fields. Cosmos receives it as parameterized SQL:
//!
//! ```
//! use shipcheck_store::core::Query;
//!
//! let query = Query::new()
//!     .with_eq("partitionKey", "smoke")
//!     .with_eq("orderCode", "ABC123");
//!
//! assert_eq!(
//!     query.to_sql(),
//!     "SELECT * FROM c WHERE c.partitionKey = @partitionKey AND c.orderCode = @orderCode"
//! );
//! ```

use serde::Serialize;
use serde_json::Value;

use super::store::{ContainerRef, DocumentStore};
use crate::error::StoreResult;

/// A single `field = value` filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Top-level document field.
    pub field: String,
    /// Value the field must equal.
    pub value: Value,
}

/// A named SQL parameter, serialized the way the Cosmos query API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    /// Parameter name including the leading `@`.
    pub name: String,
    /// Bound value.
    pub value: Value,
}

/// A conjunction of equality filters with optional partition scoping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    partition_key: Option<String>,
    max_item_count: Option<u32>,
}

impl Query {
    /// Creates a query that matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `field = value` filter.
    pub fn with_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Restricts the query to a single partition key value.
    ///
    /// Without this the query fans out across partitions.
    pub fn within_partition(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Caps the number of documents returned per page.
    pub fn with_max_item_count(mut self, count: u32) -> Self {
        self.max_item_count = Some(count);
        self
    }

    /// Returns the partition scope, if any.
    pub fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    /// Returns the per-page cap, if any.
    pub fn max_item_count(&self) -> Option<u32> {
        self.max_item_count
    }

    /// Renders the query as Cosmos SQL.
    pub fn to_sql(&self) -> String {
        if self.filters.is_empty() {
            return "SELECT * FROM c".to_string();
        }

        let clauses: Vec<String> = self
            .filters
            .iter()
            .zip(self.parameter_names())
            .map(|(filter, name)| format!("{} = {}", field_accessor(&filter.field), name))
            .collect();

        format!("SELECT * FROM c WHERE {}", clauses.join(" AND "))
    }

    /// Returns the bound parameters in filter order.
    pub fn parameters(&self) -> Vec<QueryParameter> {
        self.filters
            .iter()
            .zip(self.parameter_names())
            .map(|(filter, name)| QueryParameter {
                name,
                value: filter.value.clone(),
            })
            .collect()
    }

    /// Evaluates the filters against a document.
    pub fn matches(&self, document: &Value) -> bool {
        self.filters
            .iter()
            .all(|filter| document.get(&filter.field) == Some(&filter.value))
    }

    fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.filters.len());
        for (index, filter) in self.filters.iter().enumerate() {
            let base: String = filter
                .field
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            let base = if base.is_empty() {
                format!("@p{index}")
            } else {
                format!("@{base}")
            };
            let name = if names.contains(&base) {
                format!("{base}_{index}")
            } else {
                base
            };
            names.push(name);
        }
        names
    }
}

fn field_accessor(field: &str) -> String {
    let is_identifier = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if is_identifier {
        format!("c.{field}")
    } else {
        format!("c[\"{}\"]", field.replace('"', "\\\""))
    }
}

/// Pages through `query` and returns the first matching document.
///
/// Stops as soon as a page yields a document; empty pages with a
/// continuation token are followed.
pub async fn find_first<S>(
    store: &S,
    container: &ContainerRef,
    query: &Query,
) -> StoreResult<Option<Value>>
where
    S: DocumentStore + ?Sized,
{
    let mut continuation: Option<String> = None;
    loop {
        let page = store
            .query_items(container, query, continuation.as_deref())
            .await?;

        if let Some(document) = page.documents.into_iter().next() {
            return Ok(Some(document));
        }

        match page.continuation {
            Some(token) => continuation = Some(token),
            None => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_query_selects_everything() {
        let query = Query::new();
        assert_eq!(query.to_sql(), "SELECT * FROM c");
        assert!(query.parameters().is_empty());
        assert!(query.matches(&json!({"id": "1"})));
    }

    #[test]
    fn test_parameters_follow_filter_order() {
        let query = Query::new()
            .with_eq("partitionKey", "pk")
            .with_eq("orderCode", "ORDER1");

        let params = query.parameters();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "@partitionKey");
        assert_eq!(params[0].value, json!("pk"));
        assert_eq!(params[1].name, "@orderCode");
        assert_eq!(params[1].value, json!("ORDER1"));
    }

    #[test]
    fn test_duplicate_fields_get_distinct_parameters() {
        let query = Query::new().with_eq("code", "a").with_eq("code", "b");
        assert_eq!(
            query.to_sql(),
            "SELECT * FROM c WHERE c.code = @code AND c.code = @code_1"
        );
    }

    #[test]
    fn test_non_identifier_field_uses_bracket_accessor() {
        let query = Query::new().with_eq("order-code", "x");
        assert_eq!(
            query.to_sql(),
            "SELECT * FROM c WHERE c[\"order-code\"] = @ordercode"
        );
    }

    #[test]
    fn test_matches_requires_every_filter() {
        let query = Query::new()
            .with_eq("partitionKey", "pk")
            .with_eq("orderCode", "ORDER1");

        assert!(query.matches(&json!({"partitionKey": "pk", "orderCode": "ORDER1"})));
        assert!(!query.matches(&json!({"partitionKey": "pk", "orderCode": "ORDER2"})));
        assert!(!query.matches(&json!({"PartitionKey": "pk", "orderCode": "ORDER1"})));
    }

    #[test]
    fn test_partition_scope_and_page_cap() {
        let query = Query::new().within_partition("pk").with_max_item_count(10);
        assert_eq!(query.partition_key(), Some("pk"));
        assert_eq!(query.max_item_count(), Some(10));
    }
}
