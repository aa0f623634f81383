//! The [`DocumentStore`] trait and the handles it hands out.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query::Query;
use crate::error::StoreResult;

/// Identifies the kind of store behind a [`DocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Azure Cosmos DB through its SQL REST API.
    Cosmos,
    /// Process-local store used for tests and dry runs.
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Cosmos => write!(f, "cosmos"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

/// Desired shape of a container: its id and partition key path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Container id.
    pub id: String,
    /// Partition key path, e.g. `/partitionKey`.
    pub partition_key_path: String,
}

impl ContainerSpec {
    /// Creates a container spec.
    pub fn new(id: impl Into<String>, partition_key_path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            partition_key_path: partition_key_path.into(),
        }
    }
}

/// Handle to a database that is known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRef {
    id: String,
}

impl DatabaseRef {
    /// Creates a handle for the given database id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns the database id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the resource link, `dbs/{id}`.
    pub fn resource_link(&self) -> String {
        format!("dbs/{}", self.id)
    }
}

/// Handle to a container that is known to exist.
///
/// The partition key path is the one the store reports, which may differ
/// from the one that was requested when the container already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    database_id: String,
    id: String,
    partition_key_path: String,
}

impl ContainerRef {
    /// Creates a container handle.
    pub fn new(
        database_id: impl Into<String>,
        id: impl Into<String>,
        partition_key_path: impl Into<String>,
    ) -> Self {
        Self {
            database_id: database_id.into(),
            id: id.into(),
            partition_key_path: partition_key_path.into(),
        }
    }

    /// Returns the owning database id.
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    /// Returns the container id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the partition key path, e.g. `/partitionKey`.
    pub fn partition_key_path(&self) -> &str {
        &self.partition_key_path
    }

    /// Returns the top-level document field addressed by the partition key path.
    pub fn partition_key_field(&self) -> &str {
        self.partition_key_path.trim_start_matches('/')
    }

    /// Returns the resource link, `dbs/{db}/colls/{id}`.
    pub fn resource_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database_id, self.id)
    }
}

/// Result of a create-if-not-exists call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured<T> {
    /// The resource handle.
    pub handle: T,
    /// True when this call created the resource.
    pub created: bool,
}

impl<T> Ensured<T> {
    /// Wraps a freshly created resource.
    pub fn created(handle: T) -> Self {
        Self {
            handle,
            created: true,
        }
    }

    /// Wraps a resource that already existed.
    pub fn existing(handle: T) -> Self {
        Self {
            handle,
            created: false,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// Documents on this page.
    pub documents: Vec<Value>,
    /// Token for the next page, if any.
    pub continuation: Option<String>,
}

/// A partitioned JSON document store.
///
/// Implementations must be safe to share across tasks; every call is a
/// single round trip against the underlying service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the store kind.
    fn kind(&self) -> StoreKind;

    /// Creates the database unless it already exists.
    async fn ensure_database(&self, database_id: &str) -> StoreResult<Ensured<DatabaseRef>>;

    /// Reads an existing database.
    async fn read_database(&self, database_id: &str) -> StoreResult<DatabaseRef>;

    /// Creates the container unless it already exists.
    async fn ensure_container(
        &self,
        database: &DatabaseRef,
        spec: &ContainerSpec,
    ) -> StoreResult<Ensured<ContainerRef>>;

    /// Reads an existing container, including its partition key path.
    async fn read_container(
        &self,
        database: &DatabaseRef,
        container_id: &str,
    ) -> StoreResult<ContainerRef>;

    /// Writes a new document under the given partition key value.
    ///
    /// Returns the document as stored.
    async fn create_item(
        &self,
        container: &ContainerRef,
        partition_key: &str,
        item: &Value,
    ) -> StoreResult<Value>;

    /// Runs one page of a query.
    async fn query_items(
        &self,
        container: &ContainerRef,
        query: &Query,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage>;
}
