//! In-memory document store.
//!
//! Behaves like a single Cosmos account closely enough for the probe's tests:
//! containers enforce their partition key path on write, ids are unique per
//! partition, and queries page with continuation tokens. Writes can be made
//! to lag behind reads to exercise eventual-consistency handling.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::core::{
    ContainerRef, ContainerSpec, DatabaseRef, DocumentStore, Ensured, Query, QueryPage, StoreKind,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug)]
struct StoredItem {
    partition_key: String,
    document: Value,
    /// Number of queries against the container that still miss this item.
    hidden_for: u32,
}

#[derive(Debug)]
struct ContainerState {
    partition_key_path: String,
    items: Vec<StoredItem>,
}

#[derive(Debug, Default)]
struct MemoryState {
    databases: HashSet<String>,
    containers: HashMap<(String, String), ContainerState>,
    calls: u64,
    visibility_lag: u32,
    page_size: Option<usize>,
}

/// Process-local [`DocumentStore`].
///
/// Cloning shares the underlying state, so a test can hand one clone to the
/// code under test and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every new item invisible to the next `queries` queries against
    /// its container.
    pub fn with_visibility_lag(self, queries: u32) -> Self {
        self.state.lock().visibility_lag = queries;
        self
    }

    /// Caps query pages at `size` documents.
    pub fn with_page_size(self, size: usize) -> Self {
        self.state.lock().page_size = Some(size.max(1));
        self
    }

    /// Number of trait calls made against this store.
    pub fn call_count(&self) -> u64 {
        self.state.lock().calls
    }

    /// Snapshot of every document in a container, visible or not.
    pub fn documents(&self, database_id: &str, container_id: &str) -> Vec<Value> {
        let state = self.state.lock();
        state
            .containers
            .get(&(database_id.to_string(), container_id.to_string()))
            .map(|c| c.items.iter().map(|i| i.document.clone()).collect())
            .unwrap_or_default()
    }

    /// Pre-creates a container with an explicit partition key path.
    pub fn seed_container(&self, database_id: &str, spec: &ContainerSpec) {
        let mut state = self.state.lock();
        state.databases.insert(database_id.to_string());
        state
            .containers
            .entry((database_id.to_string(), spec.id.clone()))
            .or_insert_with(|| ContainerState {
                partition_key_path: spec.partition_key_path.clone(),
                items: Vec::new(),
            });
    }
}

fn container_not_found(database_id: &str, container_id: &str) -> StoreError {
    StoreError::NotFound {
        resource_link: format!("dbs/{database_id}/colls/{container_id}"),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn ensure_database(&self, database_id: &str) -> StoreResult<Ensured<DatabaseRef>> {
        let mut state = self.state.lock();
        state.calls += 1;
        let handle = DatabaseRef::new(database_id);
        if state.databases.insert(database_id.to_string()) {
            Ok(Ensured::created(handle))
        } else {
            Ok(Ensured::existing(handle))
        }
    }

    async fn read_database(&self, database_id: &str) -> StoreResult<DatabaseRef> {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.databases.contains(database_id) {
            Ok(DatabaseRef::new(database_id))
        } else {
            Err(StoreError::NotFound {
                resource_link: format!("dbs/{database_id}"),
            })
        }
    }

    async fn ensure_container(
        &self,
        database: &DatabaseRef,
        spec: &ContainerSpec,
    ) -> StoreResult<Ensured<ContainerRef>> {
        let mut state = self.state.lock();
        state.calls += 1;
        if !state.databases.contains(database.id()) {
            return Err(StoreError::NotFound {
                resource_link: database.resource_link(),
            });
        }

        let key = (database.id().to_string(), spec.id.clone());
        if let Some(existing) = state.containers.get(&key) {
            return Ok(Ensured::existing(ContainerRef::new(
                database.id(),
                &spec.id,
                &existing.partition_key_path,
            )));
        }

        state.containers.insert(
            key,
            ContainerState {
                partition_key_path: spec.partition_key_path.clone(),
                items: Vec::new(),
            },
        );
        Ok(Ensured::created(ContainerRef::new(
            database.id(),
            &spec.id,
            &spec.partition_key_path,
        )))
    }

    async fn read_container(
        &self,
        database: &DatabaseRef,
        container_id: &str,
    ) -> StoreResult<ContainerRef> {
        let mut state = self.state.lock();
        state.calls += 1;
        state
            .containers
            .get(&(database.id().to_string(), container_id.to_string()))
            .map(|c| ContainerRef::new(database.id(), container_id, &c.partition_key_path))
            .ok_or_else(|| container_not_found(database.id(), container_id))
    }

    async fn create_item(
        &self,
        container: &ContainerRef,
        partition_key: &str,
        item: &Value,
    ) -> StoreResult<Value> {
        let mut state = self.state.lock();
        state.calls += 1;
        let lag = state.visibility_lag;
        let resource_link = container.resource_link();

        let target = state
            .containers
            .get_mut(&(
                container.database_id().to_string(),
                container.id().to_string(),
            ))
            .ok_or_else(|| container_not_found(container.database_id(), container.id()))?;

        let id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::BadRequest {
                resource_link: resource_link.clone(),
                message: "document must carry a string id".to_string(),
            })?
            .to_string();

        if item.get(container.partition_key_field()).and_then(Value::as_str) != Some(partition_key) {
            return Err(StoreError::BadRequest {
                resource_link,
                message: format!(
                    "partition key extracted from document does not match '{partition_key}' (path {})",
                    container.partition_key_path()
                ),
            });
        }

        let duplicate = target.items.iter().any(|stored| {
            stored.partition_key == partition_key
                && stored.document.get("id").and_then(Value::as_str) == Some(id.as_str())
        });
        if duplicate {
            return Err(StoreError::Conflict {
                resource_link: format!("{resource_link}/docs/{id}"),
            });
        }

        target.items.push(StoredItem {
            partition_key: partition_key.to_string(),
            document: item.clone(),
            hidden_for: lag,
        });
        Ok(item.clone())
    }

    async fn query_items(
        &self,
        container: &ContainerRef,
        query: &Query,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage> {
        let mut state = self.state.lock();
        state.calls += 1;
        let page_size = query
            .max_item_count()
            .map(|n| n as usize)
            .or(state.page_size)
            .unwrap_or(usize::MAX)
            .max(1);

        let target = state
            .containers
            .get_mut(&(
                container.database_id().to_string(),
                container.id().to_string(),
            ))
            .ok_or_else(|| container_not_found(container.database_id(), container.id()))?;

        let offset = match continuation {
            Some(token) => token.parse::<usize>().map_err(|_| StoreError::BadRequest {
                resource_link: container.resource_link(),
                message: format!("invalid continuation token '{token}'"),
            })?,
            None => 0,
        };

        let matching: Vec<Value> = target
            .items
            .iter()
            .filter(|item| item.hidden_for == 0)
            .filter(|item| {
                query
                    .partition_key()
                    .is_none_or(|pk| item.partition_key == pk)
            })
            .filter(|item| query.matches(&item.document))
            .map(|item| item.document.clone())
            .collect();

        // Each query brings lagging writes one step closer to visibility.
        if continuation.is_none() {
            for item in target.items.iter_mut() {
                item.hidden_for = item.hidden_for.saturating_sub(1);
            }
        }

        let documents: Vec<Value> = matching.iter().skip(offset).take(page_size).cloned().collect();
        let next = offset + documents.len();
        let continuation = (next < matching.len()).then(|| next.to_string());

        Ok(QueryPage {
            documents,
            continuation,
        })
    }
}
