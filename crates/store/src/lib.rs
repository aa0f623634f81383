//! shipcheck document store layer
//!
//! This crate provides the storage side of the shipcheck order probe: a small
//! [`DocumentStore`](core::DocumentStore) abstraction over partitioned JSON
//! document containers, with two backends.
//!
//! # Backends
//!
//! - `cosmos` (default feature) - Azure Cosmos DB via the SQL REST API,
//!   signed with the account master key
//! - memory - process-local store with optional write-visibility lag
//!
//! # Architecture
//!
//! - [`error`] - Error types for all operations
//! - [`core`] - The store trait, container handles and queries
//! - [`backends`] - Backend implementations
//!
//! # Quick Start
//!
//! ```
//! use shipcheck_store::backends::memory::MemoryStore;
//! use shipcheck_store::core::{ContainerSpec, DocumentStore, Query, find_first};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let store = MemoryStore::new();
//! let db = store.ensure_database("Shipment").await?.handle;
//! let items = store
//!     .ensure_container(&db, &ContainerSpec::new("Items", "/partitionKey"))
//!     .await?
//!     .handle;
//!
//! store
//!     .create_item(&items, "smoke", &json!({"id": "1", "partitionKey": "smoke", "orderCode": "A1"}))
//!     .await?;
//!
//! let query = Query::new().with_eq("orderCode", "A1");
//! assert!(find_first(&store, &items, &query).await?.is_some());
//! # Ok::<(), shipcheck_store::error::StoreError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;

pub use core::{ContainerRef, ContainerSpec, DatabaseRef, DocumentStore, Query};
pub use error::{StoreError, StoreResult};
