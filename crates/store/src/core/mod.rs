//! Core document store traits and abstractions.
//!
//! - [`DocumentStore`] - provisioning, writes and queries against a container
//! - [`Query`] - parameterized equality filters, rendered to SQL for Cosmos
//!   and evaluated directly by the in-memory store
//! - [`find_first`] - page through a query until the first match

mod query;
mod store;

pub use query::{Filter, Query, QueryParameter, find_first};
pub use store::{
    ContainerRef, ContainerSpec, DatabaseRef, DocumentStore, Ensured, QueryPage, StoreKind,
};
