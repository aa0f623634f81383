//! Document store backends.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Cosmos DB | `cosmos` (default) | Azure Cosmos DB SQL REST API with master-key auth |
//! | Memory | always | Process-local store for tests and dry runs |

#[cfg(feature = "cosmos")]
pub mod cosmos;

pub mod memory;
