//! Azure Cosmos DB backend over the SQL REST API.
//!
//! Requests are signed with the account master key (`type=master&ver=1.0`)
//! and sent with `reqwest`; no vendor SDK is involved.

mod auth;
mod client;
mod config;

pub use client::CosmosStore;
pub use config::CosmosConfig;
