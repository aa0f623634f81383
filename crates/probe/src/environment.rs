//! Database and container provisioning.

use shipcheck_store::{ContainerRef, ContainerSpec, DatabaseRef, DocumentStore};
use tracing::{info, warn};

use crate::error::ProbeResult;

/// Database and containers a run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSpec {
    /// Database id.
    pub database_id: String,
    /// Container the transaction record is written to and queried from.
    pub primary: ContainerSpec,
    /// Cross-reference container; provisioned and checked but not written.
    pub xref: ContainerSpec,
}

/// Handles to provisioned resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// The database.
    pub database: DatabaseRef,
    /// The primary container.
    pub primary: ContainerRef,
    /// The cross-reference container.
    pub xref: ContainerRef,
}

/// Creates the database and both containers if they do not exist yet.
///
/// An existing container keeps its partition key path; when it differs from
/// the requested one a warning is logged and the existing path is used.
pub async fn provision<S>(store: &S, spec: &EnvironmentSpec) -> ProbeResult<Environment>
where
    S: DocumentStore + ?Sized,
{
    let database = store.ensure_database(&spec.database_id).await?;
    info!(
        database = database.handle.id(),
        created = database.created,
        "database ready"
    );
    let database = database.handle;

    let primary = ensure_container(store, &database, &spec.primary).await?;
    let xref = ensure_container(store, &database, &spec.xref).await?;

    info!(
        backend = %store.kind(),
        database = database.id(),
        primary = primary.id(),
        xref = xref.id(),
        "connected to document store; containers created or verified"
    );

    Ok(Environment {
        database,
        primary,
        xref,
    })
}

async fn ensure_container<S>(
    store: &S,
    database: &DatabaseRef,
    spec: &ContainerSpec,
) -> ProbeResult<ContainerRef>
where
    S: DocumentStore + ?Sized,
{
    let ensured = store.ensure_container(database, spec).await?;
    let container = ensured.handle;
    if container.partition_key_path() != spec.partition_key_path {
        warn!(
            container = container.id(),
            requested = %spec.partition_key_path,
            actual = container.partition_key_path(),
            "existing container uses a different partition key path"
        );
    }
    info!(
        container = container.id(),
        partition_key_path = container.partition_key_path(),
        created = ensured.created,
        "container ready"
    );
    Ok(container)
}

/// Re-reads the database and both containers to confirm they are reachable.
pub async fn check<S>(store: &S, environment: &Environment) -> ProbeResult<()>
where
    S: DocumentStore + ?Sized,
{
    let database = store.read_database(environment.database.id()).await?;
    store.read_container(&database, environment.primary.id()).await?;
    store.read_container(&database, environment.xref.id()).await?;
    info!(database = database.id(), "document store connection verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipcheck_store::backends::memory::MemoryStore;

    fn spec() -> EnvironmentSpec {
        EnvironmentSpec {
            database_id: "Shipment".to_string(),
            primary: ContainerSpec::new("Items", "/partitionKey"),
            xref: ContainerSpec::new("ShipmentXref", "/PartitionKey"),
        }
    }

    #[tokio::test]
    async fn test_provision_creates_everything() {
        let store = MemoryStore::new();
        let env = provision(&store, &spec()).await.unwrap();

        assert_eq!(env.database.id(), "Shipment");
        assert_eq!(env.primary.partition_key_path(), "/partitionKey");
        assert_eq!(env.xref.partition_key_path(), "/PartitionKey");
        check(&store, &env).await.unwrap();
    }

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let store = MemoryStore::new();
        let first = provision(&store, &spec()).await.unwrap();
        let second = provision(&store, &spec()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_existing_partition_path_wins() {
        let store = MemoryStore::new();
        store.seed_container("Shipment", &ContainerSpec::new("Items", "/PartitionKey"));

        let env = provision(&store, &spec()).await.unwrap();
        assert_eq!(env.primary.partition_key_path(), "/PartitionKey");
    }

    #[tokio::test]
    async fn test_check_fails_for_missing_container() {
        let store = MemoryStore::new();
        let env = Environment {
            database: DatabaseRef::new("Shipment"),
            primary: ContainerRef::new("Shipment", "Items", "/partitionKey"),
            xref: ContainerRef::new("Shipment", "ShipmentXref", "/PartitionKey"),
        };
        store.ensure_database("Shipment").await.unwrap();

        let err = check(&store, &env).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::ProbeError::Store(ref e) if e.is_not_found()
        ));
    }
}
