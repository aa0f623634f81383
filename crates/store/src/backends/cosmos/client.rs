use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use super::auth::{MasterKey, ResourceType, http_date};
use super::config::CosmosConfig;
use crate::core::{
    ContainerRef, ContainerSpec, DatabaseRef, DocumentStore, Ensured, Query, QueryPage, StoreKind,
};
use crate::error::{StoreError, StoreResult};

const BACKEND_NAME: &str = "cosmos";

const HEADER_DATE: &str = "x-ms-date";
const HEADER_VERSION: &str = "x-ms-version";
const HEADER_PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";
const HEADER_IS_QUERY: &str = "x-ms-documentdb-isquery";
const HEADER_CROSS_PARTITION: &str = "x-ms-documentdb-query-enablecrosspartition";
const HEADER_MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
const HEADER_CONTINUATION: &str = "x-ms-continuation";
const HEADER_RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";
const QUERY_CONTENT_TYPE: &str = "application/query+json";

#[derive(Debug, Deserialize)]
struct ContainerResource {
    id: String,
    #[serde(rename = "partitionKey")]
    partition_key: Option<PartitionKeyDefinition>,
}

#[derive(Debug, Deserialize)]
struct PartitionKeyDefinition {
    #[serde(default)]
    paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

/// [`DocumentStore`] backed by a Cosmos DB account.
#[derive(Debug)]
pub struct CosmosStore {
    http: reqwest::Client,
    base_url: Url,
    key: MasterKey,
    config: CosmosConfig,
}

impl CosmosStore {
    /// Creates a client from configuration.
    ///
    /// No request is sent; connectivity is first exercised by
    /// [`DocumentStore::ensure_database`].
    pub fn new(config: CosmosConfig) -> StoreResult<Self> {
        config.validate()?;

        let mut base_url = Url::parse(config.endpoint.trim())
            .map_err(|e| StoreError::invalid_config(format!("invalid endpoint: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let key = MasterKey::from_base64(&config.master_key)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        info!(endpoint = %base_url, api_version = %config.api_version, "Cosmos client configured");

        Ok(Self {
            http,
            base_url,
            key,
            config,
        })
    }

    /// Returns backend configuration.
    pub fn config(&self) -> &CosmosConfig {
        &self.config
    }

    /// Builds a signed request.
    ///
    /// `resource_link` is the signed resource (the parent for create/list
    /// calls), `path` the URL path relative to the endpoint.
    fn request(
        &self,
        method: Method,
        resource_type: ResourceType,
        resource_link: &str,
        path: &str,
    ) -> StoreResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| StoreError::Internal {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("invalid request path '{path}'"),
                source: Some(Box::new(e)),
            })?;

        let date = http_date(Utc::now());
        let authorization =
            self.key
                .authorization(method.as_str(), resource_type, resource_link, &date);

        Ok(self
            .http
            .request(method, url)
            .header("authorization", authorization)
            .header(HEADER_DATE, date)
            .header(HEADER_VERSION, &self.config.api_version))
    }

    async fn send(&self, request: RequestBuilder, resource_link: &str) -> StoreResult<Response> {
        let response = request.send().await.map_err(map_transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let retry_after_ms = response
            .headers()
            .get(HEADER_RETRY_AFTER_MS)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, resource_link, &body, retry_after_ms))
    }

    async fn get_container(&self, database_id: &str, container_id: &str) -> StoreResult<ContainerRef> {
        let link = format!("dbs/{database_id}/colls/{container_id}");
        let request = self.request(Method::GET, ResourceType::Containers, &link, &link)?;
        let resource: ContainerResource = self.send(request, &link).await?.json().await.map_err(
            |e| StoreError::Serialization {
                message: format!("invalid container resource: {e}"),
            },
        )?;

        let path = resource
            .partition_key
            .and_then(|pk| pk.paths.into_iter().next())
            .unwrap_or_default();
        Ok(ContainerRef::new(database_id, resource.id, path))
    }
}

#[async_trait]
impl DocumentStore for CosmosStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Cosmos
    }

    async fn ensure_database(&self, database_id: &str) -> StoreResult<Ensured<DatabaseRef>> {
        let request = self
            .request(Method::POST, ResourceType::Databases, "", "dbs")?
            .json(&json!({ "id": database_id }));

        match self.send(request, &format!("dbs/{database_id}")).await {
            Ok(_) => {
                debug!(database = %database_id, "Database created");
                Ok(Ensured::created(DatabaseRef::new(database_id)))
            }
            Err(e) if e.is_conflict() => Ok(Ensured::existing(DatabaseRef::new(database_id))),
            Err(e) => Err(e),
        }
    }

    async fn read_database(&self, database_id: &str) -> StoreResult<DatabaseRef> {
        let link = format!("dbs/{database_id}");
        let request = self.request(Method::GET, ResourceType::Databases, &link, &link)?;
        self.send(request, &link).await?;
        Ok(DatabaseRef::new(database_id))
    }

    async fn ensure_container(
        &self,
        database: &DatabaseRef,
        spec: &ContainerSpec,
    ) -> StoreResult<Ensured<ContainerRef>> {
        let parent = database.resource_link();
        let request = self
            .request(
                Method::POST,
                ResourceType::Containers,
                &parent,
                &format!("{parent}/colls"),
            )?
            .json(&json!({
                "id": spec.id,
                "partitionKey": { "paths": [spec.partition_key_path], "kind": "Hash" },
            }));

        let link = format!("{parent}/colls/{}", spec.id);
        match self.send(request, &link).await {
            Ok(_) => {
                debug!(container = %spec.id, partition_key_path = %spec.partition_key_path, "Container created");
                Ok(Ensured::created(ContainerRef::new(
                    database.id(),
                    &spec.id,
                    &spec.partition_key_path,
                )))
            }
            Err(e) if e.is_conflict() => {
                let existing = self.get_container(database.id(), &spec.id).await?;
                Ok(Ensured::existing(existing))
            }
            Err(e) => Err(e),
        }
    }

    async fn read_container(
        &self,
        database: &DatabaseRef,
        container_id: &str,
    ) -> StoreResult<ContainerRef> {
        self.get_container(database.id(), container_id).await
    }

    async fn create_item(
        &self,
        container: &ContainerRef,
        partition_key: &str,
        item: &Value,
    ) -> StoreResult<Value> {
        let link = container.resource_link();
        let request = self
            .request(
                Method::POST,
                ResourceType::Documents,
                &link,
                &format!("{link}/docs"),
            )?
            .header(HEADER_PARTITION_KEY, serde_json::to_string(&[partition_key])?)
            .json(item);

        let response = self.send(request, &link).await?;
        response.json().await.map_err(|e| StoreError::Serialization {
            message: format!("invalid document response: {e}"),
        })
    }

    async fn query_items(
        &self,
        container: &ContainerRef,
        query: &Query,
        continuation: Option<&str>,
    ) -> StoreResult<QueryPage> {
        let link = container.resource_link();
        let body = serde_json::to_vec(&json!({
            "query": query.to_sql(),
            "parameters": query.parameters(),
        }))?;

        let max_items = query.max_item_count().unwrap_or(self.config.max_item_count);
        let mut request = self
            .request(
                Method::POST,
                ResourceType::Documents,
                &link,
                &format!("{link}/docs"),
            )?
            .header(CONTENT_TYPE, HeaderValue::from_static(QUERY_CONTENT_TYPE))
            .header(HEADER_IS_QUERY, "True")
            .header(HEADER_MAX_ITEM_COUNT, max_items.to_string())
            .body(body);

        request = match query.partition_key() {
            Some(pk) => request.header(HEADER_PARTITION_KEY, serde_json::to_string(&[pk])?),
            None => request.header(HEADER_CROSS_PARTITION, "True"),
        };
        if let Some(token) = continuation {
            request = request.header(HEADER_CONTINUATION, token);
        }

        let response = self.send(request, &link).await?;
        let next = response
            .headers()
            .get(HEADER_CONTINUATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let parsed: QueryResponse = response.json().await.map_err(|e| StoreError::Serialization {
            message: format!("invalid query response: {e}"),
        })?;

        Ok(QueryPage {
            documents: parsed.documents,
            continuation: next,
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Unavailable {
            backend_name: BACKEND_NAME.to_string(),
            message: format!("request timed out: {err}"),
        }
    } else if err.is_connect() {
        StoreError::ConnectionFailed {
            backend_name: BACKEND_NAME.to_string(),
            message: err.to_string(),
        }
    } else {
        StoreError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message: "request failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

fn map_status(
    status: StatusCode,
    resource_link: &str,
    body: &str,
    retry_after_ms: Option<u64>,
) -> StoreError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound {
            resource_link: resource_link.to_string(),
        },
        StatusCode::CONFLICT => StoreError::Conflict {
            resource_link: resource_link.to_string(),
        },
        StatusCode::BAD_REQUEST => StoreError::BadRequest {
            resource_link: resource_link.to_string(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => StoreError::Throttled {
            backend_name: BACKEND_NAME.to_string(),
            retry_after_ms,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized {
            backend_name: BACKEND_NAME.to_string(),
            message,
        },
        s if s.is_server_error() => StoreError::Unavailable {
            backend_name: BACKEND_NAME.to_string(),
            message,
        },
        _ => StoreError::Internal {
            backend_name: BACKEND_NAME.to_string(),
            message,
            source: None,
        },
    }
}
