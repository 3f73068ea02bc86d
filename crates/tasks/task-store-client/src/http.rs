//! reqwest-backed task store.

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::TaskStore;
use crate::error::{StoreError, StoreResult};
use crate::model::{TaskId, TaskRecord};

/// Collection URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/tasks";

/// Task store backed by a REST collection endpoint.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    http: Client,
    base_url: Url,
}

impl HttpTaskStore {
    /// Start building a store. Defaults to [`DEFAULT_BASE_URL`].
    pub fn builder() -> HttpTaskStoreBuilder {
        HttpTaskStoreBuilder::new()
    }

    /// The collection URL every request is rooted at.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn item_url(&self, id: &TaskId) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&TaskRecord>,
    ) -> StoreResult<Response> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    #[instrument(skip(self), fields(url = %self.base_url))]
    async fn list(&self) -> StoreResult<Vec<TaskRecord>> {
        let response = self.send(Method::GET, self.base_url.clone(), None).await?;
        let records: Vec<TaskRecord> = Self::decode(response).await?;
        debug!("Listed {} tasks", records.len());
        Ok(records)
    }

    #[instrument(skip(self, record), fields(url = %self.base_url, title = %record.title))]
    async fn create(&self, record: TaskRecord) -> StoreResult<TaskRecord> {
        let record = record.without_id();
        let response = self
            .send(Method::POST, self.base_url.clone(), Some(&record))
            .await?;
        let created: TaskRecord = Self::decode(response).await?;
        debug!("Created task {:?}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, record), fields(id = ?record.id))]
    async fn update(&self, record: TaskRecord) -> StoreResult<TaskRecord> {
        let id = record.id.as_ref().ok_or(StoreError::MissingId)?;
        let url = self.item_url(id)?;
        let response = self.send(Method::PUT, url, Some(&record)).await?;
        let updated: TaskRecord = Self::decode(response).await?;
        debug!("Updated task {}", id);
        Ok(updated)
    }

    #[instrument(skip(self, id), fields(id = %id))]
    async fn delete(&self, id: &TaskId) -> StoreResult<()> {
        let url = self.item_url(id)?;
        self.send(Method::DELETE, url, None).await?;
        debug!("Deleted task {}", id);
        Ok(())
    }
}

/// Builder for [`HttpTaskStore`].
pub struct HttpTaskStoreBuilder {
    /// Collection URL, e.g. `http://localhost:3000/api/tasks`
    base_url: String,

    /// Per-request timeout
    timeout: Duration,

    /// Preconfigured client, overrides `timeout`
    client: Option<Client>,
}

impl Default for HttpTaskStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTaskStoreBuilder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            client: None,
        }
    }

    /// Set the collection URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use an existing reqwest client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the store, validating the base URL.
    pub fn build(self) -> StoreResult<HttpTaskStore> {
        let base_url = parse_base_url(&self.base_url)?;

        let http = match self.client {
            Some(client) => client,
            None => Client::builder().timeout(self.timeout).build()?,
        };

        Ok(HttpTaskStore { http, base_url })
    }
}

/// Parse a collection URL, requiring http(s) and dropping a trailing slash.
fn parse_base_url(raw: &str) -> StoreResult<Url> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| StoreError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(StoreError::InvalidUrl(format!(
            "{raw}: expected an http or https URL"
        )));
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    if !trimmed.is_empty() {
        url.set_path(&trimmed);
    }

    Ok(url)
}
