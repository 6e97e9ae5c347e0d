// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Remote document store contract and implementations
//!
//! The remote side is an opaque key-value document service. Anything that
//! satisfies [`RemoteDocumentStore`] can back the sync adapter:
//!
//! - [`HttpDocumentStore`]: JSON-over-HTTPS REST service
//! - [`MemoryDocumentStore`]: in-process store with an offline switch

use crate::config::RemoteConfig;
use crate::errors::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// A stored document and its key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub id: String,
    pub data: Value,
}

/// Equality filter plus ordering
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub field: String,
    pub equals: Value,
    pub order_by: String,
    pub descending: bool,
}

impl DocumentQuery {
    /// `field == value`, newest `createdAt` first
    pub fn owned_by(field: &str, owner: &str, order_by: &str) -> Self {
        Self {
            field: field.to_string(),
            equals: Value::String(owner.to_string()),
            order_by: order_by.to_string(),
            descending: true,
        }
    }

    fn matches(&self, document: &Value) -> bool {
        document.get(&self.field) == Some(&self.equals)
    }
}

#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Full overwrite
    async fn set_document(&self, collection: &str, id: &str, document: Value) -> SyncResult<()>;

    async fn get_document(&self, collection: &str, id: &str) -> SyncResult<Option<Value>>;

    async fn query_documents(&self, collection: &str, query: &DocumentQuery) -> SyncResult<Vec<RemoteDocument>>;

    async fn delete_document(&self, collection: &str, id: &str) -> SyncResult<()>;

    /// Append with a server-assigned id
    async fn create_document(&self, collection: &str, document: Value) -> SyncResult<String>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// REST document service
///
/// Routes:
/// - `PUT    {base}/collections/{collection}/documents/{id}`
/// - `GET    {base}/collections/{collection}/documents/{id}`
/// - `GET    {base}/collections/{collection}/documents?field=..&equals=..&orderBy=..&direction=..`
/// - `DELETE {base}/collections/{collection}/documents/{id}`
/// - `POST   {base}/collections/{collection}/documents`
pub struct HttpDocumentStore {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct CreatedDocument {
    id: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> SyncResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| SyncError::Network(format!("invalid remote base url {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            access_token: None,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> SyncResult<Self> {
        let store = Self::new(&config.base_url)?;
        Ok(match &config.access_token {
            Some(token) => store.with_access_token(token.clone()),
            None => store,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn documents_url(&self, collection: &str) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Network("remote base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("collections")
            .extend(collection.split('/'))
            .push("documents");
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> SyncResult<Url> {
        let mut url = self.documents_url(collection)?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Network("remote base url cannot carry a path".to_string()))?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Turn a non-success response into [`SyncError::Remote`]
async fn check_status(response: reqwest::Response) -> SyncResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SyncError::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteDocumentStore for HttpDocumentStore {
    async fn set_document(&self, collection: &str, id: &str, document: Value) -> SyncResult<()> {
        let url = self.document_url(collection, id)?;
        debug!(remote.collection = %collection, remote.id = %id, "PUT document");
        let response = self.request(reqwest::Method::PUT, url).json(&document).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> SyncResult<Option<Value>> {
        let url = self.document_url(collection, id)?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn query_documents(&self, collection: &str, query: &DocumentQuery) -> SyncResult<Vec<RemoteDocument>> {
        let mut url = self.documents_url(collection)?;
        let equals = match &query.equals {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        url.query_pairs_mut()
            .append_pair("field", &query.field)
            .append_pair("equals", &equals)
            .append_pair("orderBy", &query.order_by)
            .append_pair("direction", if query.descending { "desc" } else { "asc" });

        let response = self.request(reqwest::Method::GET, url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> SyncResult<()> {
        let url = self.document_url(collection, id)?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        // already gone counts as deleted
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    async fn create_document(&self, collection: &str, document: Value) -> SyncResult<String> {
        let url = self.documents_url(collection)?;
        let response = self.request(reqwest::Method::POST, url).json(&document).send().await?;
        let created: CreatedDocument = check_status(response).await?.json().await?;
        Ok(created.id)
    }
}

// ============================================================================
// In-process implementation
// ============================================================================

/// In-memory document store with an offline switch and a request counter
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    offline: AtomicBool,
    requests: AtomicUsize,
    next_id: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`SyncError::Network`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls received, failed ones included
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Documents of a collection, bypassing the offline switch
    pub async fn snapshot(&self, collection: &str) -> Vec<RemoteDocument> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| RemoteDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Seed a document, bypassing the offline switch
    pub async fn insert(&self, collection: &str, id: &str, document: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    fn enter(&self) -> SyncResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Network("remote store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryDocumentStore {
    async fn set_document(&self, collection: &str, id: &str, document: Value) -> SyncResult<()> {
        self.enter()?;
        self.insert(collection, id, document).await;
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> SyncResult<Option<Value>> {
        self.enter()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn query_documents(&self, collection: &str, query: &DocumentQuery) -> SyncResult<Vec<RemoteDocument>> {
        self.enter()?;
        let mut found: Vec<RemoteDocument> = self
            .snapshot(collection)
            .await
            .into_iter()
            .filter(|doc| query.matches(&doc.data))
            .collect();

        found.sort_by(|a, b| {
            let left = a.data.get(&query.order_by).and_then(Value::as_str).unwrap_or_default();
            let right = b.data.get(&query.order_by).and_then(Value::as_str).unwrap_or_default();
            if query.descending {
                right.cmp(left)
            } else {
                left.cmp(right)
            }
        });
        Ok(found)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> SyncResult<()> {
        self.enter()?;
        if let Some(docs) = self.collections.write().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn create_document(&self, collection: &str, document: Value) -> SyncResult<String> {
        self.enter()?;
        let id = format!("doc_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.insert(collection, &id, document).await;
        Ok(id)
    }
}
