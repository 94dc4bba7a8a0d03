//! Thin per-collection services over the remote API.

use serde_json::Value;

use crate::api::{ApiClient, ApiError, ApiResponse, RequestOptions, Transport, UploadFile};
use crate::auth::SessionPersistence;
use crate::models::{Collection, HttpMethod};

pub const DOCUMENT_UPLOAD_ENDPOINT: &str = "/documents/upload";

/// CRUD calls for one collection. Online responses are mirrored locally.
pub struct ResourceService<T, S> {
    client: ApiClient<T, S>,
    collection: Collection,
}

impl<T, S: Clone> Clone for ResourceService<T, S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            collection: self.collection,
        }
    }
}

impl<T, S> ResourceService<T, S>
where
    T: Transport,
    S: SessionPersistence,
{
    pub fn new(client: ApiClient<T, S>, collection: Collection) -> Self {
        Self { client, collection }
    }

    pub const fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn list(&self) -> Result<ApiResponse, ApiError> {
        self.call(HttpMethod::Get, self.collection.endpoint().to_string(), None)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<ApiResponse, ApiError> {
        self.call(HttpMethod::Get, self.record_endpoint(id), None)
            .await
    }

    pub async fn create(&self, data: Value) -> Result<ApiResponse, ApiError> {
        self.call(
            HttpMethod::Post,
            self.collection.endpoint().to_string(),
            Some(data),
        )
        .await
    }

    pub async fn update(&self, id: &str, data: Value) -> Result<ApiResponse, ApiError> {
        self.call(HttpMethod::Put, self.record_endpoint(id), Some(data))
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<ApiResponse, ApiError> {
        self.call(HttpMethod::Delete, self.record_endpoint(id), None)
            .await
    }

    /// Records currently held in the local collection.
    pub async fn local(&self) -> crate::Result<Vec<Value>> {
        self.client.store().get_all(self.collection).await
    }

    fn record_endpoint(&self, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection.endpoint(),
            urlencoding::encode(id.trim())
        )
    }

    async fn call(
        &self,
        method: HttpMethod,
        endpoint: String,
        data: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        let response = self
            .client
            .request(method, &endpoint, data, RequestOptions::default())
            .await?;
        if let ApiResponse::Online(payload) = &response {
            mirror_online(&self.client, method, &endpoint, payload).await;
        }
        Ok(response)
    }
}

async fn mirror_online<T, S>(
    client: &ApiClient<T, S>,
    method: HttpMethod,
    endpoint: &str,
    payload: &Value,
) where
    T: Transport,
    S: SessionPersistence,
{
    if let Err(error) = client.store().mirror(method, endpoint, payload).await {
        tracing::warn!(
            "Failed to mirror {} {} into local records: {}",
            method,
            endpoint,
            error
        );
    }
}

#[derive(Clone)]
pub struct CorrectiveActionService<T, S> {
    resources: ResourceService<T, S>,
}

impl<T, S> CorrectiveActionService<T, S>
where
    T: Transport,
    S: SessionPersistence,
{
    pub fn new(client: ApiClient<T, S>) -> Self {
        Self {
            resources: ResourceService::new(client, Collection::CorrectiveActions),
        }
    }

    pub const fn resources(&self) -> &ResourceService<T, S> {
        &self.resources
    }

    /// Mark an action complete. Queued like any other write when offline.
    pub async fn complete(&self, id: &str) -> Result<ApiResponse, ApiError> {
        let endpoint = format!("{}/complete", self.resources.record_endpoint(id));
        self.resources.call(HttpMethod::Post, endpoint, None).await
    }
}

#[derive(Clone)]
pub struct DocumentService<T, S> {
    resources: ResourceService<T, S>,
}

impl<T, S> DocumentService<T, S>
where
    T: Transport,
    S: SessionPersistence,
{
    pub fn new(client: ApiClient<T, S>) -> Self {
        Self {
            resources: ResourceService::new(client, Collection::Documents),
        }
    }

    pub const fn resources(&self) -> &ResourceService<T, S> {
        &self.resources
    }

    /// Upload a document file. Requires connectivity; never queued.
    pub async fn upload(
        &self,
        file: UploadFile,
        fields: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        let client = &self.resources.client;
        let payload = client
            .upload(DOCUMENT_UPLOAD_ENDPOINT, file, fields)
            .await?;
        mirror_online(client, HttpMethod::Post, DOCUMENT_UPLOAD_ENDPOINT, &payload).await;
        Ok(payload)
    }
}
