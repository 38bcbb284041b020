use serde_json::Value;

use super::{Query, delete, get_json, post_json, put_json};
use crate::client::ApiClient;
use crate::error::ClientResult;

/// `/api/applications` endpoints.
pub struct Applications<'a> {
    client: &'a ApiClient,
}

impl<'a> Applications<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn list(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/applications", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn get(&self, id: i64) -> ClientResult<Value> {
        get_json(self.client, &format!("/api/applications/{id}"), &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn create(&self, application: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/applications", Some(application)).await
    }

    /// Submits an application on the user's behalf.
    ///
    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn apply(&self, request: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/applications/apply", Some(request)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn update(&self, id: i64, application: Value) -> ClientResult<Value> {
        put_json(self.client, &format!("/api/applications/{id}"), application).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn stats(&self) -> ClientResult<Value> {
        get_json(self.client, "/api/applications/stats", &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails.
    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("/api/applications/{id}")).await
    }
}
