use serde_json::Value;

use super::{Query, delete, get_json, post_json, put_json};
use crate::client::ApiClient;
use crate::error::ClientResult;

/// `/api/jobs` endpoints.
pub struct Jobs<'a> {
    client: &'a ApiClient,
}

impl<'a> Jobs<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn list(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/jobs", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn get(&self, id: i64) -> ClientResult<Value> {
        get_json(self.client, &format!("/api/jobs/{id}"), &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn create(&self, job: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/jobs", Some(job)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn update(&self, id: i64, job: Value) -> ClientResult<Value> {
        put_json(self.client, &format!("/api/jobs/{id}"), job).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails.
    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("/api/jobs/{id}")).await
    }

    /// Asks the server to search job boards with the given criteria.
    ///
    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn discover(&self, criteria: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/jobs/discover", Some(criteria)).await
    }
}
