use serde_json::Value;

use super::{Query, delete, get_json, post_json};
use crate::client::ApiClient;
use crate::error::ClientResult;

/// `/api/emails` endpoints.
pub struct Emails<'a> {
    client: &'a ApiClient,
}

impl<'a> Emails<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn list(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/emails", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn inbox(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/emails/inbox", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn sent(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/emails/sent", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn get(&self, id: i64) -> ClientResult<Value> {
        get_json(self.client, &format!("/api/emails/{id}"), &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn send(&self, email: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/emails/send", Some(email)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn reply(&self, id: i64, reply: Value) -> ClientResult<Value> {
        post_json(self.client, &format!("/api/emails/{id}/reply"), Some(reply)).await
    }

    /// Pulls new mail from the connected mailbox.
    ///
    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn sync(&self) -> ClientResult<Value> {
        post_json(self.client, "/api/emails/sync", None).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn stats(&self) -> ClientResult<Value> {
        get_json(self.client, "/api/emails/stats", &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails.
    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("/api/emails/{id}")).await
    }
}
