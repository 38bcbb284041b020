use serde_json::Value;

use super::{Query, get_json, post_json, put_json};
use crate::client::ApiClient;
use crate::error::ClientResult;

/// `/api/referrals` endpoints.
pub struct Referrals<'a> {
    client: &'a ApiClient,
}

impl<'a> Referrals<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn list_connections(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/referrals/connections", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn search_connections(&self, search: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/referrals/connections/search", Some(search)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn sync_connections(&self) -> ClientResult<Value> {
        post_json(self.client, "/api/referrals/connections/sync", None).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn list(&self, query: Query<'_>) -> ClientResult<Value> {
        get_json(self.client, "/api/referrals", query).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn create(&self, referral: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/referrals", Some(referral)).await
    }

    /// Drafts the outreach message for a referral request.
    ///
    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn generate_message(&self, id: i64, options: Value) -> ClientResult<Value> {
        post_json(self.client, &format!("/api/referrals/{id}/draft"), Some(options)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn send(&self, id: i64, message: Value) -> ClientResult<Value> {
        post_json(self.client, &format!("/api/referrals/{id}/send"), Some(message)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn update(&self, id: i64, referral: Value) -> ClientResult<Value> {
        put_json(self.client, &format!("/api/referrals/{id}"), referral).await
    }
}
