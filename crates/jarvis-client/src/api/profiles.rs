use serde_json::Value;

use super::{delete, get_json, post_json, put_json};
use crate::client::ApiClient;
use crate::error::ClientResult;

const BASE: &str = "/api/profiles/me";

/// `/api/profiles/me` endpoints for the signed-in user's profile.
pub struct Profiles<'a> {
    client: &'a ApiClient,
}

impl<'a> Profiles<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn get(&self) -> ClientResult<Value> {
        get_json(self.client, BASE, &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn update(&self, profile: Value) -> ClientResult<Value> {
        put_json(self.client, BASE, profile).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn add_skill(&self, skill: Value) -> ClientResult<Value> {
        post_json(self.client, &format!("{BASE}/skills"), Some(skill)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn delete_skill(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("{BASE}/skills/{id}")).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn add_education(&self, education: Value) -> ClientResult<Value> {
        post_json(self.client, &format!("{BASE}/education"), Some(education)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn delete_education(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("{BASE}/education/{id}")).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn add_experience(&self, experience: Value) -> ClientResult<Value> {
        post_json(self.client, &format!("{BASE}/experience"), Some(experience)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn delete_experience(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("{BASE}/experience/{id}")).await
    }
}
