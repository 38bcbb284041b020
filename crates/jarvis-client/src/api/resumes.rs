use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::Value;

use super::{delete, get_json, post_json, put_json};
use crate::client::{ApiClient, RequestOptions};
use crate::error::ClientResult;

/// Download format for a rendered resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResumeFormat {
    #[default]
    Pdf,
    Docx,
}

impl ResumeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for ResumeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(format!("Unknown resume format: {other} (expected pdf or docx)")),
        }
    }
}

/// `/api/resumes` endpoints.
pub struct Resumes<'a> {
    client: &'a ApiClient,
}

impl<'a> Resumes<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn list(&self) -> ClientResult<Value> {
        get_json(self.client, "/api/resumes", &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn get(&self, id: i64) -> ClientResult<Value> {
        get_json(self.client, &format!("/api/resumes/{id}"), &[]).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn create(&self, resume: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/resumes", Some(resume)).await
    }

    /// Asks the server to generate a tailored resume.
    ///
    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn generate(&self, request: Value) -> ClientResult<Value> {
        post_json(self.client, "/api/resumes/generate", Some(request)).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn update(&self, id: i64, resume: Value) -> ClientResult<Value> {
        put_json(self.client, &format!("/api/resumes/{id}"), resume).await
    }

    /// Downloads the rendered resume file.
    ///
    /// # Errors
    /// Returns a `ClientError` if the request fails or the server does not return a file.
    pub async fn download(&self, id: i64, format: ResumeFormat) -> ClientResult<Bytes> {
        let options = RequestOptions::new().query("format", format).binary();
        self.client
            .get(&format!("/api/resumes/{id}/download"), options)
            .await?
            .into_bytes()
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails or the response is not JSON.
    pub async fn analyze(&self, id: i64) -> ClientResult<Value> {
        post_json(self.client, &format!("/api/resumes/{id}/analyze"), None).await
    }

    /// # Errors
    /// Returns a `ClientError` if the request fails.
    pub async fn delete(&self, id: i64) -> ClientResult<()> {
        delete(self.client, &format!("/api/resumes/{id}")).await
    }
}
