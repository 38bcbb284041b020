//! Read-only resource commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use jarvis_client::api::ResumeFormat;
use jarvis_client::{ApiClient, RequestOptions};
use serde_json::Value;

fn print_json(value: &Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("format response")?
    );
    Ok(())
}

pub async fn get(client: &ApiClient, path: &str, query: Vec<(String, String)>) -> Result<()> {
    let options = RequestOptions {
        query,
        ..RequestOptions::default()
    };
    let response = client.get(path, options).await?;
    print_json(&response.into_value())
}

pub async fn list_jobs(client: &ApiClient, query: &[(String, String)]) -> Result<()> {
    let pairs: Vec<(&str, &str)> = query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    print_json(&client.jobs().list(&pairs).await?)
}

pub async fn application_stats(client: &ApiClient) -> Result<()> {
    print_json(&client.applications().stats().await?)
}

pub async fn email_stats(client: &ApiClient) -> Result<()> {
    print_json(&client.emails().stats().await?)
}

pub async fn list_resumes(client: &ApiClient) -> Result<()> {
    print_json(&client.resumes().list().await?)
}

pub async fn download_resume(
    client: &ApiClient,
    id: i64,
    format: ResumeFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = client.resumes().download(id, format).await?;
    let output = output.unwrap_or_else(|| PathBuf::from(format!("resume-{id}.{format}")));
    std::fs::write(&output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
