//! Typed wrappers over the JARVIS REST resources.
//!
//! Each wrapper borrows the client: `client.jobs().list(&[("status", "open")])`.
//! Payloads are passed through as JSON except for authentication, whose
//! response shape the client depends on.

mod applications;
mod auth;
mod emails;
mod jobs;
mod profiles;
mod referrals;
mod resumes;

pub use applications::Applications;
pub use auth::{Auth, AuthResponse, AuthTokens, User};
pub use emails::Emails;
pub use jobs::Jobs;
pub use profiles::Profiles;
pub use referrals::Referrals;
pub use resumes::{ResumeFormat, Resumes};

use serde_json::Value;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ClientResult;

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    pub fn profiles(&self) -> Profiles<'_> {
        Profiles::new(self)
    }

    pub fn jobs(&self) -> Jobs<'_> {
        Jobs::new(self)
    }

    pub fn resumes(&self) -> Resumes<'_> {
        Resumes::new(self)
    }

    pub fn applications(&self) -> Applications<'_> {
        Applications::new(self)
    }

    pub fn referrals(&self) -> Referrals<'_> {
        Referrals::new(self)
    }

    pub fn emails(&self) -> Emails<'_> {
        Emails::new(self)
    }
}

/// Query parameters as `(name, value)` pairs.
pub type Query<'q> = &'q [(&'q str, &'q str)];

fn query_options(query: Query<'_>) -> RequestOptions {
    query
        .iter()
        .fold(RequestOptions::new(), |options, (key, value)| {
            options.query(*key, value)
        })
}

async fn get_json(client: &ApiClient, path: &str, query: Query<'_>) -> ClientResult<Value> {
    Ok(client.get(path, query_options(query)).await?.into_value())
}

async fn post_json(client: &ApiClient, path: &str, body: Option<Value>) -> ClientResult<Value> {
    Ok(client.post(path, body).await?.into_value())
}

async fn put_json(client: &ApiClient, path: &str, body: Value) -> ClientResult<Value> {
    Ok(client.put(path, body).await?.into_value())
}

async fn delete(client: &ApiClient, path: &str) -> ClientResult<()> {
    client.delete(path).await?;
    Ok(())
}
