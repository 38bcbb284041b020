use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::client::{ApiClient, RequestOptions};
use crate::error::ClientResult;
use crate::session::{Persistence, Session};

/// Account as returned by `/api/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Response of login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub user: Option<User>,
    pub tokens: AuthTokens,
}

/// `/api/auth` endpoints.
pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Creates an account and stores its session durably.
    ///
    /// # Errors
    /// Returns the request error, or a storage error if the session cannot be saved.
    pub async fn register(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        self.authenticate("/api/auth/register", email, password, Persistence::Durable)
            .await
    }

    /// Logs in and stores the session durably when `remember` is set,
    /// otherwise for this process only.
    ///
    /// # Errors
    /// Returns the request error, or a storage error if the session cannot be saved.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> ClientResult<AuthResponse> {
        self.authenticate(
            "/api/auth/login",
            email,
            password,
            Persistence::from_remember(remember),
        )
        .await
    }

    /// # Errors
    /// Returns the request error, including `SessionExpired` when not logged in
    /// and the server rejects the request.
    pub async fn me(&self) -> ClientResult<User> {
        self.client
            .get("/api/auth/me", RequestOptions::new())
            .await?
            .json()
    }

    /// Forgets the stored session. There is no server-side logout endpoint.
    ///
    /// # Errors
    /// Returns a storage error if the credential store cannot be written.
    pub fn logout(&self) -> ClientResult<()> {
        self.client.clear_session()
    }

    async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
        persistence: Persistence,
    ) -> ClientResult<AuthResponse> {
        // Credentials go out without a bearer token: a 401 here means bad
        // credentials, not an expired session.
        let response: AuthResponse = self
            .client
            .request(
                reqwest::Method::POST,
                path,
                Some(json!({ "email": email, "password": password })),
                RequestOptions::new().anonymous(),
            )
            .await?
            .json()?;

        self.client.persist_session(&Session::new(
            response.tokens.access_token.clone(),
            response.tokens.refresh_token.clone(),
            persistence,
        ))?;
        info!(?persistence, "Signed in");
        Ok(response)
    }
}
