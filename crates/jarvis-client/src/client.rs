//! Authenticated HTTP client.
//!
//! Every request reads the current session at call time and sends its access
//! token as a bearer credential. When the server answers 401 to a request
//! that carried a token, the client exchanges the refresh token for a new
//! pair (`POST /api/auth/refresh`), persists it, and replays the request
//! once. Concurrent 401s share a single refresh: the first caller stores a
//! shared future in `RefreshSlot` and everyone else awaits that same future.
//! If the refresh fails the session is cleared from both scopes and
//! [`SessionEvent::Expired`] is broadcast so the application can send the
//! user back to the login screen.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ClientError, ClientResult, classify_reqwest_error};
use crate::session::{Session, SessionStore, mask_token};

/// Standard User-Agent header for JARVIS API requests.
pub const USER_AGENT: &str = concat!("jarvis/", env!("CARGO_PKG_VERSION"));

/// Path of the token refresh endpoint.
pub const REFRESH_PATH: &str = "/api/auth/refresh";

const EVENT_CAPACITY: usize = 16;

/// How the response body should be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    #[default]
    Json,
    /// Raw bytes (file downloads).
    Binary,
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub mode: ResponseMode,
    /// Send without credentials and skip the refresh flow (login, register).
    pub anonymous: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends every `(key, value)` pair, skipping `None` values.
    #[must_use]
    pub fn query_opt<V: ToString>(mut self, pairs: &[(&str, Option<V>)]) -> Self {
        for (key, value) in pairs {
            if let Some(value) = value {
                self.query.push(((*key).to_string(), value.to_string()));
            }
        }
        self
    }

    #[must_use]
    pub fn binary(mut self) -> Self {
        self.mode = ResponseMode::Binary;
        self
    }

    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// An outbound call, kept whole so it can be replayed after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed JSON; `Value::Null` for an empty body.
    Json(Value),
    Binary(Bytes),
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Deserializes a JSON body into `T`.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the body is binary or does not match `T`.
    pub fn json<T: DeserializeOwned>(self) -> ClientResult<T> {
        match self.body {
            ResponseBody::Json(value) => {
                serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
            }
            ResponseBody::Binary(_) => Err(ClientError::Decode(
                "expected a JSON body, got binary".to_string(),
            )),
        }
    }

    /// Returns the JSON body, or `Value::Null` for a binary response.
    pub fn into_value(self) -> Value {
        match self.body {
            ResponseBody::Json(value) => value,
            ResponseBody::Binary(_) => Value::Null,
        }
    }

    /// Returns the raw bytes of a binary response.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the body was decoded as JSON.
    pub fn into_bytes(self) -> ClientResult<Bytes> {
        match self.body {
            ResponseBody::Binary(bytes) => Ok(bytes),
            ResponseBody::Json(_) => Err(ClientError::Decode(
                "expected a binary body, got JSON".to_string(),
            )),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Session lifecycle notifications for the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new session was stored (login or registration).
    Started,
    /// The token pair was rotated by a refresh.
    Refreshed,
    /// The session could not be refreshed and was cleared; log in again.
    Expired,
    /// The session was cleared on request.
    LoggedOut,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

type RefreshFuture = Shared<BoxFuture<'static, ClientResult<Session>>>;

#[derive(Clone)]
struct InflightRefresh {
    generation: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct RefreshSlot {
    next_generation: u64,
    inflight: Option<InflightRefresh>,
}

struct Inner {
    http: reqwest::Client,
    config: Config,
    sessions: SessionStore,
    refresh: Mutex<RefreshSlot>,
    events: broadcast::Sender<SessionEvent>,
}

/// JARVIS API client. Cheap to clone; clones share the session store and
/// the in-flight refresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.inner.config.api_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client for the configured API using the given session store.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config, sessions: SessionStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                sessions,
                refresh: Mutex::new(RefreshSlot::default()),
                events,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Subscribes to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the session currently in storage.
    ///
    /// # Errors
    /// Returns [`ClientError::Storage`] if the credential store cannot be read.
    pub fn session(&self) -> ClientResult<Option<Session>> {
        self.inner
            .sessions
            .current()
            .map_err(|e| ClientError::storage(&e))
    }

    /// Stores a new session in the scope named by `session.persistence`.
    ///
    /// # Errors
    /// Returns [`ClientError::Storage`] if the credential store cannot be written.
    pub fn persist_session(&self, session: &Session) -> ClientResult<()> {
        self.inner
            .sessions
            .persist(session)
            .map_err(|e| ClientError::storage(&e))?;
        debug!(
            access = %mask_token(&session.access_token),
            persistence = ?session.persistence,
            "Session stored"
        );
        self.inner.notify(SessionEvent::Started);
        Ok(())
    }

    /// Removes the session from both storage scopes. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns [`ClientError::Storage`] if the credential store cannot be written.
    pub fn clear_session(&self) -> ClientResult<()> {
        let removed = self
            .inner
            .sessions
            .clear()
            .map_err(|e| ClientError::storage(&e))?;
        if removed {
            debug!("Session cleared");
            self.inner.notify(SessionEvent::LoggedOut);
        }
        Ok(())
    }

    /// Sends a request, refreshing the session and replaying once on 401.
    ///
    /// # Errors
    /// Returns a [`ClientError`] describing the transport, authentication,
    /// or application failure.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ClientResult<ApiResponse> {
        let mut request = ApiRequest::new(method, path).options(options);
        request.body = body;
        self.execute(&request).await
    }

    /// Like [`ApiClient::request`], for a prepared [`ApiRequest`].
    ///
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        let token = if request.options.anonymous {
            None
        } else {
            self.session()?.map(|s| s.access_token)
        };

        match self.inner.send(request, token.as_deref()).await {
            Err(err) if err.status() == Some(StatusCode::UNAUTHORIZED.as_u16()) => {
                // Without a token there is nothing to refresh.
                let Some(stale) = token else {
                    return Err(err);
                };
                debug!(path = %request.path, "Access token rejected");
                let session = self.refresh_session(&stale).await?;
                self.inner
                    .send(request, Some(&session.access_token))
                    .await
            }
            other => other,
        }
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get(&self, path: &str, options: RequestOptions) -> ClientResult<ApiResponse> {
        self.request(Method::GET, path, None, options).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn post(&self, path: &str, body: Option<Value>) -> ClientResult<ApiResponse> {
        self.request(Method::POST, path, body, RequestOptions::default())
            .await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn put(&self, path: &str, body: Value) -> ClientResult<ApiResponse> {
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn delete(&self, path: &str) -> ClientResult<ApiResponse> {
        self.request(Method::DELETE, path, None, RequestOptions::default())
            .await
    }

    /// Returns a fresh session after `stale_access` was rejected, joining
    /// the in-flight refresh if there is one.
    async fn refresh_session(&self, stale_access: &str) -> ClientResult<Session> {
        let future = {
            let mut slot = self.inner.lock_refresh();
            if let Some(inflight) = &slot.inflight {
                debug!("Joining in-flight token refresh");
                inflight.future.clone()
            } else {
                let current = self.session()?;
                match current {
                    // Another caller already rotated the pair.
                    Some(session) if session.access_token != stale_access => {
                        return Ok(session);
                    }
                    Some(session) if session.can_refresh() => {
                        let generation = slot.next_generation;
                        slot.next_generation += 1;
                        let future = Inner::run_refresh(Arc::clone(&self.inner), session, generation)
                            .boxed()
                            .shared();
                        slot.inflight = Some(InflightRefresh {
                            generation,
                            future: future.clone(),
                        });
                        future
                    }
                    Some(_) => {
                        drop(slot);
                        warn!("No refresh token available; clearing session");
                        self.inner.expire();
                        return Err(ClientError::SessionExpired);
                    }
                    None => return Err(ClientError::SessionExpired),
                }
            }
        };

        future.await
    }
}

impl Inner {
    fn lock_refresh(&self) -> MutexGuard<'_, RefreshSlot> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn expire(&self) {
        if let Err(e) = self.sessions.clear() {
            warn!(error = %format!("{e:#}"), "Failed to clear session");
        }
        self.notify(SessionEvent::Expired);
    }

    async fn send(&self, request: &ApiRequest, token: Option<&str>) -> ClientResult<ApiResponse> {
        let timeout = self.config.request_timeout;
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));
        builder = match request.options.mode {
            ResponseMode::Json => builder.header(ACCEPT, "application/json"),
            ResponseMode::Binary => builder.header(ACCEPT, "*/*"),
        };
        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        debug!(method = %request.method, path = %request.path, "Sending request");
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(method = %request.method, path = %request.path, %status, "Request failed");
            return Err(ClientError::from_status(status, &body));
        }

        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e, timeout))?;
        let body = match request.options.mode {
            ResponseMode::Binary => ResponseBody::Binary(bytes),
            ResponseMode::Json if bytes.iter().all(u8::is_ascii_whitespace) => {
                ResponseBody::Json(Value::Null)
            }
            ResponseMode::Json => ResponseBody::Json(
                serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?,
            ),
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    /// Exchanges the refresh token for a new pair. Sent without credentials.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> ClientResult<RefreshResponse> {
        let request = ApiRequest::new(Method::POST, REFRESH_PATH)
            .body(serde_json::json!({ "refresh_token": refresh_token }))
            .options(RequestOptions::new().anonymous());
        self.send(&request, None).await?.json()
    }

    /// The shared refresh operation. Runs once no matter how many callers
    /// await it, so persisting or clearing the session happens once too.
    async fn run_refresh(
        inner: Arc<Inner>,
        session: Session,
        generation: u64,
    ) -> ClientResult<Session> {
        info!(refresh = %mask_token(&session.refresh_token), "Refreshing access token");

        let result = match inner.exchange_refresh_token(&session.refresh_token).await {
            Ok(tokens) => {
                let renewed = Session::new(
                    tokens.access_token,
                    tokens.refresh_token,
                    session.persistence,
                );
                match inner.sessions.persist(&renewed) {
                    Ok(()) => {
                        info!(access = %mask_token(&renewed.access_token), "Access token refreshed");
                        inner.notify(SessionEvent::Refreshed);
                        Ok(renewed)
                    }
                    Err(e) => Err(ClientError::storage(&e)),
                }
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed; clearing session");
                inner.expire();
                Err(ClientError::SessionExpired)
            }
        };

        let mut slot = inner.lock_refresh();
        if slot
            .inflight
            .as_ref()
            .is_some_and(|inflight| inflight.generation == generation)
        {
            slot.inflight = None;
        }
        drop(slot);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> ApiClient {
        ApiClient::new(Config::new(api_url).unwrap(), SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let client = client("http://localhost:8000/");
        assert_eq!(
            client.inner.url("/api/jobs"),
            "http://localhost:8000/api/jobs"
        );
        assert_eq!(client.inner.url("api/jobs/7"), "http://localhost:8000/api/jobs/7");
    }

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::new()
            .query("format", "pdf")
            .query_opt(&[("page", Some(2)), ("limit", None)])
            .binary();
        assert_eq!(
            options.query,
            vec![
                ("format".to_string(), "pdf".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(options.mode, ResponseMode::Binary);
        assert!(!options.anonymous);
    }

    #[test]
    fn test_response_body_accessors() {
        let json = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Json(serde_json::json!({"id": 3})),
        };
        assert!(json.clone().into_bytes().is_err());
        let parsed: serde_json::Map<String, Value> = json.json().unwrap();
        assert_eq!(parsed["id"], 3);

        let binary = ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ResponseBody::Binary(Bytes::from_static(b"%PDF")),
        };
        assert!(matches!(
            binary.clone().json::<Value>(),
            Err(ClientError::Decode(_))
        ));
        assert_eq!(binary.into_bytes().unwrap(), Bytes::from_static(b"%PDF"));
    }

    #[tokio::test]
    async fn test_clear_session_emits_logged_out_once() {
        let client = client("http://localhost:8000");
        let mut events = client.subscribe();

        client
            .persist_session(&Session::new(
                "T1",
                "R1",
                crate::session::Persistence::Ephemeral,
            ))
            .unwrap();
        client.clear_session().unwrap();
        client.clear_session().unwrap();

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Started);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
        assert!(events.try_recv().is_err());
        assert_eq!(client.session().unwrap(), None);
    }
}
