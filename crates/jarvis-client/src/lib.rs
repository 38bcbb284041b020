//! Client library for the JARVIS job-search API.
//!
//! [`ApiClient`] attaches the stored session's bearer token to each request,
//! refreshes it once on 401 (one refresh shared by all concurrent callers),
//! and replays the request. Resource wrappers live in [`api`].

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::{
    ApiClient, ApiRequest, ApiResponse, RequestOptions, ResponseBody, ResponseMode, SessionEvent,
};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use session::{FileScope, MemoryScope, Persistence, Session, SessionStore, TokenPair, TokenScope};
