//! Session token storage.
//!
//! A session is an access/refresh token pair. It lives in exactly one of two
//! storage scopes: the durable scope (`<JARVIS_HOME>/credentials.json`,
//! written with 0600 permissions) survives restarts, the ephemeral scope is
//! process memory. Both scopes hold the same two slots, `access_token` and
//! `refresh_token`, and always write them together.
//!
//! Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Where a session's tokens are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// Survives process restart ("remember me").
    Durable,
    /// Dropped when the process exits.
    Ephemeral,
}

impl Persistence {
    pub fn from_remember(remember: bool) -> Self {
        if remember {
            Self::Durable
        } else {
            Self::Ephemeral
        }
    }
}

/// The two credential slots as stored in a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// The active authenticated user context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub persistence: Persistence,
}

impl Session {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        persistence: Persistence,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            persistence,
        }
    }

    /// Whether a refresh can be attempted for this session.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }

    fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    fn from_tokens(tokens: TokenPair, persistence: Persistence) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            persistence,
        }
    }
}

/// One storage scope holding at most one token pair.
pub trait TokenScope: Send + Sync {
    /// Reads the stored pair, if any.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<TokenPair>>;

    /// Replaces the stored pair.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn store(&self, tokens: &TokenPair) -> Result<()>;

    /// Removes the stored pair. Returns whether one was present.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self) -> Result<bool>;
}

/// Process-memory scope.
#[derive(Debug, Default)]
pub struct MemoryScope {
    slot: Mutex<Option<TokenPair>>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenScope for MemoryScope {
    fn load(&self) -> Result<Option<TokenPair>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, tokens: &TokenPair) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some())
    }
}

/// JSON file scope. The file contains the `access_token` and
/// `refresh_token` slots of a single [`TokenPair`].
#[derive(Debug, Clone)]
pub struct FileScope {
    path: PathBuf,
}

impl FileScope {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File scope at `<JARVIS_HOME>/credentials.json`.
    pub fn default_location() -> Self {
        Self::new(paths::credentials_path())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TokenScope for FileScope {
    fn load(&self) -> Result<Option<TokenPair>> {
        let path = &self.path;
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
        let tokens = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", path.display()))?;
        Ok(Some(tokens))
    }

    fn store(&self, tokens: &TokenPair) -> Result<()> {
        let path = &self.path;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(tokens).context("Failed to serialize credentials")?;

        // Write to a sibling file first so the two slots are replaced together.
        let tmp = path.with_extension("json.tmp");
        {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options
                .open(&tmp)
                .with_context(|| format!("Failed to open {} for writing", tmp.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp.display()))?;
        }
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Injectable session store spanning both scopes.
///
/// The only writers are [`SessionStore::persist`] and [`SessionStore::clear`];
/// readers always go to the scopes, so a token is never cached across calls.
#[derive(Clone)]
pub struct SessionStore {
    durable: Arc<dyn TokenScope>,
    ephemeral: Arc<dyn TokenScope>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(durable: Arc<dyn TokenScope>, ephemeral: Arc<dyn TokenScope>) -> Self {
        Self {
            durable,
            ephemeral,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Durable scope at `<JARVIS_HOME>/credentials.json`, ephemeral scope in memory.
    pub fn with_default_location() -> Self {
        Self::new(
            Arc::new(FileScope::default_location()),
            Arc::new(MemoryScope::new()),
        )
    }

    /// Both scopes in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryScope::new()), Arc::new(MemoryScope::new()))
    }

    /// Returns the active session, if any. The ephemeral scope is consulted
    /// first since it only holds a pair when the user explicitly chose not
    /// to be remembered.
    ///
    /// # Errors
    /// Returns an error if a scope cannot be read.
    pub fn current(&self) -> Result<Option<Session>> {
        if let Some(tokens) = self.ephemeral.load()? {
            return Ok(Some(Session::from_tokens(tokens, Persistence::Ephemeral)));
        }
        Ok(self
            .durable
            .load()?
            .map(|tokens| Session::from_tokens(tokens, Persistence::Durable)))
    }

    /// Writes the session into its scope and removes any pair held by the
    /// other scope, so at most one session is active.
    ///
    /// # Errors
    /// Returns an error if a scope cannot be written.
    pub fn persist(&self, session: &Session) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (target, other) = match session.persistence {
            Persistence::Durable => (&self.durable, &self.ephemeral),
            Persistence::Ephemeral => (&self.ephemeral, &self.durable),
        };
        target.store(&session.tokens())?;
        other.remove()?;
        Ok(())
    }

    /// Removes both slots from both scopes. Calling it with nothing stored
    /// is not an error. Returns whether anything was removed.
    ///
    /// # Errors
    /// Returns an error if a scope cannot be written.
    pub fn clear(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let durable = self.durable.remove()?;
        let ephemeral = self.ephemeral.remove()?;
        Ok(durable || ephemeral)
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn file_backed(dir: &TempDir) -> (SessionStore, Arc<FileScope>, Arc<MemoryScope>) {
        let durable = Arc::new(FileScope::new(dir.path().join("credentials.json")));
        let ephemeral = Arc::new(MemoryScope::new());
        let store = SessionStore::new(Arc::clone(&durable) as _, Arc::clone(&ephemeral) as _);
        (store, durable, ephemeral)
    }

    #[test]
    fn test_empty_store_has_no_session() {
        let store = SessionStore::in_memory();
        assert_eq!(store.current().unwrap(), None);
    }

    #[test]
    fn test_durable_persist_writes_both_slots() {
        let dir = TempDir::new().unwrap();
        let (store, durable, _) = file_backed(&dir);

        store
            .persist(&Session::new("T1", "R1", Persistence::Durable))
            .unwrap();

        let raw = fs::read_to_string(durable.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["access_token"], "T1");
        assert_eq!(json["refresh_token"], "R1");
        assert_eq!(
            store.current().unwrap(),
            Some(Session::new("T1", "R1", Persistence::Durable))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let (store, durable, _) = file_backed(&dir);
        store
            .persist(&Session::new("T1", "R1", Persistence::Durable))
            .unwrap();

        let mode = fs::metadata(durable.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_switching_scope_removes_previous_pair() {
        let dir = TempDir::new().unwrap();
        let (store, durable, ephemeral) = file_backed(&dir);

        store
            .persist(&Session::new("T1", "R1", Persistence::Durable))
            .unwrap();
        store
            .persist(&Session::new("T2", "R2", Persistence::Ephemeral))
            .unwrap();

        assert!(durable.load().unwrap().is_none());
        assert_eq!(
            ephemeral.load().unwrap(),
            Some(TokenPair {
                access_token: "T2".to_string(),
                refresh_token: "R2".to_string(),
            })
        );
        assert_eq!(
            store.current().unwrap().unwrap().persistence,
            Persistence::Ephemeral
        );
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (store, durable, ephemeral) = file_backed(&dir);
        store
            .persist(&Session::new("T1", "R1", Persistence::Durable))
            .unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert!(durable.load().unwrap().is_none());
        assert!(ephemeral.load().unwrap().is_none());
        assert_eq!(store.current().unwrap(), None);
    }

    #[test]
    fn test_corrupt_credentials_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (store, durable, _) = file_backed(&dir);
        fs::write(durable.path(), "{not json").unwrap();

        let err = store.current().unwrap_err();
        assert!(err.to_string().contains("Failed to parse credentials"));
    }

    #[test]
    fn test_session_without_refresh_token_cannot_refresh() {
        assert!(!Session::new("T1", "", Persistence::Durable).can_refresh());
        assert!(Session::new("T1", "R1", Persistence::Durable).can_refresh());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGciOiJI...");
        assert_eq!(mask_token("sixteen-chars-ok"), "***");
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("aéééééééééé"), "***");
    }
}
