//! Persisted OAuth tokens.
//!
//! One JSON file per account holds the refresh token, the last access token
//! and the scopes the user granted. The file is written atomically and is
//! readable by the owner only.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RemoteError, RemoteResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A granted token set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Already reduced by the expiry margin.
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Builds a token set from a token endpoint response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Applies a refresh response. Google keeps the old refresh token unless
    /// it sends a new one.
    pub fn refreshed(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expiry_from(expires_in_secs);
        self.last_refresh = Utc::now();
    }
}

/// File-backed token store with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TokenInfo>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenInfo>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Loads the token file. Returns `Ok(false)` when there is none yet.
    pub fn load(&self) -> RemoteResult<bool> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            RemoteError::configuration(format!(
                "failed to read token file {}",
                self.path.display()
            ))
            .with_source(e)
        })?;
        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            RemoteError::configuration(format!(
                "token file {} is corrupt; run `jess auth google`",
                self.path.display()
            ))
            .with_source(e)
        })?;

        info!(path = %self.path.display(), "loaded tokens");
        *self.write() = Some(tokens);
        Ok(true)
    }

    fn persist(&self, tokens: &TokenInfo) -> RemoteResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RemoteError::configuration("failed to create token directory").with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| RemoteError::internal("failed to serialize tokens").with_source(e))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            RemoteError::configuration("failed to write token file").with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                RemoteError::configuration("failed to restrict token file permissions")
                    .with_source(e)
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            RemoteError::configuration("failed to move token file into place").with_source(e)
        })?;

        debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.read().clone()
    }

    /// Replaces the tokens and writes them out.
    pub fn set(&self, tokens: TokenInfo) -> RemoteResult<()> {
        self.persist(&tokens)?;
        *self.write() = Some(tokens);
        Ok(())
    }

    /// Applies a refresh response to the stored tokens and writes them out.
    pub fn refresh(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> RemoteResult<()> {
        let mut guard = self.write();
        let tokens = guard
            .as_mut()
            .ok_or_else(|| RemoteError::internal("no tokens to refresh"))?;
        tokens.refreshed(access_token, refresh_token, expires_in_secs);
        self.persist(tokens)
    }

    /// Forgets the tokens and removes the file.
    pub fn clear(&self) -> RemoteResult<()> {
        *self.write() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                RemoteError::configuration("failed to remove token file").with_source(e)
            })?;
            info!(path = %self.path.display(), "cleared tokens");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when an unexpired access token is loaded.
    pub fn has_valid_tokens(&self) -> bool {
        self.read().as_ref().is_some_and(|t| !t.is_expired())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|t| t.refresh_token.is_some())
    }

    /// True when no tokens are loaded or they lack a required scope.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.read()
            .as_ref()
            .is_none_or(|t| !t.has_scopes(required_scopes))
    }
}
