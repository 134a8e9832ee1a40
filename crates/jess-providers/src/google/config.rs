//! Google Workspace session configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{RemoteError, RemoteResult};

/// OAuth 2.0 client identity registered in Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// The downloadable client JSON: either an `installed`/`web` section, or
/// `client_id`/`client_secret` at the root.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads a client secret JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> RemoteResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RemoteError::configuration(format!(
                "failed to read credentials file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses a client secret JSON document.
    pub fn from_json(json: &str) -> RemoteResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            RemoteError::configuration("failed to parse credentials JSON").with_source(e)
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }
        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(RemoteError::configuration(
                "credentials JSON has no 'installed'/'web' section and no root client_id/client_secret",
            )),
        }
    }

    /// Checks the shape of the client id and that a secret is present.
    pub fn validate(&self) -> RemoteResult<()> {
        if self.client_id.is_empty() {
            return Err(RemoteError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(RemoteError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.is_empty() {
            return Err(RemoteError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

/// Settings for one authenticated Google Workspace session.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Distinguishes token files when several accounts are configured.
    pub account_name: String,

    pub credentials: OAuthCredentials,

    /// Where the refresh token is persisted.
    ///
    /// Defaults to `~/.local/share/jess/google-tokens-{account}.json`.
    pub token_path: PathBuf,

    /// Gmail `userId` for sends: `"me"` or the delegated mailbox address.
    pub mailbox: String,

    /// Calendar API root, without trailing slash.
    pub calendar_api_base: String,

    /// Gmail API root, without trailing slash.
    pub gmail_api_base: String,

    /// OAuth token endpoint.
    pub token_url: String,

    pub timeout: Duration,
    pub user_agent: String,

    /// Ports the loopback redirect server may bind, inclusive.
    pub loopback_port_range: (u16, u16),

    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write calendar access, needed for free/busy and inserts.
    pub const CALENDAR_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Send-only mail access.
    pub const GMAIL_SEND_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.send";

    pub const CALENDAR_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";
    pub const GMAIL_API_BASE: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Gmail's alias for the authenticated user.
    pub const DEFAULT_MAILBOX: &'static str = "me";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            account_name: "default".to_string(),
            credentials,
            token_path: Self::default_token_path("default"),
            mailbox: Self::DEFAULT_MAILBOX.to_string(),
            calendar_api_base: Self::CALENDAR_API_BASE.to_string(),
            gmail_api_base: Self::GMAIL_API_BASE.to_string(),
            token_url: super::oauth::GOOGLE_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("jess/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![
                Self::CALENDAR_SCOPE.to_string(),
                Self::GMAIL_SEND_SCOPE.to_string(),
            ],
        }
    }

    pub fn default_token_path(account_name: &str) -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jess")
            .join(format!("google-tokens-{}.json", account_name))
    }

    /// Sets the account name, moving the token path along if it was the default.
    pub fn with_account_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.token_path == Self::default_token_path(&self.account_name) {
            self.token_path = Self::default_token_path(&name);
        }
        self.account_name = name;
        self
    }

    /// e.g. `"google:work"`.
    pub fn provider_name(&self) -> String {
        format!("google:{}", self.account_name)
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Points both APIs and the token endpoint at one root; used to aim the
    /// session at a mock server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/');
        self.calendar_api_base = format!("{base}/calendar/v3");
        self.gmail_api_base = format!("{base}/gmail/v1");
        self.token_url = format!("{base}/token");
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Checks credentials, scopes, mailbox and port range.
    pub fn validate(&self) -> RemoteResult<()> {
        self.credentials.validate()?;

        if !self.scopes.iter().any(|s| s == Self::CALENDAR_SCOPE) {
            return Err(RemoteError::configuration(format!(
                "the {} scope is required",
                Self::CALENDAR_SCOPE
            )));
        }
        if self.mailbox.trim().is_empty() {
            return Err(RemoteError::configuration("mailbox must not be empty"));
        }
        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(RemoteError::configuration("invalid loopback port range"));
        }
        Ok(())
    }
}
