//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/jess/config.toml` by default. The file is read once at startup
//! and never written back, except by `jess auth google` persisting
//! credentials.
//!
//! ```toml
//! [google]
//! client_id = "pass::google/jess-client-id"
//! client_secret = "env::JESS_CLIENT_SECRET"
//! mailbox = "me"
//!
//! [calendar]
//! timezone = "America/New_York"
//! organizer_name = "Jess"
//!
//! [email]
//! from = "Jess <jess@example.com>"
//! ```
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store` : resolved via `pass show`
//! - `env::VAR_NAME` : resolved from the environment
//! - plain text : used as-is

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use jess_core::OrganizerZone;

use crate::error::{ClientError, ClientResult};

/// Zone used when `[calendar] timezone` is not set.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Configuration for the jess client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Workspace session settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    pub calendar: CalendarSettings,

    pub email: EmailSettings,
}

/// Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// IANA zone every wall-clock time is interpreted in.
    pub timezone: String,

    /// Default organizer name recorded on booked appointments.
    pub organizer_name: Option<String>,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            organizer_name: None,
        }
    }
}

/// Email settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Default `From` address for `jess email`.
    pub from: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path; a missing file gives defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// The organizer zone from `[calendar] timezone`.
    pub fn zone(&self) -> ClientResult<OrganizerZone> {
        self.calendar.timezone.parse().map_err(|e| {
            ClientError::Config(format!("[calendar] timezone: {}", e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jess")
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Workspace settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,

    /// Gmail user id messages are sent as; `"me"` when unset.
    pub mailbox: Option<String>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Builds the session configuration, resolving secret references.
    pub fn to_provider_config(&self) -> ClientResult<jess_providers::google::GoogleConfig> {
        use jess_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e.message())))?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(ref mailbox) = self.mailbox {
            config = config.with_mailbox(mailbox);
        }
        Ok(config)
    }

    /// Resolves Google OAuth credentials from inline fields.
    ///
    /// Both `client_id` and `client_secret` must be set. Each value is passed
    /// through `secret::resolve()` to expand `pass::` and `env::` references.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<jess_providers::google::OAuthCredentials> {
        use jess_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            ClientError::Config(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: jess auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            ))
        })?;
        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            ClientError::Config("client_secret is missing from [google] section".to_string())
        })?;

        let id = crate::secret::resolve(raw_id)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;
        let secret = crate::secret::resolve(raw_secret)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_secret: {}", e)))?;
        Ok(OAuthCredentials::new(id, secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.calendar.timezone, DEFAULT_TIMEZONE);
        assert!(config.calendar.organizer_name.is_none());
        assert!(config.email.from.is_none());
        assert_eq!(config.zone().unwrap().name(), "America/New_York");
    }

    #[test]
    fn calendar_and_email_sections() {
        let config: ClientConfig = toml::from_str(
            r#"
[calendar]
timezone = "Europe/Paris"
organizer_name = "Jess"

[email]
from = "jess@example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.zone().unwrap().name(), "Europe/Paris");
        assert_eq!(config.calendar.organizer_name.as_deref(), Some("Jess"));
        assert_eq!(config.email.from.as_deref(), Some("jess@example.com"));
    }

    #[test]
    fn unknown_timezone_is_config_error() {
        let config: ClientConfig =
            toml::from_str("[calendar]\ntimezone = \"Mars/Olympus\"\n").unwrap();
        let err = config.zone().unwrap_err();
        assert!(matches!(err, ClientError::Config(ref m) if m.contains("Mars/Olympus")));
    }

    #[test]
    fn load_from_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[calendar\n").unwrap();
        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));

        let missing = ClientConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ClientError::Config(_)));
    }

    #[cfg(feature = "google")]
    mod google {
        use super::super::*;

        #[test]
        fn resolve_credentials_plain_text() {
            let settings = GoogleSettings {
                client_id: Some("test-id.apps.googleusercontent.com".to_string()),
                client_secret: Some("test-secret".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "test-secret");
        }

        #[test]
        fn resolve_credentials_env_prefix() {
            unsafe {
                std::env::set_var("_JESS_TEST_CLIENT_ID", "env-id.apps.googleusercontent.com");
                std::env::set_var("_JESS_TEST_CLIENT_SECRET", "env-secret");
            }

            let settings = GoogleSettings {
                client_id: Some("env::_JESS_TEST_CLIENT_ID".to_string()),
                client_secret: Some("env::_JESS_TEST_CLIENT_SECRET".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "env-secret");

            unsafe {
                std::env::remove_var("_JESS_TEST_CLIENT_ID");
                std::env::remove_var("_JESS_TEST_CLIENT_SECRET");
            }
        }

        #[test]
        fn missing_values_error() {
            let no_id = GoogleSettings {
                client_secret: Some("secret".to_string()),
                ..Default::default()
            };
            let err = no_id.resolve_credentials().unwrap_err();
            assert!(err.to_string().contains("credentials not found"));

            let no_secret = GoogleSettings {
                client_id: Some("id.apps.googleusercontent.com".to_string()),
                ..Default::default()
            };
            let err = no_secret.resolve_credentials().unwrap_err();
            assert!(err.to_string().contains("client_secret"));
        }

        #[test]
        fn provider_config_from_toml() {
            let config: ClientConfig = toml::from_str(
                r#"
[google]
client_id = "toml-id.apps.googleusercontent.com"
client_secret = "toml-secret"
token_path = "/tmp/jess-tokens.json"
mailbox = "assistant@example.com"
"#,
            )
            .unwrap();
            let provider = config.google.unwrap().to_provider_config().unwrap();
            assert_eq!(
                provider.credentials.client_id,
                "toml-id.apps.googleusercontent.com"
            );
            assert_eq!(provider.mailbox, "assistant@example.com");
            assert_eq!(provider.token_path, PathBuf::from("/tmp/jess-tokens.json"));
        }

        #[test]
        fn provider_config_rejects_malformed_client_id() {
            let settings = GoogleSettings {
                client_id: Some("not-a-google-id".to_string()),
                client_secret: Some("s".to_string()),
                ..Default::default()
            };
            let err = settings.to_provider_config().unwrap_err();
            assert!(err.to_string().contains("apps.googleusercontent.com"));
        }
    }
}
