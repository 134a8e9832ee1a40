//! Google Workspace client: Calendar v3 for free/busy and inserts, Gmail v1
//! for sends.
//!
//! Authentication is the installed-app OAuth flow: a one-time browser
//! consent (`jess auth google`) stores a refresh token, and every later
//! session refreshes from it.
//!
//! ```ignore
//! use jess_providers::google::{GoogleConfig, GoogleSession, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("client_secret.json")?;
//! let session = GoogleSession::new(GoogleConfig::new(credentials))?;
//! if session.needs_reauth() {
//!     session.authenticate().await?;
//! }
//! ```

mod client;
mod config;
mod oauth;
mod session;
mod tokens;

pub use client::GoogleApiClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use session::GoogleSession;
pub use tokens::{TokenInfo, TokenStorage};
