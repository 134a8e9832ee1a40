//! The authenticated Google Workspace session.
//!
//! Implements [`WorkspaceClient`] on top of [`GoogleApiClient`], refreshing
//! the access token from the persisted refresh token when it expires.

use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info, warn};

use jess_core::{Confirmation, EmailPayload, EventPayload, TimeWindow};

use crate::error::{RemoteError, RemoteResult};
use crate::workspace::{BoxFuture, FreeBusyQuery, WorkspaceClient};

use super::client::GoogleApiClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

/// A Google account session, created once per process.
pub struct GoogleSession {
    config: GoogleConfig,
    display_name: String,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: TokioRwLock<Option<GoogleApiClient>>,
}

impl GoogleSession {
    /// Validates the config and loads persisted tokens.
    ///
    /// Does not contact Google. A missing or unreadable token file is not an
    /// error here: the session starts signed out, the first remote call
    /// reports it, and `authenticate` overwrites the file.
    pub fn new(config: GoogleConfig) -> RemoteResult<Self> {
        config.validate()?;

        let display_name = config.provider_name();
        let token_storage = TokenStorage::new(&config.token_path);
        if let Err(e) = token_storage.load() {
            warn!(error = %e, "ignoring unreadable token file; sign in again");
        }

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?
            .with_token_url(config.token_url.clone());

        let api_client = match token_storage.get() {
            Some(tokens) if !tokens.is_expired() => {
                Some(GoogleApiClient::new(&tokens.access_token, &config)?)
            }
            _ => None,
        };

        Ok(Self {
            config,
            display_name,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(api_client),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Runs the browser consent flow and persists the grant.
    pub async fn authenticate(&self) -> RemoteResult<()> {
        info!(account = %self.config.account_name, "starting Google consent flow");
        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        if !tokens.has_scopes(&self.config.scopes) {
            return Err(RemoteError::authorization(
                "consent did not grant every requested scope",
            ));
        }

        self.token_storage.set(tokens.clone())?;
        *self.api_client.write().await =
            Some(GoogleApiClient::new(&tokens.access_token, &self.config)?);
        info!(path = %self.token_storage.path().display(), "Google authorization saved");
        Ok(())
    }

    /// True when there is no grant or it lacks a configured scope.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    /// Forgets the stored grant.
    pub async fn sign_out(&self) -> RemoteResult<()> {
        *self.api_client.write().await = None;
        self.token_storage.clear()
    }

    /// Makes sure `api_client` holds an unexpired token.
    async fn ensure_client(&self) -> RemoteResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            RemoteError::authentication("not signed in to Google; run `jess auth google`")
                .with_provider(&self.display_name)
        })?;

        if !tokens.is_expired() {
            let mut client = self.api_client.write().await;
            if client.is_none() {
                *client = Some(GoogleApiClient::new(&tokens.access_token, &self.config)?);
            }
            return Ok(());
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            RemoteError::authentication("access token expired and no refresh token is stored; run `jess auth google`")
                .with_provider(&self.display_name)
        })?;

        debug!("access token expired, refreshing");
        let refreshed = self
            .oauth_client
            .refresh(refresh_token)
            .await
            .map_err(|e| e.with_provider(&self.display_name))?;
        self.token_storage.refresh(
            &refreshed.access_token,
            refreshed.refresh_token,
            refreshed.expires_in,
        )?;

        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(&refreshed.access_token),
            None => *client = Some(GoogleApiClient::new(&refreshed.access_token, &self.config)?),
        }
        Ok(())
    }

    async fn free_busy_impl(&self, query: FreeBusyQuery) -> RemoteResult<Vec<TimeWindow>> {
        self.ensure_client().await?;
        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| RemoteError::internal("API client not available"))?;
        client.query_free_busy(&query).await
    }

    async fn insert_event_impl(
        &self,
        calendar_id: String,
        event: EventPayload,
        notify_attendees: bool,
    ) -> RemoteResult<Confirmation> {
        self.ensure_client().await?;
        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| RemoteError::internal("API client not available"))?;
        client
            .insert_event(&calendar_id, &event, notify_attendees)
            .await
    }

    async fn send_email_impl(&self, payload: EmailPayload) -> RemoteResult<Confirmation> {
        self.ensure_client().await?;
        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| RemoteError::internal("API client not available"))?;
        client.send_message(&payload).await
    }

    fn tag<T>(&self, result: RemoteResult<T>) -> RemoteResult<T> {
        result.map_err(|e| {
            if e.provider().is_some() {
                e
            } else {
                e.with_provider(&self.display_name)
            }
        })
    }
}

impl WorkspaceClient for GoogleSession {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn query_free_busy(&self, query: FreeBusyQuery) -> BoxFuture<'_, RemoteResult<Vec<TimeWindow>>> {
        Box::pin(async move {
            let result = self.free_busy_impl(query).await;
            self.tag(result)
        })
    }

    fn insert_event(
        &self,
        calendar_id: &str,
        event: EventPayload,
        notify_attendees: bool,
    ) -> BoxFuture<'_, RemoteResult<Confirmation>> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move {
            let result = self
                .insert_event_impl(calendar_id, event, notify_attendees)
                .await;
            self.tag(result)
        })
    }

    fn send_email(&self, payload: EmailPayload) -> BoxFuture<'_, RemoteResult<Confirmation>> {
        Box::pin(async move {
            let result = self.send_email_impl(payload).await;
            self.tag(result)
        })
    }

    fn is_authenticated(&self) -> bool {
        self.token_storage.has_valid_tokens() || self.token_storage.has_refresh_token()
    }
}
