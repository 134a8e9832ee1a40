//! `jess auth google`: one-time browser consent for Calendar and Gmail.

use std::path::{Path, PathBuf};

use tracing::info;

use jess_providers::WorkspaceClient;
use jess_providers::google::{GoogleSession, OAuthCredentials};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Where the credentials were resolved from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`
    Cli,
    /// Already in `config.toml`
    Config,
}

/// Runs the Google consent flow, or forgets the stored grant with `sign_out`.
///
/// Credentials given on the command line are written to `config.toml` once
/// the flow succeeds, so later commands find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    sign_out: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) =
        resolve_google_credentials(client_id, client_secret, credentials_file, config.google.as_ref())?;
    let session = session_for(&credentials, config)?;

    if sign_out {
        session.sign_out().await?;
        println!(
            "Signed out of Google. Removed {}",
            session.config().token_path.display()
        );
        return Ok(());
    }

    if !needs_consent(&session, force) {
        if source == CredentialSource::Cli {
            save_credentials_to_config(config_path, &credentials)?;
        }
        println!("Already authorized with Google. Use --force to authorize again.");
        return Ok(());
    }

    println!("A browser window will open to authorize jess for Calendar and Gmail.");
    println!("If it does not, copy the URL printed below.");
    session.authenticate().await?;

    if source == CredentialSource::Cli {
        save_credentials_to_config(config_path, &credentials)?;
    }

    info!("Google authorization complete");
    println!(
        "Authorized. Tokens saved to {}",
        session.config().token_path.display()
    );
    Ok(())
}

/// Builds the session with `credentials` in place of the configured ones;
/// token path and mailbox still come from the config.
fn session_for(credentials: &OAuthCredentials, config: &ClientConfig) -> ClientResult<GoogleSession> {
    let settings = GoogleSettings {
        client_id: Some(credentials.client_id.clone()),
        client_secret: Some(credentials.client_secret.clone()),
        ..config.google.clone().unwrap_or_default()
    };
    Ok(GoogleSession::new(settings.to_provider_config()?)?)
}

fn needs_consent(session: &GoogleSession, force: bool) -> bool {
    force || !session.is_authenticated() || session.needs_reauth()
}

/// Picks credentials in priority order: flags, credentials file, config.
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    match (cli_client_id, cli_client_secret) {
        (Some(id), Some(secret)) => {
            return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(ClientError::Usage(
                "--client-id and --client-secret must be given together".to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(&path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e.message()
            ))
        })?;
        return Ok((creds, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
    {
        return Ok((google.resolve_credentials()?, CredentialSource::Config));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide them with:\n  \
         - client_id + client_secret under [google] in {}\n  \
         - --client-id and --client-secret\n  \
         - --credentials-file (Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
        ClientConfig::default_path().display()
    )))
}

/// Writes `client_id`/`client_secret` under `[google]`, keeping every other
/// line of the file as it was.
fn save_credentials_to_config(path: &Path, credentials: &OAuthCredentials) -> ClientResult<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::Config(format!("cannot update {}: {}", path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let Some(google) = doc["google"].as_table_mut() else {
        return Err(ClientError::Config(format!(
            "cannot save credentials: `google` in {} is not a table",
            path.display()
        )));
    };
    google["client_id"] = toml_edit::value(credentials.client_id.as_str());
    google["client_secret"] = toml_edit::value(credentials.client_secret.as_str());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    info!(path = %path.display(), "credentials saved");
    println!("Credentials saved to {}", path.display());
    Ok(())
}
