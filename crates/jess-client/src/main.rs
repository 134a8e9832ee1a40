//! jess CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use jess_core::{Submission, TracingConfig, init_tracing};
use jess_providers::{ErrorClient, RemoteError, WorkspaceClient};

use jess_client::actions;
use jess_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use jess_client::commands::{self, submit};
use jess_client::config::ClientConfig;
use jess_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<ExitCode> {
    let output = Output {
        json: cli.json,
        open: cli.open,
    };
    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    init_tracing(tracing.with_format(cli.log_format))?;

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    let submission = match cli.command {
        Command::Book(args) => submit::appointment(args, &config),
        Command::Task(args) => submit::task(args),
        Command::Email(args) => submit::email(args, &config),
        Command::Auth { provider } => {
            auth(provider, &config, config_path).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path)?,
                ConfigAction::Validate => commands::config::validate(&config)?,
                ConfigAction::Path => commands::config::path(&config_path)?,
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    submit_once(output, &config, &submission).await
}

/// How a submission result is presented.
#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
    open: bool,
}

/// Builds the one client for this process and runs the submission.
async fn submit_once(
    output: Output,
    config: &ClientConfig,
    submission: &Submission,
) -> ClientResult<ExitCode> {
    let zone = config.zone()?;
    let client = workspace_client(config);
    debug!(client = client.name(), zone = %zone, "submitting");

    let result = submit::run(client.as_ref(), zone, submission).await;
    if output.json {
        println!("{}", submit::render_json(&result));
    } else {
        println!("{}", submit::render(&result, &zone));
    }

    if output.open {
        actions::open_event_link(&result)?;
    }
    Ok(ExitCode::from(submit::exit_code(&result)))
}

/// A session that cannot be set up becomes a client whose every call fails
/// with the setup error, so the result is still rendered as a failure.
#[cfg(feature = "google")]
fn workspace_client(config: &ClientConfig) -> Box<dyn WorkspaceClient> {
    use jess_providers::google::GoogleSession;

    let Some(ref settings) = config.google else {
        return Box::new(ErrorClient::new(
            "google",
            RemoteError::configuration("no [google] section; run `jess auth google`"),
        ));
    };
    match settings
        .to_provider_config()
        .map_err(|e| RemoteError::configuration(e.to_string()))
        .and_then(GoogleSession::new)
    {
        Ok(session) => Box::new(session),
        Err(e) => Box::new(ErrorClient::new("google", e)),
    }
}

#[cfg(not(feature = "google"))]
fn workspace_client(_config: &ClientConfig) -> Box<dyn WorkspaceClient> {
    Box::new(ErrorClient::new(
        "none",
        RemoteError::configuration("jess was built without a workspace provider"),
    ))
}

async fn auth(provider: AuthProvider, config: &ClientConfig, config_path: PathBuf) -> ClientResult<()> {
    match provider {
        #[cfg(feature = "google")]
        AuthProvider::Google {
            client_id,
            client_secret,
            credentials_file,
            force,
            sign_out,
        } => {
            commands::auth::google(
                client_id,
                client_secret,
                credentials_file,
                force,
                sign_out,
                config,
                &config_path,
            )
            .await
        }
        #[cfg(not(feature = "google"))]
        _ => {
            let _ = (config, config_path);
            Err(jess_client::ClientError::Usage(
                "jess was built without a workspace provider".into(),
            ))
        }
    }
}
