//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand};

use jess_core::{MeetingDuration, TracingOutputFormat};

/// jess - book appointments, add tasks and send email from the terminal
#[derive(Debug, Parser)]
#[command(name = "jess")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "JESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format on stderr: compact or json
    #[arg(long, global = true, env = "JESS_LOG_FORMAT", default_value = "compact")]
    pub log_format: TracingOutputFormat,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Open the created event in the browser
    #[arg(long, global = true)]
    pub open: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Book an appointment if the slot is free, and invite the participant
    Book(BookArgs),

    /// Add a task to the calendar
    Task(TaskArgs),

    /// Send an email
    Email(EmailArgs),

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Args)]
pub struct BookArgs {
    /// Appointment title
    #[arg(long, short)]
    pub title: String,

    /// Participant email address
    #[arg(long = "with", short = 'w', value_name = "EMAIL")]
    pub participant: String,

    /// Start, local to the configured zone (e.g. "2024-06-01 09:00")
    #[arg(long, value_parser = parse_local_datetime)]
    pub at: NaiveDateTime,

    /// Length: 15, 30 or 60 minutes
    #[arg(long, short, default_value = "30", value_parser = parse_duration)]
    pub duration: MeetingDuration,

    /// Description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Organizer name; defaults to `[calendar] organizer_name`
    #[arg(long)]
    pub organizer: Option<String>,
}

#[derive(Debug, Args)]
pub struct TaskArgs {
    /// Task title
    #[arg(long, short)]
    pub title: String,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: NaiveDate,

    /// Due time (HH:MM), for a one-hour block
    #[arg(long, value_parser = parse_time, conflicts_with = "all_day")]
    pub time: Option<NaiveTime>,

    /// Make it an all-day entry
    #[arg(long)]
    pub all_day: bool,

    /// Description
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Debug, Args)]
pub struct EmailArgs {
    /// Recipient
    #[arg(long)]
    pub to: String,

    /// Subject line
    #[arg(long, short)]
    pub subject: String,

    /// Message body
    #[arg(long, short)]
    pub body: String,

    /// Sender; defaults to `[email] from`
    #[arg(long)]
    pub from: Option<String>,
}

/// Authentication providers.
#[derive(Debug, Subcommand)]
pub enum AuthProvider {
    /// Authorize jess for Google Calendar and Gmail
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,

        /// Remove the stored Google tokens instead of authorizing
        #[arg(long, conflicts_with = "force")]
        sign_out: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

fn parse_local_datetime(s: &str) -> Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM, got {s:?}"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM-DD, got {s:?}"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got {s:?}"))
}

fn parse_duration(s: &str) -> Result<MeetingDuration, String> {
    s.parse::<MeetingDuration>().map_err(|e| e.to_string())
}
