//! Submission outcomes.
//!
//! [`SubmissionResult`] is what the front end renders: a success with a link
//! or id, a booking conflict warning, or a failure carrying the provider's
//! reason string.

use serde::{Deserialize, Serialize};

use crate::request::Action;
use crate::time::TimeWindow;

/// What the provider returned for a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Event id or sent-message id.
    pub id: String,
    /// Human-viewable link, present for calendar events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

impl Confirmation {
    /// Creates a confirmation with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            html_link: None,
        }
    }

    /// Builder method to set the link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }

    /// The link if there is one, else the id.
    pub fn display_ref(&self) -> &str {
        self.html_link.as_deref().unwrap_or(&self.id)
    }
}

/// The user-facing result of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionResult {
    /// The action completed.
    Success {
        action: Action,
        confirmation: Confirmation,
    },
    /// The requested slot overlaps existing busy time. Nothing was written.
    Conflict { busy: Vec<TimeWindow> },
    /// Validation or the remote call failed.
    Failure { action: Action, message: String },
}

impl SubmissionResult {
    /// Returns true for [`SubmissionResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true for [`SubmissionResult::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// A one-line message suitable for display.
    pub fn message(&self) -> String {
        match self {
            Self::Success {
                action: Action::BookAppointment,
                confirmation,
            } => format!("Appointment created: {}", confirmation.display_ref()),
            Self::Success {
                action: Action::AddTask,
                confirmation,
            } => format!("Task added: {}", confirmation.display_ref()),
            Self::Success {
                action: Action::SendEmail,
                confirmation,
            } => format!("Email sent! Message ID: {}", confirmation.id),
            Self::Conflict { busy } => format!(
                "That time is not available ({} busy interval{} overlap the slot). Pick another time.",
                busy.len(),
                if busy.len() == 1 { "" } else { "s" }
            ),
            Self::Failure { action, message } => format!("Could not {}: {}", action, message),
        }
    }
}
