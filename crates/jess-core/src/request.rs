//! Submission types.
//!
//! A [`Submission`] is one fully-populated form: exactly one of an
//! appointment, a task, or an email. It is created by the front end,
//! consumed by a single dispatch, and dropped afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// The kind of action a submission asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    BookAppointment,
    AddTask,
    SendEmail,
}

impl Action {
    /// Returns a short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BookAppointment => "book appointment",
            Self::AddTask => "add task",
            Self::SendEmail => "send email",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One form submission, tagged by action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    BookAppointment(AppointmentRequest),
    AddTask(TaskRequest),
    SendEmail(EmailRequest),
}

impl Submission {
    /// Returns the action this submission carries.
    pub fn action(&self) -> Action {
        match self {
            Self::BookAppointment(_) => Action::BookAppointment,
            Self::AddTask(_) => Action::AddTask,
            Self::SendEmail(_) => Action::SendEmail,
        }
    }
}

/// Allowed meeting lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetingDuration {
    /// 15 minutes.
    Fifteen,
    /// 30 minutes.
    Thirty,
    /// 1 hour.
    Sixty,
}

impl MeetingDuration {
    /// All selectable durations, shortest first.
    pub const ALL: [MeetingDuration; 3] = [Self::Fifteen, Self::Thirty, Self::Sixty];

    /// Length in minutes.
    pub fn minutes(&self) -> i64 {
        match self {
            Self::Fifteen => 15,
            Self::Thirty => 30,
            Self::Sixty => 60,
        }
    }

    /// Length as a `chrono::Duration`.
    pub fn as_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes())
    }

    /// The label shown in the duration picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fifteen => "15 minutes",
            Self::Thirty => "30 minutes",
            Self::Sixty => "1 hour",
        }
    }
}

impl fmt::Display for MeetingDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MeetingDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "15" | "15m" | "15 minutes" => Ok(Self::Fifteen),
            "30" | "30m" | "30 minutes" => Ok(Self::Thirty),
            "60" | "60m" | "60 minutes" | "1h" | "1 hour" => Ok(Self::Sixty),
            _ => Err(ValidationError::InvalidDuration(s.to_string())),
        }
    }
}

/// A request to book a meeting with one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub title: String,
    pub participant_email: String,
    /// Prepended to the description as "Scheduled by: ..." when present.
    pub organizer_name: Option<String>,
    /// Wall-clock start in the organizer zone.
    pub start: NaiveDateTime,
    pub duration: MeetingDuration,
    pub description: String,
}

impl AppointmentRequest {
    /// Creates a request with an empty description and no organizer name.
    pub fn new(
        title: impl Into<String>,
        participant_email: impl Into<String>,
        start: NaiveDateTime,
        duration: MeetingDuration,
    ) -> Self {
        Self {
            title: title.into(),
            participant_email: participant_email.into(),
            organizer_name: None,
            start,
            duration,
            description: String::new(),
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the organizer name.
    pub fn with_organizer(mut self, name: impl Into<String>) -> Self {
        self.organizer_name = Some(name.into());
        self
    }

    /// Wall-clock end, `start + duration`.
    pub fn end(&self) -> NaiveDateTime {
        self.start + self.duration.as_duration()
    }
}

/// A request to put a task on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub all_day: bool,
    /// Required when `all_day` is false, ignored otherwise.
    pub due_time: Option<NaiveTime>,
}

impl TaskRequest {
    /// Creates an all-day task.
    pub fn all_day(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date,
            all_day: true,
            due_time: None,
        }
    }

    /// Creates a timed task.
    pub fn timed(title: impl Into<String>, due_date: NaiveDate, due_time: NaiveTime) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date,
            all_day: false,
            due_time: Some(due_time),
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A plain-text email with one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailRequest {
    /// Creates a new email request.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}
