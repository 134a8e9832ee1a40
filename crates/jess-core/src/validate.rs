//! Submission validation.
//!
//! Everything here runs before any remote call. A submission that passes
//! [`Submission::validate`] can be handed to the request builders, which do
//! not re-check their input.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

use crate::request::{AppointmentRequest, EmailRequest, Submission, TaskRequest};
use crate::time::OrganizerZone;

/// Bare address: `local@domain`, no whitespace, exactly one `@`.
static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s<>]+@[^@\s<>]+$").expect("Invalid address regex"));

/// Display form: `Name <local@domain>`.
static NAMED_ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^<>\r\n]*<([^@\s<>]+@[^@\s<>]+)>$").expect("Invalid named address regex")
});

/// A submission was rejected before reaching the provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A field that should hold an email address does not.
    #[error("{field} is not a valid email address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    /// A header-bound field contains a line break.
    #[error("{0} must be a single line")]
    MultiLine(&'static str),

    /// The duration is not one of the selectable lengths.
    #[error("unsupported duration {0:?} (expected 15 minutes, 30 minutes or 1 hour)")]
    InvalidDuration(String),

    /// A timed task was submitted without a time.
    #[error("due time is required for a task that is not all-day")]
    MissingDueTime,

    /// The zone name is not a known IANA zone.
    #[error("unknown time zone {0:?}")]
    UnknownTimeZone(String),

    /// The wall-clock time does not map to exactly one instant.
    #[error("{local} does not exist or is ambiguous in {zone}")]
    AmbiguousLocalTime { local: NaiveDateTime, zone: String },
}

impl Submission {
    /// Checks required fields, address shapes and zone mapping.
    pub fn validate(&self, zone: &OrganizerZone) -> Result<(), ValidationError> {
        match self {
            Self::BookAppointment(req) => req.validate(zone),
            Self::AddTask(req) => req.validate(zone),
            Self::SendEmail(req) => req.validate(),
        }
    }
}

impl AppointmentRequest {
    /// Validates an appointment against the organizer zone.
    pub fn validate(&self, zone: &OrganizerZone) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        single_line("title", &self.title)?;
        require("participant email", &self.participant_email)?;
        address("participant email", &self.participant_email)?;
        if let Some(ref name) = self.organizer_name {
            single_line("organizer name", name)?;
        }
        zone.localize(self.start)?;
        zone.localize(self.end())?;
        Ok(())
    }
}

impl TaskRequest {
    /// Validates a task against the organizer zone.
    pub fn validate(&self, zone: &OrganizerZone) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        single_line("title", &self.title)?;
        if self.all_day {
            return Ok(());
        }
        let time = self.due_time.ok_or(ValidationError::MissingDueTime)?;
        let start = self.due_date.and_time(time);
        zone.localize(start)?;
        zone.localize(start + chrono::Duration::hours(1))?;
        Ok(())
    }
}

impl EmailRequest {
    /// Validates addresses and headers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("from", &self.from)?;
        require("to", &self.to)?;
        require("subject", &self.subject)?;
        single_line("from", &self.from)?;
        single_line("to", &self.to)?;
        single_line("subject", &self.subject)?;
        address("from", &self.from)?;
        address("to", &self.to)?;
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn single_line(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.contains(['\r', '\n']) {
        Err(ValidationError::MultiLine(field))
    } else {
        Ok(())
    }
}

/// The address itself must be ASCII; only a display name may carry other
/// characters, since the message builder encodes it.
fn address(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let addr_spec = if ADDRESS_REGEX.is_match(value) {
        Some(value)
    } else {
        NAMED_ADDRESS_REGEX
            .captures(value)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    };
    match addr_spec {
        Some(addr) if addr.is_ascii() => Ok(()),
        _ => Err(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MeetingDuration;
    use chrono::{NaiveDate, NaiveTime};

    fn zone() -> OrganizerZone {
        "America/New_York".parse().unwrap()
    }

    fn nine_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn appointment() -> AppointmentRequest {
        AppointmentRequest::new("Sync", "guest@example.com", nine_am(), MeetingDuration::Thirty)
    }

    #[test]
    fn valid_appointment_passes() {
        assert!(appointment().validate(&zone()).is_ok());
    }

    #[test]
    fn appointment_requires_title() {
        let mut req = appointment();
        req.title = "   ".to_string();
        assert_eq!(
            req.validate(&zone()).unwrap_err(),
            ValidationError::MissingField("title")
        );
    }

    #[test]
    fn appointment_rejects_bad_participant() {
        let mut req = appointment();
        req.participant_email = "not an address".to_string();
        assert!(matches!(
            req.validate(&zone()).unwrap_err(),
            ValidationError::InvalidAddress { field: "participant email", .. }
        ));
    }

    #[test]
    fn appointment_rejects_nonexistent_local_time() {
        let mut req = appointment();
        req.start = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 15, 0)
            .unwrap();
        assert!(matches!(
            req.validate(&zone()).unwrap_err(),
            ValidationError::AmbiguousLocalTime { .. }
        ));
    }

    #[test]
    fn timed_task_requires_time() {
        let mut task = TaskRequest::all_day("Taxes", nine_am().date());
        assert!(task.validate(&zone()).is_ok());

        task.all_day = false;
        assert_eq!(
            task.validate(&zone()).unwrap_err(),
            ValidationError::MissingDueTime
        );

        task.due_time = NaiveTime::from_hms_opt(14, 0, 0);
        assert!(task.validate(&zone()).is_ok());
    }

    #[test]
    fn all_day_task_ignores_time() {
        // A nonexistent wall-clock time is irrelevant for all-day tasks.
        let mut task = TaskRequest::all_day("Taxes", NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        task.due_time = NaiveTime::from_hms_opt(2, 30, 0);
        assert!(task.validate(&zone()).is_ok());
    }

    #[test]
    fn email_accepts_named_address() {
        let req = EmailRequest::new("Jess <jess@example.com>", "a@b.com", "Hi", "Test");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn email_address_itself_must_be_ascii() {
        let named = EmailRequest::new("Zoë <zoe@example.com>", "a@b.com", "Hi", "Test");
        assert!(named.validate().is_ok());

        let bare = EmailRequest::new("zoë@example.com", "a@b.com", "Hi", "Test");
        assert!(matches!(
            bare.validate().unwrap_err(),
            ValidationError::InvalidAddress { field: "from", .. }
        ));

        let bracketed = EmailRequest::new("me@x.com", "Zoë <zoë@example.com>", "Hi", "Test");
        assert!(matches!(
            bracketed.validate().unwrap_err(),
            ValidationError::InvalidAddress { field: "to", .. }
        ));
    }

    #[test]
    fn email_rejects_header_injection() {
        let req = EmailRequest::new("me@x.com", "a@b.com", "Hi\r\nBcc: evil@x.com", "Test");
        assert_eq!(req.validate().unwrap_err(), ValidationError::MultiLine("subject"));
    }

    #[test]
    fn email_requires_recipient() {
        let req = EmailRequest::new("me@x.com", "", "Hi", "Test");
        assert_eq!(req.validate().unwrap_err(), ValidationError::MissingField("to"));
    }

    #[test]
    fn email_body_may_be_empty() {
        let req = EmailRequest::new("me@x.com", "a@b.com", "Hi", "");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn submission_validate_dispatches() {
        let sub = Submission::SendEmail(EmailRequest::new("me@x.com", "nope", "Hi", "Test"));
        assert!(matches!(
            sub.validate(&zone()).unwrap_err(),
            ValidationError::InvalidAddress { field: "to", .. }
        ));
    }
}
