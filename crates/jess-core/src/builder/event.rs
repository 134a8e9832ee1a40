//! Calendar event resources.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::request::{AppointmentRequest, TaskRequest};
use crate::time::{OrganizerZone, TimeWindow};
use crate::validate::ValidationError;

/// Prefix line added to an appointment description when the organizer gave a name.
pub const SCHEDULED_BY_PREFIX: &str = "Scheduled by: ";

/// Length of a timed task.
const TASK_LENGTH_MINUTES: i64 = 60;

/// The subset of a calendar event resource this application writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

/// Start or end of an event.
///
/// All-day events carry only a date; timed events carry a wall-clock
/// datetime plus the IANA zone it is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum EventDateTime {
    /// `{"date": "2024-06-01"}`
    Date { date: NaiveDate },
    /// `{"dateTime": "2024-06-01T09:00:00", "timeZone": "America/New_York"}`
    Zoned {
        date_time: NaiveDateTime,
        time_zone: String,
    },
}

impl EventDateTime {
    /// Creates a zoned wall-clock value.
    pub fn zoned(date_time: NaiveDateTime, zone: &OrganizerZone) -> Self {
        Self::Zoned {
            date_time,
            time_zone: zone.name().to_string(),
        }
    }

    /// Returns the date for all-day values.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date { date } => Some(*date),
            Self::Zoned { .. } => None,
        }
    }

    /// Returns the wall-clock datetime for zoned values.
    pub fn date_time(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Zoned { date_time, .. } => Some(*date_time),
            Self::Date { .. } => None,
        }
    }

    /// Returns the zone name for zoned values.
    pub fn time_zone(&self) -> Option<&str> {
        match self {
            Self::Zoned { time_zone, .. } => Some(time_zone),
            Self::Date { .. } => None,
        }
    }
}

/// An invited attendee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

/// Builds the event for an appointment.
///
/// `end = start + duration`, both in the organizer zone. The participant is
/// the only attendee.
pub fn build_appointment_event(req: &AppointmentRequest, zone: &OrganizerZone) -> EventPayload {
    EventPayload {
        summary: req.title.clone(),
        description: appointment_description(req),
        start: EventDateTime::zoned(req.start, zone),
        end: EventDateTime::zoned(req.end(), zone),
        attendees: vec![Attendee {
            email: req.participant_email.trim().to_string(),
        }],
    }
}

/// Builds the event for a task.
///
/// All-day tasks span `[due_date, due_date + 1)` and ignore any time.
/// Timed tasks span one hour from the due date and time. A timed task
/// without a time never passes validation; here it falls back to all-day.
pub fn build_task_event(req: &TaskRequest, zone: &OrganizerZone) -> EventPayload {
    let (start, end) = match req.due_time.filter(|_| !req.all_day) {
        Some(time) => {
            let start = req.due_date.and_time(time);
            let end = start + Duration::minutes(TASK_LENGTH_MINUTES);
            (
                EventDateTime::zoned(start, zone),
                EventDateTime::zoned(end, zone),
            )
        }
        None => {
            // NaiveDate::MAX is the only date without a successor.
            let next = req.due_date.succ_opt().unwrap_or(req.due_date);
            (
                EventDateTime::Date { date: req.due_date },
                EventDateTime::Date { date: next },
            )
        }
    };

    EventPayload {
        summary: req.title.clone(),
        description: req.description.clone(),
        start,
        end,
        attendees: Vec::new(),
    }
}

/// The absolute `[start, end)` slot an appointment occupies.
pub fn appointment_window(
    req: &AppointmentRequest,
    zone: &OrganizerZone,
) -> Result<TimeWindow, ValidationError> {
    let start = zone.localize(req.start)?;
    let end = zone.localize(req.end())?;
    Ok(TimeWindow::from_zoned(&start, &end))
}

fn appointment_description(req: &AppointmentRequest) -> String {
    match req.organizer_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            format!("{SCHEDULED_BY_PREFIX}{name}\n\n{}", req.description)
        }
        _ => req.description.clone(),
    }
}
