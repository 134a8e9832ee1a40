//! Core types: submissions, validation, request builders, tracing

pub mod builder;
pub mod outcome;
pub mod request;
pub mod time;
pub mod tracing;
pub mod validate;

pub use builder::{
    Attendee, EmailPayload, EventDateTime, EventPayload, appointment_window,
    build_appointment_event, build_email_payload, build_task_event,
};
pub use outcome::{Confirmation, SubmissionResult};
pub use request::{
    Action, AppointmentRequest, EmailRequest, MeetingDuration, Submission, TaskRequest,
};
pub use time::{OrganizerZone, TimeWindow};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use validate::ValidationError;
