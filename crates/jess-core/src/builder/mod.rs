//! Request builders.
//!
//! Pure functions that turn validated submissions into the exact shapes the
//! remote calendar and mail operations expect:
//!
//! - [`build_appointment_event`] / [`build_task_event`] - event resources
//! - [`appointment_window`] - the `[start, end)` slot checked for conflicts
//! - [`build_email_payload`] - a single-part text message, URL-safe base64
//!
//! Builders do not re-validate. Calling one twice with the same input gives
//! byte-identical output.

mod email;
mod event;

pub use email::{EmailPayload, build_email_payload, render_message};
pub use event::{
    Attendee, EventDateTime, EventPayload, SCHEDULED_BY_PREFIX, appointment_window,
    build_appointment_event, build_task_event,
};
