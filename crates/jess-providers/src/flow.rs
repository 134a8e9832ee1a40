//! Booking flow and submission dispatch.
//!
//! Appointments go through [`BookingFlow`], a read-then-write sequence:
//!
//! ```text
//! Idle ──► CheckingAvailability ──┬─► Rejected            (busy time overlaps)
//!                 │               └─► Creating ──┬─► Created
//!                 │                              └─► Errored
//!                 └─► Errored                    (free/busy call failed)
//! ```
//!
//! Tasks and emails skip the availability check and call the client
//! directly. Nothing is retried and nothing is rolled back. There is no
//! lock on the calendar between the free/busy read and the insert, so two
//! concurrent bookings can still overlap.

use jess_core::{
    Action, AppointmentRequest, Confirmation, EmailRequest, OrganizerZone, Submission,
    SubmissionResult, TaskRequest, TimeWindow, ValidationError, appointment_window,
    build_appointment_event, build_email_payload, build_task_event,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::workspace::{FreeBusyQuery, PRIMARY_CALENDAR, WorkspaceClient};

/// Why a submission did not complete.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Rejected before any remote call.
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    /// The identity provider or workspace API failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A booking flow is single-use; `run` was called after it finished.
    #[error("booking flow already ran")]
    FlowFinished,
}

/// A completed submission: either written, or refused because of a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The event was created or the message was sent.
    Done(Confirmation),
    /// The appointment slot overlaps these busy intervals.
    Conflict(Vec<TimeWindow>),
}

/// Where a booking is in its sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingState {
    Idle,
    CheckingAvailability,
    Creating,
    /// Terminal: the event exists.
    Created(Confirmation),
    /// Terminal: the slot overlaps busy time; nothing was inserted.
    Rejected(Vec<TimeWindow>),
    /// Terminal: a remote call failed.
    Errored(String),
}

impl BookingState {
    /// Returns true for `Created`, `Rejected` and `Errored`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Created(_) | Self::Rejected(_) | Self::Errored(_)
        )
    }
}

/// Books one appointment on the primary calendar if the slot is free.
pub struct BookingFlow<'a> {
    client: &'a dyn WorkspaceClient,
    zone: OrganizerZone,
    state: BookingState,
}

impl<'a> BookingFlow<'a> {
    /// Creates an idle flow.
    pub fn new(client: &'a dyn WorkspaceClient, zone: OrganizerZone) -> Self {
        Self {
            client,
            zone,
            state: BookingState::Idle,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> &BookingState {
        &self.state
    }

    fn transition(&mut self, next: BookingState) {
        debug!(from = ?self.state, to = ?next, "booking state transition");
        self.state = next;
    }

    /// Runs the flow to a terminal state.
    ///
    /// Any busy interval overlapping `[start, end)` rejects the whole slot.
    /// The request must already be validated; a wall-clock time that does
    /// not map into the organizer zone is still reported as a
    /// [`SubmitError::Validation`] without touching the client.
    pub async fn run(&mut self, req: &AppointmentRequest) -> Result<SubmissionOutcome, SubmitError> {
        if self.state != BookingState::Idle {
            return Err(SubmitError::FlowFinished);
        }
        let slot = appointment_window(req, &self.zone)?;
        let event = build_appointment_event(req, &self.zone);

        self.transition(BookingState::CheckingAvailability);
        let query =
            FreeBusyQuery::new(PRIMARY_CALENDAR, slot.clone()).with_time_zone(self.zone.name());
        let busy = match self.client.query_free_busy(query).await {
            Ok(busy) => busy,
            Err(e) => {
                self.transition(BookingState::Errored(e.message().to_string()));
                return Err(e.into());
            }
        };

        let overlapping: Vec<TimeWindow> =
            busy.into_iter().filter(|b| b.overlaps(&slot)).collect();
        if !overlapping.is_empty() {
            warn!(
                slot = %slot,
                busy = overlapping.len(),
                "requested slot is not free"
            );
            self.transition(BookingState::Rejected(overlapping.clone()));
            return Ok(SubmissionOutcome::Conflict(overlapping));
        }

        self.transition(BookingState::Creating);
        match self
            .client
            .insert_event(PRIMARY_CALENDAR, event, true)
            .await
        {
            Ok(confirmation) => {
                info!(id = %confirmation.id, "appointment created");
                self.transition(BookingState::Created(confirmation.clone()));
                Ok(SubmissionOutcome::Done(confirmation))
            }
            Err(e) => {
                self.transition(BookingState::Errored(e.message().to_string()));
                Err(e.into())
            }
        }
    }
}

/// Routes submissions to the right remote operation.
pub struct Dispatcher<'a> {
    client: &'a dyn WorkspaceClient,
    zone: OrganizerZone,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher over an injected client.
    pub fn new(client: &'a dyn WorkspaceClient, zone: OrganizerZone) -> Self {
        Self { client, zone }
    }

    /// Validates and executes one submission.
    pub async fn submit(&self, submission: &Submission) -> Result<SubmissionOutcome, SubmitError> {
        submission.validate(&self.zone)?;
        debug!(action = %submission.action(), client = self.client.name(), "dispatching");

        match submission {
            Submission::BookAppointment(req) => {
                BookingFlow::new(self.client, self.zone).run(req).await
            }
            Submission::AddTask(req) => self.add_task(req).await,
            Submission::SendEmail(req) => self.send_email(req).await,
        }
    }

    /// Executes one submission and folds the outcome into a displayable result.
    pub async fn submit_for_display(&self, submission: &Submission) -> SubmissionResult {
        let action = submission.action();
        let result = self.submit(submission).await;
        match result {
            Err(SubmitError::Remote(ref e)) => {
                warn!(action = %action, error = %e, transient = e.is_retryable(), "submission failed");
            }
            Err(ref e) => warn!(action = %action, error = %e, "submission rejected"),
            Ok(_) => {}
        }
        into_submission_result(action, result)
    }

    async fn add_task(&self, req: &TaskRequest) -> Result<SubmissionOutcome, SubmitError> {
        let event = build_task_event(req, &self.zone);
        let confirmation = self
            .client
            .insert_event(PRIMARY_CALENDAR, event, false)
            .await?;
        info!(id = %confirmation.id, "task added");
        Ok(SubmissionOutcome::Done(confirmation))
    }

    async fn send_email(&self, req: &EmailRequest) -> Result<SubmissionOutcome, SubmitError> {
        let payload = build_email_payload(req);
        let confirmation = self.client.send_email(payload).await?;
        info!(id = %confirmation.id, "email sent");
        Ok(SubmissionOutcome::Done(confirmation))
    }
}

/// Maps a flow result to what the front end renders.
///
/// Remote failures carry only the provider's reason string.
pub fn into_submission_result(
    action: Action,
    result: Result<SubmissionOutcome, SubmitError>,
) -> SubmissionResult {
    match result {
        Ok(SubmissionOutcome::Done(confirmation)) => SubmissionResult::Success {
            action,
            confirmation,
        },
        Ok(SubmissionOutcome::Conflict(busy)) => SubmissionResult::Conflict { busy },
        Err(SubmitError::Remote(e)) => SubmissionResult::Failure {
            action,
            message: e.message().to_string(),
        },
        Err(e) => SubmissionResult::Failure {
            action,
            message: e.to_string(),
        },
    }
}
