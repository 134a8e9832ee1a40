//! WorkspaceClient trait definition.
//!
//! This module defines [`WorkspaceClient`], the capability set the flows need
//! from a hosted calendar/mail provider: a free/busy query, event insertion
//! and message sending.

use std::future::Future;
use std::pin::Pin;

use jess_core::{Confirmation, EmailPayload, EventPayload, TimeWindow};

use crate::error::{RemoteError, RemoteResult};

/// The calendar every action writes to.
pub const PRIMARY_CALENDAR: &str = "primary";

/// A free/busy lookup for one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBusyQuery {
    /// Calendar to check, usually [`PRIMARY_CALENDAR`].
    pub calendar_id: String,
    /// The `[time_min, time_max)` range.
    pub window: TimeWindow,
    /// IANA zone the response should be expressed in.
    pub time_zone: Option<String>,
}

impl FreeBusyQuery {
    /// Creates a query for the given calendar and window.
    pub fn new(calendar_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window,
            time_zone: None,
        }
    }

    /// Builder method to set the response time zone.
    pub fn with_time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the entry point can hand a
/// `&dyn WorkspaceClient` to the flows.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote calendar and mail operations.
///
/// One instance is created by the process entry point and passed to the
/// flows. Implementations own their authenticated session.
pub trait WorkspaceClient: Send + Sync {
    /// Returns the name of this client (e.g. "google:default").
    fn name(&self) -> &str;

    /// Returns the busy intervals of a calendar within the query window.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on network or auth failures, and when the
    /// provider reports the calendar itself could not be read.
    fn query_free_busy(&self, query: FreeBusyQuery) -> BoxFuture<'_, RemoteResult<Vec<TimeWindow>>>;

    /// Inserts an event and returns its id and link.
    ///
    /// When `notify_attendees` is set, the provider emails invitations.
    fn insert_event(
        &self,
        calendar_id: &str,
        event: EventPayload,
        notify_attendees: bool,
    ) -> BoxFuture<'_, RemoteResult<Confirmation>>;

    /// Sends an encoded message and returns its id.
    fn send_email(&self, payload: EmailPayload) -> BoxFuture<'_, RemoteResult<Confirmation>>;

    /// Checks if the client holds usable credentials.
    fn is_authenticated(&self) -> bool;
}

/// A client that fails every call with the same error.
///
/// Stands in for the real client when it could not be constructed, so the
/// front end can still report the reason per submission.
#[derive(Debug)]
pub struct ErrorClient {
    name: String,
    error: RemoteError,
}

impl ErrorClient {
    /// Creates a new error client.
    pub fn new(name: impl Into<String>, error: RemoteError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn fail<T: Send + 'static>(&self) -> BoxFuture<'_, RemoteResult<T>> {
        let error =
            RemoteError::new(self.error.code(), self.error.message()).with_provider(&self.name);
        Box::pin(async move { Err(error) })
    }
}

impl WorkspaceClient for ErrorClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_free_busy(&self, _query: FreeBusyQuery) -> BoxFuture<'_, RemoteResult<Vec<TimeWindow>>> {
        self.fail()
    }

    fn insert_event(
        &self,
        _calendar_id: &str,
        _event: EventPayload,
        _notify_attendees: bool,
    ) -> BoxFuture<'_, RemoteResult<Confirmation>> {
        self.fail()
    }

    fn send_email(&self, _payload: EmailPayload) -> BoxFuture<'_, RemoteResult<Confirmation>> {
        self.fail()
    }

    fn is_authenticated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteErrorCode;
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 13, 30, 0).unwrap(),
        )
    }

    #[test]
    fn free_busy_query_builder() {
        let query = FreeBusyQuery::new(PRIMARY_CALENDAR, window()).with_time_zone("America/New_York");
        assert_eq!(query.calendar_id, "primary");
        assert_eq!(query.window, window());
        assert_eq!(query.time_zone, Some("America/New_York".to_string()));
    }

    #[tokio::test]
    async fn error_client_fails_every_call() {
        let client = ErrorClient::new("google", RemoteError::configuration("no credentials"));
        assert_eq!(client.name(), "google");
        assert!(!client.is_authenticated());

        let err = client
            .query_free_busy(FreeBusyQuery::new(PRIMARY_CALENDAR, window()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), RemoteErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("google"));

        let payload = EmailPayload {
            raw: String::new(),
        };
        let err = client.send_email(payload).await.unwrap_err();
        assert_eq!(err.message(), "no credentials");
    }
}
