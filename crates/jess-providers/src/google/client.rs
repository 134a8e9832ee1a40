//! HTTP calls to the Calendar v3 and Gmail v1 REST APIs.
//!
//! [`GoogleApiClient`] holds one bearer token and makes single requests. It
//! knows nothing about refresh; the session swaps the token in when it
//! changes.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jess_core::{Confirmation, EmailPayload, EventPayload, TimeWindow};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RemoteError, RemoteResult};
use crate::workspace::FreeBusyQuery;

use super::config::GoogleConfig;

/// Google Calendar and Gmail client for one access token.
#[derive(Debug)]
pub struct GoogleApiClient {
    http: reqwest::Client,
    access_token: String,
    calendar_base: String,
    gmail_base: String,
    mailbox: String,
}

impl GoogleApiClient {
    pub fn new(access_token: impl Into<String>, config: &GoogleConfig) -> RemoteResult<Self> {
        Self::with_timeout(access_token, config, config.timeout)
    }

    fn with_timeout(
        access_token: impl Into<String>,
        config: &GoogleConfig,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RemoteError::internal("failed to build HTTP client").with_source(e))?;
        Ok(Self {
            http,
            access_token: access_token.into(),
            calendar_base: config.calendar_api_base.clone(),
            gmail_base: config.gmail_api_base.clone(),
            mailbox: config.mailbox.clone(),
        })
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// `POST /freeBusy` for a single calendar.
    ///
    /// A per-calendar error in an otherwise successful response (unknown
    /// calendar, no access) fails the whole query rather than reading as
    /// "no busy time".
    pub async fn query_free_busy(&self, query: &FreeBusyQuery) -> RemoteResult<Vec<TimeWindow>> {
        let url = format!("{}/freeBusy", self.calendar_base);
        let body = FreeBusyRequest {
            time_min: query.window.start,
            time_max: query.window.end,
            time_zone: query.time_zone.as_deref(),
            items: vec![FreeBusyItem {
                id: &query.calendar_id,
            }],
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        let response: FreeBusyResponse = read_json(response).await?;

        let calendar = response
            .calendars
            .get(&query.calendar_id)
            .ok_or_else(|| {
                RemoteError::invalid_response(format!(
                    "free/busy response has no entry for calendar {}",
                    query.calendar_id
                ))
            })?;

        if let Some(error) = calendar.errors.first() {
            let message = format!(
                "free/busy failed for calendar {}: {}",
                query.calendar_id, error.reason
            );
            return Err(match error.reason.as_str() {
                "notFound" => RemoteError::not_found(message),
                _ => RemoteError::authorization(message),
            });
        }

        let mut busy = Vec::with_capacity(calendar.busy.len());
        for period in &calendar.busy {
            if period.end < period.start {
                return Err(RemoteError::invalid_response(format!(
                    "busy period ends before it starts: {} - {}",
                    period.start, period.end
                )));
            }
            busy.push(TimeWindow::new(period.start, period.end));
        }
        debug!(calendar = %query.calendar_id, busy = busy.len(), "free/busy answered");
        Ok(busy)
    }

    /// `POST /calendars/{id}/events`.
    ///
    /// `sendUpdates=all` makes Google email the invitations.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventPayload,
        notify_attendees: bool,
    ) -> RemoteResult<Confirmation> {
        let url = format!(
            "{}/calendars/{}/events",
            self.calendar_base,
            urlencoding::encode(calendar_id)
        );
        let send_updates = if notify_attendees { "all" } else { "none" };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("sendUpdates", send_updates)])
            .json(event)
            .send()
            .await
            .map_err(request_error)?;
        let created: InsertedEvent = read_json(response).await?;

        let confirmation = Confirmation::new(created.id);
        Ok(match created.html_link {
            Some(link) => confirmation.with_link(link),
            None => confirmation,
        })
    }

    /// `POST /users/{mailbox}/messages/send`.
    pub async fn send_message(&self, payload: &EmailPayload) -> RemoteResult<Confirmation> {
        let url = format!(
            "{}/users/{}/messages/send",
            self.gmail_base,
            urlencoding::encode(&self.mailbox)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;
        let sent: SentMessage = read_json(response).await?;
        Ok(Confirmation::new(sent.id))
    }
}

fn request_error(e: reqwest::Error) -> RemoteError {
    let message = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    RemoteError::network(message).with_source(e)
}

/// Maps a non-2xx status plus Google's error body to a [`RemoteError`],
/// keeping Google's own message text.
fn status_error(status: StatusCode, body: &str, retry_after: Option<&str>) -> RemoteError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let reason = parsed
        .as_ref()
        .and_then(|e| e.error.errors.first())
        .map(|d| d.reason.as_str())
        .unwrap_or_default();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status {
        StatusCode::BAD_REQUEST => RemoteError::bad_request(message),
        StatusCode::UNAUTHORIZED => RemoteError::authentication(message),
        StatusCode::FORBIDDEN
            if matches!(reason, "rateLimitExceeded" | "userRateLimitExceeded") =>
        {
            RemoteError::rate_limited(message)
        }
        StatusCode::FORBIDDEN => RemoteError::authorization(message),
        StatusCode::NOT_FOUND => RemoteError::not_found(message),
        StatusCode::TOO_MANY_REQUESTS => match retry_after {
            Some(secs) => RemoteError::rate_limited(format!("{message} (retry after {secs}s)")),
            None => RemoteError::rate_limited(message),
        },
        s if s.is_server_error() => RemoteError::server(message),
        _ => RemoteError::invalid_response(message),
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> RemoteResult<T> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .text()
        .await
        .map_err(|e| RemoteError::network("failed to read response body").with_source(e))?;

    if !status.is_success() {
        let error = status_error(status, &body, retry_after.as_deref());
        warn!(status = status.as_u16(), code = %error.code(), "Google API error");
        return Err(error);
    }

    serde_json::from_str(&body).map_err(|e| {
        RemoteError::invalid_response("could not parse Google API response").with_source(e)
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<&'a str>,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertedEvent {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteErrorCode;
    use crate::google::config::OAuthCredentials;
    use chrono::{NaiveDate, TimeZone};
    use jess_core::{
        AppointmentRequest, EmailRequest, MeetingDuration, OrganizerZone, build_appointment_event,
        build_email_payload,
    };
    use mockito::Matcher;
    use serde_json::json;

    fn client(server: &mockito::Server) -> GoogleApiClient {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "jess.apps.googleusercontent.com",
            "secret",
        ))
        .with_api_base(server.url());
        GoogleApiClient::with_timeout("test_token", &config, Duration::from_secs(5)).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 13, 30, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn free_busy_parses_busy_periods() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendar/v3/freeBusy")
            .match_header("authorization", "Bearer test_token")
            .match_body(Matcher::PartialJson(json!({
                "timeMin": "2024-06-01T13:00:00Z",
                "timeMax": "2024-06-01T13:30:00Z",
                "timeZone": "America/New_York",
                "items": [{"id": "primary"}],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "kind": "calendar#freeBusy",
                    "calendars": {
                        "primary": {
                            "busy": [
                                {"start": "2024-06-01T09:15:00-04:00", "end": "2024-06-01T09:45:00-04:00"}
                            ]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let query = FreeBusyQuery::new("primary", window()).with_time_zone("America/New_York");
        let busy = client(&server).query_free_busy(&query).await.unwrap();
        assert_eq!(
            busy,
            vec![TimeWindow::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 13, 15, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 1, 13, 45, 0).unwrap(),
            )]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn free_busy_calendar_error_is_not_empty_busy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calendar/v3/freeBusy")
            .with_status(200)
            .with_body(
                json!({
                    "calendars": {
                        "primary": {"busy": [], "errors": [{"domain": "global", "reason": "notFound"}]}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server)
            .query_free_busy(&FreeBusyQuery::new("primary", window()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), RemoteErrorCode::NotFound);
        assert!(err.message().contains("notFound"));
    }

    #[tokio::test]
    async fn insert_event_sends_updates_and_returns_link() {
        let mut server = mockito::Server::new_async().await;
        let zone: OrganizerZone = "America/New_York".parse().unwrap();
        let req = AppointmentRequest::new(
            "Intro call",
            "guest@example.com",
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            MeetingDuration::Thirty,
        );
        let event = build_appointment_event(&req, &zone);

        let mock = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::UrlEncoded("sendUpdates".into(), "all".into()))
            .match_body(Matcher::PartialJson(json!({
                "summary": "Intro call",
                "start": {"dateTime": "2024-06-01T09:00:00", "timeZone": "America/New_York"},
                "attendees": [{"email": "guest@example.com"}],
            })))
            .with_status(200)
            .with_body(r#"{"id": "evt123", "htmlLink": "https://www.google.com/calendar/event?eid=evt123", "status": "confirmed"}"#)
            .create_async()
            .await;

        let confirmation = client(&server)
            .insert_event("primary", &event, true)
            .await
            .unwrap();
        assert_eq!(confirmation.id, "evt123");
        assert_eq!(
            confirmation.html_link.as_deref(),
            Some("https://www.google.com/calendar/event?eid=evt123")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_message_posts_raw() {
        let mut server = mockito::Server::new_async().await;
        let payload = build_email_payload(&EmailRequest::new(
            "me@example.com",
            "a@b.com",
            "Hi",
            "Test",
        ));
        let mock = server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .match_body(Matcher::Json(json!({"raw": payload.raw})))
            .with_status(200)
            .with_body(r#"{"id": "msg42", "threadId": "thr1", "labelIds": ["SENT"]}"#)
            .create_async()
            .await;

        let confirmation = client(&server).send_message(&payload).await.unwrap();
        assert_eq!(confirmation, Confirmation::new("msg42"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_body_message_is_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .with_status(403)
            .with_body(
                json!({
                    "error": {
                        "code": 403,
                        "message": "Request had insufficient authentication scopes.",
                        "errors": [{"reason": "insufficientPermissions"}],
                        "status": "PERMISSION_DENIED"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server)
            .send_message(&EmailPayload { raw: "eA".into() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), RemoteErrorCode::AuthorizationFailed);
        assert_eq!(
            err.message(),
            "Request had insufficient authentication scopes."
        );
    }

    #[test]
    fn status_mapping() {
        let quota = r#"{"error": {"message": "Rate Limit Exceeded", "errors": [{"reason": "rateLimitExceeded"}]}}"#;
        assert_eq!(
            status_error(StatusCode::FORBIDDEN, quota, None).code(),
            RemoteErrorCode::RateLimited
        );
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, "", None).code(),
            RemoteErrorCode::AuthenticationFailed
        );
        assert_eq!(status_error(StatusCode::UNAUTHORIZED, "", None).message(), "HTTP 401");
        assert_eq!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "<html>", None).code(),
            RemoteErrorCode::ServerError
        );
        assert_eq!(
            status_error(
                StatusCode::BAD_REQUEST,
                r#"{"error": {"message": "Invalid attendee email."}}"#,
                None
            )
            .message(),
            "Invalid attendee email."
        );
        assert_eq!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "", Some("30")).message(),
            "HTTP 429 (retry after 30s)"
        );
    }
}
