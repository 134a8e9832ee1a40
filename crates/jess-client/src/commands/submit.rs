//! The three form commands: `book`, `task` and `email`.
//!
//! Each turns its arguments into a [`Submission`], hands it to the
//! [`Dispatcher`] and renders the [`SubmissionResult`].

use jess_core::{
    AppointmentRequest, EmailRequest, OrganizerZone, Submission, SubmissionResult, TaskRequest,
};
use jess_providers::{Dispatcher, WorkspaceClient};

use crate::cli::{BookArgs, EmailArgs, TaskArgs};
use crate::config::ClientConfig;

/// Exit status for a slot that overlaps busy time.
pub const EXIT_CONFLICT: u8 = 2;

pub fn appointment(args: BookArgs, config: &ClientConfig) -> Submission {
    let mut req = AppointmentRequest::new(args.title, args.participant, args.at, args.duration)
        .with_description(args.description);
    if let Some(name) = args
        .organizer
        .or_else(|| config.calendar.organizer_name.clone())
    {
        req = req.with_organizer(name);
    }
    Submission::BookAppointment(req)
}

/// Neither `--time` nor `--all-day` leaves a timed task without a time;
/// validation reports it.
pub fn task(args: TaskArgs) -> Submission {
    let req = match (args.all_day, args.time) {
        (false, Some(time)) => TaskRequest::timed(args.title, args.due, time),
        (true, _) => TaskRequest::all_day(args.title, args.due),
        (false, None) => TaskRequest {
            all_day: false,
            ..TaskRequest::all_day(args.title, args.due)
        },
    };
    Submission::AddTask(req.with_description(args.description))
}

pub fn email(args: EmailArgs, config: &ClientConfig) -> Submission {
    let from = args
        .from
        .or_else(|| config.email.from.clone())
        .unwrap_or_default();
    Submission::SendEmail(EmailRequest::new(from, args.to, args.subject, args.body))
}

/// Runs one submission against the injected client.
pub async fn run(
    client: &dyn WorkspaceClient,
    zone: OrganizerZone,
    submission: &Submission,
) -> SubmissionResult {
    Dispatcher::new(client, zone).submit_for_display(submission).await
}

/// Text shown for a result: the one-line message, plus the busy
/// intervals of a conflict in the organizer zone.
pub fn render(result: &SubmissionResult, zone: &OrganizerZone) -> String {
    let mut out = result.message();
    if let SubmissionResult::Conflict { busy } = result {
        for window in busy {
            let start = window.start.with_timezone(&zone.tz());
            let end = window.end.with_timezone(&zone.tz());
            out.push_str(&format!(
                "\n  busy {} - {}",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%H:%M %Z")
            ));
        }
    }
    out
}

pub fn render_json(result: &SubmissionResult) -> String {
    // SubmissionResult only holds strings, ids and timestamps.
    serde_json::to_string_pretty(result).unwrap_or_else(|e| {
        format!(r#"{{"status": "failure", "message": "could not serialize result: {e}"}}"#)
    })
}

/// Process exit status: 0 on success, 2 on conflict, 1 on failure.
pub fn exit_code(result: &SubmissionResult) -> u8 {
    match result {
        SubmissionResult::Success { .. } => 0,
        SubmissionResult::Conflict { .. } => EXIT_CONFLICT,
        SubmissionResult::Failure { .. } => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use jess_core::{Action, MeetingDuration, TimeWindow, ValidationError};
    use jess_providers::{ErrorClient, RemoteError};

    fn zone() -> OrganizerZone {
        "America/New_York".parse().unwrap()
    }

    fn book_args(organizer: Option<&str>) -> BookArgs {
        BookArgs {
            title: "Intro call".into(),
            participant: "guest@example.com".into(),
            at: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            duration: MeetingDuration::Thirty,
            description: String::new(),
            organizer: organizer.map(str::to_string),
        }
    }

    #[test]
    fn organizer_falls_back_to_config() {
        let mut config = ClientConfig::default();
        config.calendar.organizer_name = Some("Jess".into());

        let Submission::BookAppointment(req) = appointment(book_args(None), &config) else {
            panic!("expected appointment");
        };
        assert_eq!(req.organizer_name.as_deref(), Some("Jess"));

        let Submission::BookAppointment(req) = appointment(book_args(Some("Sam")), &config) else {
            panic!("expected appointment");
        };
        assert_eq!(req.organizer_name.as_deref(), Some("Sam"));
    }

    #[test]
    fn task_without_time_or_all_day_fails_validation() {
        let submission = task(TaskArgs {
            title: "Call bank".into(),
            due: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            time: None,
            all_day: false,
            description: String::new(),
        });
        assert_eq!(
            submission.validate(&zone()),
            Err(ValidationError::MissingDueTime)
        );
    }

    #[test]
    fn email_from_defaults_to_config() {
        let mut config = ClientConfig::default();
        config.email.from = Some("jess@example.com".into());
        let args = EmailArgs {
            to: "a@b.com".into(),
            subject: "Hi".into(),
            body: "Test".into(),
            from: None,
        };
        let Submission::SendEmail(req) = email(args, &config) else {
            panic!("expected email");
        };
        assert_eq!(req.from, "jess@example.com");
    }

    #[tokio::test]
    async fn remote_failure_renders_reason_and_fails() {
        let client = ErrorClient::new(
            "google:default",
            RemoteError::authentication("not signed in to Google; run `jess auth google`"),
        );
        let submission = appointment(book_args(None), &ClientConfig::default());
        let result = run(&client, zone(), &submission).await;

        assert_eq!(
            result,
            SubmissionResult::Failure {
                action: Action::BookAppointment,
                message: "not signed in to Google; run `jess auth google`".into(),
            }
        );
        assert_eq!(exit_code(&result), 1);
    }

    #[test]
    fn conflict_lists_busy_time_in_zone() {
        let result = SubmissionResult::Conflict {
            busy: vec![TimeWindow::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 13, 15, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 6, 1, 13, 45, 0).unwrap(),
            )],
        };
        let text = render(&result, &zone());
        assert!(text.ends_with("busy 2024-06-01 09:15 - 09:45 EDT"));
        assert_eq!(exit_code(&result), EXIT_CONFLICT);
    }

    #[test]
    fn json_output_is_tagged() {
        let result = SubmissionResult::Failure {
            action: Action::SendEmail,
            message: "quota".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&render_json(&result)).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["action"], "send_email");
    }
}
