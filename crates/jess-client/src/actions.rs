//! Follow-up actions on a submission result.

use tracing::info;

use jess_core::SubmissionResult;

use crate::error::{ClientError, ClientResult};

/// Opens the created event in the default browser.
///
/// Only successful calendar writes carry a link; anything else is an error
/// so `--open` never silently does nothing.
pub fn open_event_link(result: &SubmissionResult) -> ClientResult<()> {
    let link = event_link(result)
        .ok_or_else(|| ClientError::Action("nothing to open: no event link in the result".into()))?;

    info!(url = %link, "opening event link");
    open::that(link).map_err(|e| ClientError::Action(format!("failed to open URL: {}", e)))
}

fn event_link(result: &SubmissionResult) -> Option<&str> {
    match result {
        SubmissionResult::Success { confirmation, .. } => confirmation.html_link.as_deref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jess_core::{Action, Confirmation};

    #[test]
    fn only_successes_with_links_are_openable() {
        let event = SubmissionResult::Success {
            action: Action::AddTask,
            confirmation: Confirmation::new("e1").with_link("https://calendar.google.com/e1"),
        };
        assert_eq!(event_link(&event), Some("https://calendar.google.com/e1"));

        let mail = SubmissionResult::Success {
            action: Action::SendEmail,
            confirmation: Confirmation::new("m1"),
        };
        assert_eq!(event_link(&mail), None);
        assert!(open_event_link(&mail).is_err());

        let conflict = SubmissionResult::Conflict { busy: vec![] };
        assert_eq!(event_link(&conflict), None);
    }
}
