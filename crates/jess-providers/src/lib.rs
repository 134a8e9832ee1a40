//! Remote side of jess: the [`WorkspaceClient`] capability, its Google
//! implementation and the flows that drive it.
//!
//! ```text
//! Submission ──► Dispatcher ──┬─► BookingFlow ──► free/busy ──► insert_event
//!                             ├─► insert_event        (tasks)
//!                             └─► send_email          (emails)
//!                                      │
//!                                      ▼
//!                              &dyn WorkspaceClient
//!                                      │
//!                                      ▼
//!                               GoogleSession
//! ```
//!
//! The client is constructed once by the entry point and passed down by
//! reference.

pub mod error;
pub mod flow;
#[cfg(feature = "google")]
pub mod google;
pub mod workspace;

pub use error::{RemoteError, RemoteErrorCode, RemoteResult};
pub use flow::{
    BookingFlow, BookingState, Dispatcher, SubmissionOutcome, SubmitError, into_submission_result,
};
pub use workspace::{BoxFuture, ErrorClient, FreeBusyQuery, PRIMARY_CALENDAR, WorkspaceClient};
