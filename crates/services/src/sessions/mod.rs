mod controller;
mod fetch;
mod signals;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::NavigationController;
pub use fetch::{FetchCursor, FetchWindow, LoadFailure};
pub use signals::{SessionResult, Signal, TelemetryKind, events};
pub use state::{FeedbackView, NavAction, NavOutcome, Page, RejectReason, SessionState};
pub use workflow::SessionRunner;
