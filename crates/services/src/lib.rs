#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod question_store;
pub mod sessions;
pub mod timer;

pub use quml_core::Clock;
pub use sessions as session;

pub use config::{load_session_config, parse_session_config};
pub use error::{ConfigLoadError, SessionError};
pub use question_store::{QuestionSlot, QuestionStore};
pub use timer::{Scheduled, TimerController, TimerEvent};

pub use sessions::{
    LoadFailure, NavOutcome, NavigationController, Page, RejectReason, SessionResult,
    SessionRunner, SessionState, Signal,
};
