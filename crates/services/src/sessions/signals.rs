use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quml_core::model::QuestionId;
use quml_core::progress::ProgressSummary;

use super::fetch::{FetchWindow, LoadFailure};

/// Telemetry event names.
pub mod events {
    pub const QUESTION_VIEWED: &str = "question-viewed";
    pub const NEXT_CLICKED: &str = "next-clicked";
    pub const PREVIOUS_CLICKED: &str = "previous-clicked";
    pub const JUMP_CLICKED: &str = "jump-clicked";
    pub const OPTION_SELECTED: &str = "option-selected";
    pub const TRY_AGAIN_CLICKED: &str = "try-again-clicked";
    pub const SUBMIT_CLICKED: &str = "submit-clicked";
    pub const REPLAY_CLICKED: &str = "replay-clicked";
    pub const SOLUTION_VIEWED: &str = "solution-viewed";
    pub const SOLUTION_CLOSED: &str = "solution-closed";
    pub const ANSWER_SHOWN: &str = "answer-shown";
    pub const SCORE_BOARD_VIEWED: &str = "score-board-viewed";
    pub const END_PAGE_VIEWED: &str = "end-page-viewed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    Impression,
    Interact,
}

/// Frozen outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub score: f64,
    /// Configured max score, else the sum over questions loaded by the end
    /// of the session.
    pub max_score: f64,
    pub summary: ProgressSummary,
    pub duration_ms: u64,
    /// True when the session ended because time ran out.
    pub duration_ended: bool,
    /// Position the learner was at when the session ended.
    pub position: usize,
}

/// Values pushed by the controller for renderers and telemetry sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
pub enum Signal {
    Telemetry {
        name: &'static str,
        kind: TelemetryKind,
        position: usize,
    },
    CurrentQuestionChanged {
        position: usize,
        question_id: Option<QuestionId>,
    },
    FetchRequested(FetchWindow),
    LoadFailed {
        failure: LoadFailure,
    },
    TimeWarning {
        remaining_ms: u64,
    },
    InfoPopup {
        until: DateTime<Utc>,
    },
    SessionEnded(SessionResult),
}
