use serde::Serialize;

use quml_core::model::{NavigationMode, QuestionId, SessionId};
use quml_core::scoring::ScoreResult;

use super::fetch::LoadFailure;

/// Where the learner is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "page", content = "index", rename_all = "kebab-case")]
pub enum Page {
    Start,
    /// 1-based question position.
    Question(usize),
    ScoreBoard,
    End,
}

impl Page {
    /// Numeric position: 0 for the start page, 1..=N for questions, N+1 for
    /// the score board and end page.
    #[must_use]
    pub fn position(self, question_count: usize) -> usize {
        match self {
            Page::Start => 0,
            Page::Question(i) => i,
            Page::ScoreBoard | Page::End => question_count + 1,
        }
    }

    #[must_use]
    pub fn question_index(self) -> Option<usize> {
        match self {
            Page::Question(i) => i.checked_sub(1),
            Page::Start | Page::ScoreBoard | Page::End => None,
        }
    }
}

/// Navigation request held while feedback is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "kebab-case")]
pub enum NavAction {
    Next,
    Previous,
    /// Target position (0 = start page).
    Jump(usize),
}

/// Why an action did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    AtStart,
    SessionEnded,
    NotEnded,
    OutOfRange { target: usize },
    LinearNavigation,
    AnswerRequired,
    SubmitRequired,
    NotOnScoreBoard,
    NotOnQuestion,
    FeedbackShowing,
    LoadPaused,
    QuestionPending,
    SolutionsUnavailable,
    NotSubjective,
}

/// Result of a user or timer action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum NavOutcome {
    Moved { from: Page, to: Page },
    /// The answer was graded and feedback is on screen; navigation resumes
    /// after the feedback delay or on the next action.
    FeedbackShown { result: ScoreResult },
    /// Accepted, with no page change.
    Updated,
    /// Repeated terminal transition; nothing happened.
    Ignored,
    Rejected { reason: RejectReason },
}

impl NavOutcome {
    #[must_use]
    pub fn rejected(reason: RejectReason) -> Self {
        NavOutcome::Rejected { reason }
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, NavOutcome::Rejected { .. })
    }
}

/// Feedback currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackView {
    pub position: usize,
    pub result: ScoreResult,
    pub auto_advance: bool,
}

/// Read-only snapshot for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionState {
    pub session_id: SessionId,
    pub page: Page,
    pub position: usize,
    pub question_count: usize,
    pub current_question_id: Option<QuestionId>,
    pub question_pending: bool,
    pub show_start_page: bool,
    pub end_reached: bool,
    pub requires_submit: bool,
    pub navigation_mode: NavigationMode,
    pub answer_pending: bool,
    pub feedback: Option<FeedbackView>,
    pub solution_open: bool,
    pub info_popup: bool,
    pub load_failure: Option<LoadFailure>,
    pub score: f64,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub total_time_ms: u64,
    pub warning_time_ms: Option<u64>,
}
