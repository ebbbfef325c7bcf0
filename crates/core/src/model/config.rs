use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{QuestionId, SectionId};
use crate::scoring::MultiSelectScoring;

/// Per-question allowance used when no total time limit is configured.
pub const DEFAULT_TIME_PER_QUESTION_MS: u64 = 350_000;
/// Questions fetched per batch.
pub const DEFAULT_THRESHOLD: usize = 3;
/// How long graded feedback stays up before auto-advancing.
pub const DEFAULT_FEEDBACK_DISPLAY_MS: u64 = 4_000;
/// How long the "answer required" popup stays up.
pub const DEFAULT_INFO_POPUP_MS: u64 = 2_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("session has no questions")]
    NoQuestions,

    #[error("duplicate question id in session: {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("batch threshold must be > 0")]
    InvalidThreshold,

    #[error("max questions must be > 0")]
    InvalidMaxQuestions,

    #[error("total time limit must be > 0")]
    InvalidTotalTime,

    #[error("warning time ({warning_ms}ms) must be below total time ({total_ms}ms)")]
    WarningAfterTotal { warning_ms: u64, total_ms: u64 },

    #[error("feedback display duration must be > 0")]
    InvalidFeedbackDuration,

    #[error("info popup duration must be > 0")]
    InvalidInfoPopupDuration,

    #[error("max score must be finite and non-negative")]
    InvalidMaxScore,

    #[error("question order must be a permutation of the configured ids")]
    NotAPermutation,
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavigationMode {
    #[default]
    Linear,
    NonLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeLimits {
    #[serde(default)]
    pub total_ms: Option<u64>,
    #[serde(default)]
    pub warning_ms: Option<u64>,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

fn default_true() -> bool {
    true
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

fn default_feedback_display_ms() -> u64 {
    DEFAULT_FEEDBACK_DISPLAY_MS
}

fn default_info_popup_ms() -> u64 {
    DEFAULT_INFO_POPUP_MS
}

fn default_total_ms(question_count: usize) -> u64 {
    u64::try_from(question_count)
        .unwrap_or(u64::MAX)
        .saturating_mul(DEFAULT_TIME_PER_QUESTION_MS)
}

/// Session configuration as read from the player config (TOML/JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfigDraft {
    pub section_id: Option<SectionId>,
    pub question_ids: Vec<QuestionId>,
    pub navigation_mode: NavigationMode,
    #[serde(default = "default_true")]
    pub show_feedback: bool,
    #[serde(default = "default_true")]
    pub show_solutions: bool,
    pub requires_submit: bool,
    #[serde(default = "default_true")]
    pub allow_skip: bool,
    #[serde(default = "default_true")]
    pub show_start_page: bool,
    pub shuffle: bool,
    pub max_questions: Option<usize>,
    pub max_score: Option<f64>,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    pub time_limits: TimeLimits,
    #[serde(default = "default_feedback_display_ms")]
    pub feedback_display_ms: u64,
    #[serde(default = "default_info_popup_ms")]
    pub info_popup_ms: u64,
    pub multi_select_scoring: MultiSelectScoring,
}

impl Default for SessionConfigDraft {
    fn default() -> Self {
        Self {
            section_id: None,
            question_ids: Vec::new(),
            navigation_mode: NavigationMode::Linear,
            show_feedback: true,
            show_solutions: true,
            requires_submit: false,
            allow_skip: true,
            show_start_page: true,
            shuffle: false,
            max_questions: None,
            max_score: None,
            threshold: DEFAULT_THRESHOLD,
            time_limits: TimeLimits::default(),
            feedback_display_ms: DEFAULT_FEEDBACK_DISPLAY_MS,
            info_popup_ms: DEFAULT_INFO_POPUP_MS,
            multi_select_scoring: MultiSelectScoring::default(),
        }
    }
}

impl SessionConfigDraft {
    /// Draft with defaults for the given question order.
    #[must_use]
    pub fn with_questions<I, Q>(ids: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<QuestionId>,
    {
        Self {
            question_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Validate and normalize the draft.
    ///
    /// `max_questions` truncation is applied here, so the validated id list is
    /// the one the session plays.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an empty or duplicated id list, a zero batch
    /// threshold, malformed time limits, or non-positive display durations.
    pub fn validate(self) -> Result<SessionConfig, ConfigError> {
        let mut question_ids = self.question_ids;
        if let Some(max) = self.max_questions {
            if max == 0 {
                return Err(ConfigError::InvalidMaxQuestions);
            }
            question_ids.truncate(max);
        }
        if question_ids.is_empty() {
            return Err(ConfigError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(question_ids.len());
        for id in &question_ids {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateQuestionId(id.clone()));
            }
        }

        if self.threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        if self.time_limits.total_ms == Some(0) {
            return Err(ConfigError::InvalidTotalTime);
        }
        if let Some(warning_ms) = self.time_limits.warning_ms {
            let total_ms = self
                .time_limits
                .total_ms
                .unwrap_or_else(|| default_total_ms(question_ids.len()));
            if warning_ms >= total_ms {
                return Err(ConfigError::WarningAfterTotal {
                    warning_ms,
                    total_ms,
                });
            }
        }
        if self.feedback_display_ms == 0 {
            return Err(ConfigError::InvalidFeedbackDuration);
        }
        if self.info_popup_ms == 0 {
            return Err(ConfigError::InvalidInfoPopupDuration);
        }
        if self.max_score.is_some_and(|s| !s.is_finite() || s < 0.0) {
            return Err(ConfigError::InvalidMaxScore);
        }

        Ok(SessionConfig {
            section_id: self.section_id,
            question_ids,
            navigation_mode: self.navigation_mode,
            show_feedback: self.show_feedback,
            show_solutions: self.show_solutions,
            requires_submit: self.requires_submit,
            allow_skip: self.allow_skip,
            show_start_page: self.show_start_page,
            shuffle: self.shuffle,
            max_score: self.max_score,
            threshold: self.threshold,
            time_limits: self.time_limits,
            feedback_display_ms: self.feedback_display_ms,
            info_popup_ms: self.info_popup_ms,
            multi_select_scoring: self.multi_select_scoring,
        })
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Validated, read-once configuration for a session.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SessionConfig {
    section_id: Option<SectionId>,
    question_ids: Vec<QuestionId>,
    navigation_mode: NavigationMode,
    show_feedback: bool,
    show_solutions: bool,
    requires_submit: bool,
    allow_skip: bool,
    show_start_page: bool,
    shuffle: bool,
    max_score: Option<f64>,
    threshold: usize,
    time_limits: TimeLimits,
    feedback_display_ms: u64,
    info_popup_ms: u64,
    multi_select_scoring: MultiSelectScoring,
}

impl SessionConfig {
    // Accessors
    #[must_use]
    pub fn section_id(&self) -> Option<&SectionId> {
        self.section_id.as_ref()
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_ids.len()
    }

    #[must_use]
    pub fn navigation_mode(&self) -> NavigationMode {
        self.navigation_mode
    }

    #[must_use]
    pub fn is_linear(&self) -> bool {
        self.navigation_mode == NavigationMode::Linear
    }

    #[must_use]
    pub fn show_feedback(&self) -> bool {
        self.show_feedback
    }

    #[must_use]
    pub fn show_solutions(&self) -> bool {
        self.show_solutions
    }

    #[must_use]
    pub fn requires_submit(&self) -> bool {
        self.requires_submit
    }

    #[must_use]
    pub fn allow_skip(&self) -> bool {
        self.allow_skip
    }

    #[must_use]
    pub fn show_start_page(&self) -> bool {
        self.show_start_page
    }

    /// When true the canonical order is permuted once at session start.
    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    #[must_use]
    pub fn max_score(&self) -> Option<f64> {
        self.max_score
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn time_limits(&self) -> TimeLimits {
        self.time_limits
    }

    /// Hard duration limit, defaulting to 350 s per question.
    #[must_use]
    pub fn total_time_ms(&self) -> u64 {
        self.time_limits
            .total_ms
            .unwrap_or_else(|| default_total_ms(self.question_ids.len()))
    }

    #[must_use]
    pub fn warning_time_ms(&self) -> Option<u64> {
        self.time_limits.warning_ms
    }

    #[must_use]
    pub fn feedback_display_ms(&self) -> u64 {
        self.feedback_display_ms
    }

    #[must_use]
    pub fn info_popup_ms(&self) -> u64 {
        self.info_popup_ms
    }

    #[must_use]
    pub fn multi_select_scoring(&self) -> MultiSelectScoring {
        self.multi_select_scoring
    }

    /// Replace the play order with a permutation of the same ids.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotAPermutation` (leaving the order untouched)
    /// if `ids` adds, drops or repeats an id.
    pub fn set_question_order(&mut self, ids: Vec<QuestionId>) -> Result<(), ConfigError> {
        let mut current: Vec<&QuestionId> = self.question_ids.iter().collect();
        let mut proposed: Vec<&QuestionId> = ids.iter().collect();
        current.sort();
        proposed.sort();
        if current != proposed {
            return Err(ConfigError::NotAPermutation);
        }
        self.question_ids = ids;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<QuestionId> {
        (1..=n).map(|i| QuestionId::new(format!("q{i}"))).collect()
    }

    #[test]
    fn defaults_match_player_behaviour() {
        let config = SessionConfigDraft::with_questions(ids(3)).validate().unwrap();
        assert!(config.is_linear());
        assert!(config.show_feedback());
        assert!(config.allow_skip());
        assert!(config.show_start_page());
        assert!(!config.requires_submit());
        assert_eq!(config.threshold(), 3);
        assert_eq!(config.feedback_display_ms(), 4_000);
        assert_eq!(config.info_popup_ms(), 2_000);
        assert_eq!(config.total_time_ms(), 3 * 350_000);
        assert_eq!(config.warning_time_ms(), None);
    }

    #[test]
    fn rejects_empty_and_duplicate_ids() {
        let err = SessionConfigDraft::default().validate().unwrap_err();
        assert_eq!(err, ConfigError::NoQuestions);

        let err = SessionConfigDraft::with_questions(["a", "b", "a"].map(QuestionId::new))
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateQuestionId(QuestionId::new("a")));
    }

    #[test]
    fn max_questions_truncates() {
        let mut draft = SessionConfigDraft::with_questions(ids(5));
        draft.max_questions = Some(2);
        let config = draft.validate().unwrap();
        assert_eq!(config.question_ids(), &ids(2)[..]);
    }

    #[test]
    fn rejects_malformed_time_limits() {
        let mut draft = SessionConfigDraft::with_questions(ids(2));
        draft.time_limits.total_ms = Some(0);
        assert_eq!(draft.validate().unwrap_err(), ConfigError::InvalidTotalTime);

        let mut draft = SessionConfigDraft::with_questions(ids(2));
        draft.time_limits = TimeLimits {
            total_ms: Some(10_000),
            warning_ms: Some(10_000),
        };
        assert!(matches!(
            draft.validate().unwrap_err(),
            ConfigError::WarningAfterTotal { .. }
        ));
    }

    #[test]
    fn warning_is_checked_against_default_total() {
        let mut draft = SessionConfigDraft::with_questions(ids(1));
        draft.time_limits = TimeLimits {
            total_ms: None,
            warning_ms: Some(5_000_000),
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            ConfigError::WarningAfterTotal {
                warning_ms: 5_000_000,
                total_ms: 350_000,
            }
        );

        let mut draft = SessionConfigDraft::with_questions(ids(2));
        draft.time_limits.warning_ms = Some(60_000);
        assert_eq!(draft.validate().unwrap().warning_time_ms(), Some(60_000));
    }

    #[test]
    fn question_order_accepts_only_permutations() {
        let mut config = SessionConfigDraft::with_questions(ids(3)).validate().unwrap();
        let reversed: Vec<QuestionId> = ids(3).into_iter().rev().collect();
        config.set_question_order(reversed.clone()).unwrap();
        assert_eq!(config.question_ids(), &reversed[..]);

        let duplicated = vec![QuestionId::new("q1"), QuestionId::new("q1"), QuestionId::new("q2")];
        assert_eq!(
            config.set_question_order(duplicated),
            Err(ConfigError::NotAPermutation)
        );
        let foreign = vec![QuestionId::new("q1"), QuestionId::new("q2"), QuestionId::new("zz")];
        assert_eq!(
            config.set_question_order(foreign),
            Err(ConfigError::NotAPermutation)
        );
        assert_eq!(config.question_ids(), &reversed[..]);
    }

    #[test]
    fn rejects_zero_threshold_and_durations() {
        let mut draft = SessionConfigDraft::with_questions(ids(2));
        draft.threshold = 0;
        assert_eq!(draft.validate().unwrap_err(), ConfigError::InvalidThreshold);

        let mut draft = SessionConfigDraft::with_questions(ids(2));
        draft.feedback_display_ms = 0;
        assert_eq!(
            draft.validate().unwrap_err(),
            ConfigError::InvalidFeedbackDuration
        );
    }

    #[test]
    fn explicit_total_time_wins() {
        let mut draft = SessionConfigDraft::with_questions(ids(2));
        draft.time_limits.total_ms = Some(60_000);
        let config = draft.validate().unwrap();
        assert_eq!(config.total_time_ms(), 60_000);
    }
}
