use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Answer, QuestionTag};
use crate::scoring::Outcome;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Unattempted,
    Skipped,
    Attempted,
    Correct,
    Wrong,
    Partial,
}

impl ProgressStatus {
    /// Terminal statuses carry an authoritative score.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProgressStatus::Correct | ProgressStatus::Wrong | ProgressStatus::Partial
        )
    }

    /// Neither answered nor graded.
    #[must_use]
    pub fn is_untouched(self) -> bool {
        matches!(self, ProgressStatus::Unattempted | ProgressStatus::Skipped)
    }
}

impl From<Outcome> for ProgressStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Correct => ProgressStatus::Correct,
            Outcome::Wrong => ProgressStatus::Wrong,
            Outcome::Partial => ProgressStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub status: ProgressStatus,
    pub score: f64,
    pub option_value: Option<Answer>,
    pub tag: Option<QuestionTag>,
}

impl ProgressEntry {
    fn initial(status: ProgressStatus) -> Self {
        Self {
            status,
            score: 0.0,
            option_value: None,
            tag: None,
        }
    }
}

/// Per-status counts for the section summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub unattempted: usize,
    pub skipped: usize,
    pub attempted: usize,
    pub correct: usize,
    pub wrong: usize,
    pub partial: usize,
}

impl ProgressSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.unattempted + self.skipped + self.attempted + self.correct + self.wrong + self.partial
    }
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Ordered status ledger, one entry per question in canonical order.
///
/// Transition legality is the caller's responsibility; the tracker only
/// checks that the index exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTracker {
    entries: Vec<ProgressEntry>,
    initial_status: ProgressStatus,
    records_option_values: bool,
}

impl ProgressTracker {
    /// Create `len` entries.
    ///
    /// With feedback enabled entries start `Unattempted`; otherwise they start
    /// `Skipped` and submitted option values are kept on the entries.
    #[must_use]
    pub fn new(len: usize, show_feedback: bool) -> Self {
        let initial_status = if show_feedback {
            ProgressStatus::Unattempted
        } else {
            ProgressStatus::Skipped
        };
        Self {
            entries: vec![ProgressEntry::initial(initial_status); len],
            initial_status,
            records_option_values: !show_feedback,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ProgressEntry> {
        self.entries.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn initial_status(&self) -> ProgressStatus {
        self.initial_status
    }

    /// Overwrite an entry's status, and its score when one is given.
    ///
    /// `option` is only stored when the tracker records option values.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::IndexOutOfRange` if `index` has no entry.
    pub fn update(
        &mut self,
        index: usize,
        status: ProgressStatus,
        score: Option<f64>,
        option: Option<Answer>,
    ) -> Result<(), ProgressError> {
        let records = self.records_option_values;
        let entry = self.entry_mut(index)?;
        entry.status = status;
        if let Some(score) = score {
            entry.score = score;
        }
        if records && option.is_some() {
            entry.option_value = option;
        }
        Ok(())
    }

    /// `Unattempted` becomes `Skipped`; anything else is left alone.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::IndexOutOfRange` if `index` has no entry.
    pub fn mark_skipped_if_untouched(&mut self, index: usize) -> Result<bool, ProgressError> {
        let entry = self.entry_mut(index)?;
        if entry.status == ProgressStatus::Unattempted {
            entry.status = ProgressStatus::Skipped;
            return Ok(true);
        }
        Ok(false)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::IndexOutOfRange` if `index` has no entry.
    pub fn set_tag(&mut self, index: usize, tag: QuestionTag) -> Result<(), ProgressError> {
        self.entry_mut(index)?.tag = Some(tag);
        Ok(())
    }

    /// Sum of all entry scores; well-defined mid-session.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.score).sum()
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        let mut summary = ProgressSummary::default();
        for entry in &self.entries {
            match entry.status {
                ProgressStatus::Unattempted => summary.unattempted += 1,
                ProgressStatus::Skipped => summary.skipped += 1,
                ProgressStatus::Attempted => summary.attempted += 1,
                ProgressStatus::Correct => summary.correct += 1,
                ProgressStatus::Wrong => summary.wrong += 1,
                ProgressStatus::Partial => summary.partial += 1,
            }
        }
        summary
    }

    /// Restore every entry to the initial status with a zero score.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            *entry = ProgressEntry::initial(self.initial_status);
        }
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut ProgressEntry, ProgressError> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(ProgressError::IndexOutOfRange { index, len })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_follows_feedback_setting() {
        let with_feedback = ProgressTracker::new(2, true);
        assert!(
            with_feedback
                .entries()
                .iter()
                .all(|e| e.status == ProgressStatus::Unattempted)
        );

        let without = ProgressTracker::new(2, false);
        assert!(
            without
                .entries()
                .iter()
                .all(|e| e.status == ProgressStatus::Skipped)
        );
    }

    #[test]
    fn update_rejects_missing_index() {
        let mut tracker = ProgressTracker::new(1, true);
        let err = tracker
            .update(3, ProgressStatus::Correct, Some(1.0), None)
            .unwrap_err();
        assert_eq!(err, ProgressError::IndexOutOfRange { index: 3, len: 1 });
    }

    #[test]
    fn option_values_only_recorded_without_feedback() {
        let mut tracker = ProgressTracker::new(1, true);
        tracker
            .update(0, ProgressStatus::Correct, Some(1.0), Some(Answer::single("1")))
            .unwrap();
        assert_eq!(tracker.entries()[0].option_value, None);

        let mut tracker = ProgressTracker::new(1, false);
        tracker
            .update(0, ProgressStatus::Attempted, None, Some(Answer::single("1")))
            .unwrap();
        assert_eq!(tracker.entries()[0].option_value, Some(Answer::single("1")));
    }

    #[test]
    fn mark_skipped_only_touches_unattempted() {
        let mut tracker = ProgressTracker::new(2, true);
        tracker
            .update(1, ProgressStatus::Wrong, Some(0.0), None)
            .unwrap();
        assert!(tracker.mark_skipped_if_untouched(0).unwrap());
        assert!(!tracker.mark_skipped_if_untouched(0).unwrap());
        assert!(!tracker.mark_skipped_if_untouched(1).unwrap());
        assert_eq!(tracker.entries()[0].status, ProgressStatus::Skipped);
        assert_eq!(tracker.entries()[1].status, ProgressStatus::Wrong);
    }

    #[test]
    fn total_tracks_entry_scores_through_any_sequence() {
        let mut tracker = ProgressTracker::new(4, true);
        let steps: [(usize, ProgressStatus, Option<f64>); 6] = [
            (0, ProgressStatus::Correct, Some(5.0)),
            (1, ProgressStatus::Partial, Some(2.0)),
            (0, ProgressStatus::Wrong, Some(0.0)),
            (2, ProgressStatus::Attempted, None),
            (3, ProgressStatus::Correct, Some(1.5)),
            (1, ProgressStatus::Partial, Some(3.0)),
        ];
        for (index, status, score) in steps {
            tracker.update(index, status, score, None).unwrap();
            tracker.mark_skipped_if_untouched(2).unwrap();
            let expected: f64 = tracker.entries().iter().map(|e| e.score).sum();
            assert!((tracker.total() - expected).abs() < f64::EPSILON);
        }
        assert!((tracker.total() - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_counts_and_reset() {
        let mut tracker = ProgressTracker::new(4, true);
        tracker
            .update(0, ProgressStatus::Correct, Some(1.0), None)
            .unwrap();
        tracker
            .update(1, ProgressStatus::Partial, Some(0.5), None)
            .unwrap();
        tracker.mark_skipped_if_untouched(2).unwrap();
        tracker.set_tag(0, QuestionTag::Mcq).unwrap();

        let summary = tracker.summary();
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.unattempted, 1);
        assert_eq!(summary.total(), 4);

        tracker.reset();
        assert_eq!(tracker.total(), 0.0);
        assert_eq!(tracker.summary().unattempted, 4);
        assert_eq!(tracker.entries()[0].tag, None);
    }
}
