use std::collections::HashMap;

use quml_core::model::{Question, QuestionId};

/// What sits at a position of the canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestionSlot<'a> {
    Loaded(&'a Question),
    /// Part of the session but not fetched yet.
    Pending,
    OutOfRange,
}

impl<'a> QuestionSlot<'a> {
    #[must_use]
    pub fn loaded(self) -> Option<&'a Question> {
        match self {
            QuestionSlot::Loaded(q) => Some(q),
            QuestionSlot::Pending | QuestionSlot::OutOfRange => None,
        }
    }
}

/// Deduplicated question set kept in canonical order, whatever order batches
/// arrive in.
#[derive(Debug, Clone, Default)]
pub struct QuestionStore {
    canonical: Vec<QuestionId>,
    rank: HashMap<QuestionId, usize>,
    held: Vec<Question>,
}

impl QuestionStore {
    /// Start an empty store targeting `canonical_ids`.
    #[must_use]
    pub fn initialize(canonical_ids: Vec<QuestionId>) -> Self {
        let rank = canonical_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            canonical: canonical_ids,
            rank,
            held: Vec::new(),
        }
    }

    #[must_use]
    pub fn canonical_ids(&self) -> &[QuestionId] {
        &self.canonical
    }

    /// Number of positions in the session.
    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.held.len()
    }

    /// Held questions, canonical order, no placeholders.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.held
    }

    /// Union `batch` into the held set and restore canonical order.
    ///
    /// Questions already held win over incoming duplicates, and ids outside
    /// the canonical list are dropped. An empty batch is a no-op.
    pub fn merge(&mut self, batch: Vec<Question>) -> &[Question] {
        if batch.is_empty() {
            return &self.held;
        }

        let mut added = 0_usize;
        for question in batch {
            if !self.rank.contains_key(question.id()) {
                tracing::debug!(question_id = %question.id(), "ignoring question outside session");
                continue;
            }
            if self.held.iter().any(|q| q.id() == question.id()) {
                continue;
            }
            self.held.push(question);
            added += 1;
        }

        let rank = &self.rank;
        self.held
            .sort_by_key(|q| rank.get(q.id()).copied().unwrap_or(usize::MAX));
        tracing::debug!(added, held = self.held.len(), "merged question batch");
        &self.held
    }

    /// Question at canonical `index` (0-based).
    #[must_use]
    pub fn get(&self, index: usize) -> QuestionSlot<'_> {
        let Some(id) = self.canonical.get(index) else {
            return QuestionSlot::OutOfRange;
        };
        self.find(id).map_or(QuestionSlot::Pending, QuestionSlot::Loaded)
    }

    #[must_use]
    pub fn find(&self, id: &QuestionId) -> Option<&Question> {
        self.held.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn is_loaded(&self, index: usize) -> bool {
        matches!(self.get(index), QuestionSlot::Loaded(_))
    }

    /// Set `is_answer_shown` on the question at `index`. Returns false when it
    /// is not loaded.
    pub fn mark_answer_shown(&mut self, index: usize) -> bool {
        let Some(id) = self.canonical.get(index) else {
            return false;
        };
        match self.held.iter_mut().find(|q| q.id() == id) {
            Some(question) => {
                question.mark_answer_shown();
                true
            }
            None => false,
        }
    }
}
