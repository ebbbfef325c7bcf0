//! Answer scoring: exact, partial, or ungraded outcomes from a question's
//! response declaration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::model::{
    Answer, BaseType, MappingEntry, OptionValue, Question, QuestionId, QuestionType,
    ResponseDeclaration,
};

/// Tolerance used when comparing a score against the attainable maximum.
const SCORE_EPSILON: f64 = 1e-9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("question {0} has no response declaration")]
    MissingResponseDeclaration(QuestionId),

    #[error("question {id}: response declaration is for {declared}, question is {actual}")]
    DeclarationMismatch {
        id: QuestionId,
        declared: QuestionType,
        actual: QuestionType,
    },

    #[error("question {id}: answer cardinality does not fit a {expected} question")]
    CardinalityMismatch {
        id: QuestionId,
        expected: QuestionType,
    },
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Wrong,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub outcome: Outcome,
    pub score: f64,
}

impl ScoreResult {
    #[must_use]
    pub fn new(outcome: Outcome, score: f64) -> Self {
        Self { outcome, score }
    }
}

/// What the engine concluded about a submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Graded(ScoreResult),
    /// Subjective responses are never auto-scored.
    Ungraded,
}

//
// ─── MULTI-SELECT COMBINERS ────────────────────────────────────────────────────
//

/// Strategy turning a multi-select submission into a score.
///
/// Implementations must only award credit for values that have an explicit
/// mapping entry.
pub trait ScoreCombiner: Send + Sync + fmt::Debug {
    fn combine(
        &self,
        submitted: &BTreeSet<OptionValue>,
        mapping: &[MappingEntry],
        base_type: BaseType,
        max_attainable: f64,
    ) -> f64;
}

/// Sums the mapped score of every submitted value, capped at the maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumCombiner;

impl ScoreCombiner for SumCombiner {
    fn combine(
        &self,
        submitted: &BTreeSet<OptionValue>,
        mapping: &[MappingEntry],
        base_type: BaseType,
        max_attainable: f64,
    ) -> f64 {
        let sum: f64 = mapping
            .iter()
            .filter(|entry| submitted.iter().any(|v| base_type.matches(&entry.response, v)))
            .map(|entry| entry.score)
            .sum();
        sum.clamp(0.0, max_attainable.max(0.0))
    }
}

/// Full credit only when exactly the positively mapped values were submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllOrNothingCombiner;

impl ScoreCombiner for AllOrNothingCombiner {
    fn combine(
        &self,
        submitted: &BTreeSet<OptionValue>,
        mapping: &[MappingEntry],
        base_type: BaseType,
        max_attainable: f64,
    ) -> f64 {
        let expected: Vec<&OptionValue> = mapping
            .iter()
            .filter(|entry| entry.score > 0.0)
            .map(|entry| &entry.response)
            .collect();
        if expected.is_empty() {
            return 0.0;
        }
        let all_expected = expected
            .iter()
            .all(|e| submitted.iter().any(|v| base_type.matches(e, v)));
        let nothing_extra = submitted
            .iter()
            .all(|v| expected.iter().any(|e| base_type.matches(e, v)));
        if all_expected && nothing_extra {
            max_attainable.max(0.0)
        } else {
            0.0
        }
    }
}

/// Configurable choice of combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiSelectScoring {
    #[default]
    Sum,
    AllOrNothing,
}

impl MultiSelectScoring {
    #[must_use]
    pub fn combiner(self) -> Arc<dyn ScoreCombiner> {
        match self {
            MultiSelectScoring::Sum => Arc::new(SumCombiner),
            MultiSelectScoring::AllOrNothing => Arc::new(AllOrNothingCombiner),
        }
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Stateless scorer. Cloning shares the combiner.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    combiner: Arc<dyn ScoreCombiner>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(MultiSelectScoring::default())
    }
}

impl ScoringEngine {
    #[must_use]
    pub fn new(strategy: MultiSelectScoring) -> Self {
        Self {
            combiner: strategy.combiner(),
        }
    }

    /// Use a custom multi-select combiner.
    #[must_use]
    pub fn with_combiner(combiner: Arc<dyn ScoreCombiner>) -> Self {
        Self { combiner }
    }

    /// Score `answer` against `question`'s response declaration.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::MissingResponseDeclaration` when a choice question
    /// has no declaration, `DeclarationMismatch` when the declaration variant does
    /// not match the question type, and `CardinalityMismatch` when the answer
    /// shape does not fit the question type.
    pub fn score(&self, question: &Question, answer: &Answer) -> Result<Verdict, ScoringError> {
        let id = question.id();
        let qtype = question.question_type();
        if qtype == QuestionType::Subjective {
            return Ok(Verdict::Ungraded);
        }

        let decl = question
            .response_declaration()
            .ok_or_else(|| ScoringError::MissingResponseDeclaration(id.clone()))?;
        if decl.question_type() != qtype {
            return Err(ScoringError::DeclarationMismatch {
                id: id.clone(),
                declared: decl.question_type(),
                actual: qtype,
            });
        }

        let result = match (decl, answer) {
            (
                ResponseDeclaration::SingleChoice {
                    correct_value,
                    base_type,
                    outcome_score,
                    max_score,
                    mapping,
                },
                Answer::Single(value),
            ) => score_single(
                correct_value,
                *base_type,
                *outcome_score,
                max_score.or(question.max_score()),
                mapping,
                value,
            ),
            (
                ResponseDeclaration::MultipleChoice {
                    base_type,
                    max_score,
                    mapping,
                },
                Answer::Multiple(values),
            ) => {
                let max_attainable = multi_max(*max_score, question.max_score(), mapping);
                let score = self
                    .combiner
                    .combine(values, mapping, *base_type, max_attainable);
                ScoreResult::new(classify(score, max_attainable), score)
            }
            _ => {
                return Err(ScoringError::CardinalityMismatch {
                    id: id.clone(),
                    expected: qtype,
                });
            }
        };

        Ok(Verdict::Graded(result))
    }
}

/// Highest score a question can award. Subjective questions count their
/// declared max score, or nothing.
#[must_use]
pub fn max_attainable(question: &Question) -> f64 {
    match question.response_declaration() {
        Some(ResponseDeclaration::SingleChoice {
            outcome_score,
            max_score,
            mapping,
            ..
        }) => {
            let correct = outcome_score
                .filter(|s| *s > 0.0)
                .or(max_score.or(question.max_score()).filter(|s| *s > 0.0))
                .unwrap_or(1.0);
            mapping.iter().map(|e| e.score).fold(correct, f64::max)
        }
        Some(ResponseDeclaration::MultipleChoice {
            max_score, mapping, ..
        }) => multi_max(*max_score, question.max_score(), mapping),
        Some(ResponseDeclaration::Subjective) | None => question.max_score().unwrap_or(0.0),
    }
}

fn multi_max(declared: Option<f64>, question_max: Option<f64>, mapping: &[MappingEntry]) -> f64 {
    declared
        .or(question_max)
        .filter(|m| *m > 0.0)
        .unwrap_or_else(|| mapping.iter().map(|e| e.score.max(0.0)).sum())
}

fn score_single(
    correct_value: &OptionValue,
    base_type: BaseType,
    outcome_score: Option<f64>,
    max_score: Option<f64>,
    mapping: &[MappingEntry],
    submitted: &OptionValue,
) -> ScoreResult {
    if base_type.matches(correct_value, submitted) {
        let score = outcome_score
            .filter(|s| *s > 0.0)
            .or(max_score.filter(|s| *s > 0.0))
            .unwrap_or(1.0);
        return ScoreResult::new(Outcome::Correct, score);
    }

    let mapped = mapping
        .iter()
        .find(|entry| base_type.matches(&entry.response, submitted))
        .map_or(0.0, |entry| entry.score.max(0.0));
    if mapped > 0.0 {
        ScoreResult::new(Outcome::Partial, mapped)
    } else {
        ScoreResult::new(Outcome::Wrong, 0.0)
    }
}

fn classify(score: f64, max_attainable: f64) -> Outcome {
    if score <= SCORE_EPSILON {
        Outcome::Wrong
    } else if score + SCORE_EPSILON >= max_attainable {
        Outcome::Correct
    } else {
        Outcome::Partial
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, QuestionId};

    fn question(qtype: QuestionType, decl: Option<ResponseDeclaration>) -> Question {
        QuestionDraft {
            id: QuestionId::new("q1"),
            ordinal: 1,
            question_type: qtype,
            body: String::new(),
            options: Vec::new(),
            response_declaration: decl,
            media: Vec::new(),
            solutions: Vec::new(),
            max_score: None,
            is_answer_shown: false,
        }
        .validate()
        .unwrap()
    }

    fn entry(response: &str, score: f64) -> MappingEntry {
        MappingEntry {
            response: response.into(),
            score,
        }
    }

    fn single(mapping: Vec<MappingEntry>) -> Question {
        question(
            QuestionType::SingleChoice,
            Some(ResponseDeclaration::SingleChoice {
                correct_value: "2".into(),
                base_type: BaseType::Integer,
                outcome_score: None,
                max_score: Some(5.0),
                mapping,
            }),
        )
    }

    fn multi(base_type: BaseType) -> Question {
        question(
            QuestionType::MultipleChoice,
            Some(ResponseDeclaration::MultipleChoice {
                base_type,
                max_score: Some(5.0),
                mapping: vec![entry("A", 2.0), entry("B", 3.0)],
            }),
        )
    }

    fn graded(v: Verdict) -> ScoreResult {
        match v {
            Verdict::Graded(r) => r,
            Verdict::Ungraded => panic!("expected graded verdict"),
        }
    }

    #[test]
    fn single_choice_correct_uses_max_score() {
        let engine = ScoringEngine::default();
        let r = graded(engine.score(&single(Vec::new()), &Answer::single("2")).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Correct, 5.0));
    }

    #[test]
    fn single_choice_wrong_without_mapping_scores_zero() {
        let engine = ScoringEngine::default();
        let r = graded(engine.score(&single(Vec::new()), &Answer::single("3")).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Wrong, 0.0));
    }

    #[test]
    fn single_choice_mapped_wrong_answer_is_partial() {
        let engine = ScoringEngine::default();
        let q = single(vec![entry("3", 2.0)]);
        let r = graded(engine.score(&q, &Answer::single("3")).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Partial, 2.0));
    }

    #[test]
    fn single_choice_outcome_score_wins_then_defaults_to_one() {
        let engine = ScoringEngine::default();
        let q = question(
            QuestionType::SingleChoice,
            Some(ResponseDeclaration::SingleChoice {
                correct_value: "1".into(),
                base_type: BaseType::Integer,
                outcome_score: Some(3.0),
                max_score: Some(5.0),
                mapping: Vec::new(),
            }),
        );
        let r = graded(engine.score(&q, &Answer::single("1")).unwrap());
        assert_eq!(r.score, 3.0);

        let q = question(
            QuestionType::SingleChoice,
            Some(ResponseDeclaration::SingleChoice {
                correct_value: "1".into(),
                base_type: BaseType::Integer,
                outcome_score: None,
                max_score: None,
                mapping: Vec::new(),
            }),
        );
        let r = graded(engine.score(&q, &Answer::single("1")).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Correct, 1.0));
    }

    #[test]
    fn multi_select_sum_partial_correct_and_wrong() {
        let engine = ScoringEngine::default();
        let q = multi(BaseType::String);

        let r = graded(engine.score(&q, &Answer::multiple(["A"])).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Partial, 2.0));

        let r = graded(engine.score(&q, &Answer::multiple(["A", "B"])).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Correct, 5.0));

        let r = graded(
            engine
                .score(&q, &Answer::multiple(Vec::<&str>::new()))
                .unwrap(),
        );
        assert_eq!(r, ScoreResult::new(Outcome::Wrong, 0.0));
    }

    #[test]
    fn multi_select_ignores_unmapped_values() {
        let engine = ScoringEngine::default();
        let r = graded(
            engine
                .score(&multi(BaseType::String), &Answer::multiple(["C", "B"]))
                .unwrap(),
        );
        assert_eq!(r, ScoreResult::new(Outcome::Partial, 3.0));
    }

    #[test]
    fn all_or_nothing_combiner() {
        let engine = ScoringEngine::new(MultiSelectScoring::AllOrNothing);
        let q = multi(BaseType::String);

        let r = graded(engine.score(&q, &Answer::multiple(["A"])).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Wrong, 0.0));

        let r = graded(engine.score(&q, &Answer::multiple(["A", "B"])).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Correct, 5.0));

        let r = graded(engine.score(&q, &Answer::multiple(["A", "B", "C"])).unwrap());
        assert_eq!(r.outcome, Outcome::Wrong);
    }

    #[test]
    fn max_attainable_falls_back_to_mapping_sum() {
        let engine = ScoringEngine::default();
        let q = question(
            QuestionType::MultipleChoice,
            Some(ResponseDeclaration::MultipleChoice {
                base_type: BaseType::String,
                max_score: None,
                mapping: vec![entry("A", 1.0), entry("B", 1.0)],
            }),
        );
        let r = graded(engine.score(&q, &Answer::multiple(["A", "B"])).unwrap());
        assert_eq!(r, ScoreResult::new(Outcome::Correct, 2.0));
    }

    #[test]
    fn max_attainable_per_question_type() {
        assert_eq!(max_attainable(&single(Vec::new())), 5.0);
        assert_eq!(max_attainable(&multi(BaseType::String)), 5.0);
        assert_eq!(
            max_attainable(&question(QuestionType::Subjective, None)),
            0.0
        );
    }

    #[test]
    fn subjective_is_never_graded() {
        let engine = ScoringEngine::default();
        let q = question(QuestionType::Subjective, None);
        let v = engine.score(&q, &Answer::Text("essay".into())).unwrap();
        assert_eq!(v, Verdict::Ungraded);
    }

    #[test]
    fn missing_declaration_is_an_error() {
        let engine = ScoringEngine::default();
        let q = question(QuestionType::SingleChoice, None);
        let err = engine.score(&q, &Answer::single("1")).unwrap_err();
        assert_eq!(
            err,
            ScoringError::MissingResponseDeclaration(QuestionId::new("q1"))
        );
    }

    #[test]
    fn wrong_answer_shape_is_an_error() {
        let engine = ScoringEngine::default();
        let err = engine
            .score(&single(Vec::new()), &Answer::multiple(["2"]))
            .unwrap_err();
        assert!(matches!(err, ScoringError::CardinalityMismatch { .. }));
    }
}
