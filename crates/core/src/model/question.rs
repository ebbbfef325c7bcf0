use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::media::{MediaRef, Solution, SolutionKind};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question identifier cannot be empty")]
    EmptyId,

    #[error("question {id}: response declaration is for {declared}, question is {actual}")]
    DeclarationMismatch {
        id: QuestionId,
        declared: QuestionType,
        actual: QuestionType,
    },

    #[error("question {id}: duplicate option value {value}")]
    DuplicateOption { id: QuestionId, value: OptionValue },

    #[error("question {id}: scores must be finite and non-negative")]
    InvalidScore { id: QuestionId },

    #[error("question {id}: response {response} is mapped more than once")]
    DuplicateMapping {
        id: QuestionId,
        response: OptionValue,
    },
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Subjective,
}

impl QuestionType {
    /// Short tag the progress ledger uses (`MCQ` vs `SA`).
    #[must_use]
    pub fn tag(self) -> QuestionTag {
        match self {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => QuestionTag::Mcq,
            QuestionType::Subjective => QuestionTag::Sa,
        }
    }

    #[must_use]
    pub fn is_auto_scored(self) -> bool {
        !matches!(self, QuestionType::Subjective)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::Subjective => "subjective",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionTag {
    #[serde(rename = "MCQ")]
    Mcq,
    #[serde(rename = "SA")]
    Sa,
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Value carried by an interaction option; what a learner submits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionValue(String);

impl OptionValue {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OptionValue {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<i64> for OptionValue {
    fn from(raw: i64) -> Self {
        Self::new(raw.to_string())
    }
}

/// How declared and submitted values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    /// Numeric comparison; falls back to exact match when either side is not a number.
    #[default]
    Integer,
    /// Exact string match.
    String,
}

impl BaseType {
    #[must_use]
    pub fn matches(self, declared: &OptionValue, submitted: &OptionValue) -> bool {
        match self {
            BaseType::Integer => {
                match (
                    declared.as_str().trim().parse::<f64>(),
                    submitted.as_str().trim().parse::<f64>(),
                ) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => declared == submitted,
                }
            }
            BaseType::String => declared == submitted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    /// Rendered label; opaque to the engine.
    #[serde(default)]
    pub label: String,
    pub value: OptionValue,
}

//
// ─── RESPONSE DECLARATION ──────────────────────────────────────────────────────
//

/// One row of a scoring table: submitting `response` earns `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub response: OptionValue,
    pub score: f64,
}

/// Correct-answer specification, one variant per question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponseDeclaration {
    SingleChoice {
        correct_value: OptionValue,
        #[serde(default)]
        base_type: BaseType,
        /// Fixed score for the correct answer (`outcomes.SCORE`).
        #[serde(default)]
        outcome_score: Option<f64>,
        #[serde(default)]
        max_score: Option<f64>,
        /// Partial credit for specific wrong answers.
        #[serde(default)]
        mapping: Vec<MappingEntry>,
    },
    MultipleChoice {
        #[serde(default)]
        base_type: BaseType,
        #[serde(default)]
        max_score: Option<f64>,
        mapping: Vec<MappingEntry>,
    },
    Subjective,
}

impl ResponseDeclaration {
    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        match self {
            ResponseDeclaration::SingleChoice { .. } => QuestionType::SingleChoice,
            ResponseDeclaration::MultipleChoice { .. } => QuestionType::MultipleChoice,
            ResponseDeclaration::Subjective => QuestionType::Subjective,
        }
    }

    #[must_use]
    pub fn max_score(&self) -> Option<f64> {
        match self {
            ResponseDeclaration::SingleChoice { max_score, .. }
            | ResponseDeclaration::MultipleChoice { max_score, .. } => *max_score,
            ResponseDeclaration::Subjective => None,
        }
    }

    /// Partial-credit table; empty for subjective questions.
    #[must_use]
    pub fn mapping(&self) -> &[MappingEntry] {
        match self {
            ResponseDeclaration::SingleChoice { mapping, .. }
            | ResponseDeclaration::MultipleChoice { mapping, .. } => mapping,
            ResponseDeclaration::Subjective => &[],
        }
    }

    fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        let (fixed, mapping): (Vec<f64>, &[MappingEntry]) = match self {
            ResponseDeclaration::SingleChoice {
                outcome_score,
                max_score,
                mapping,
                ..
            } => (
                outcome_score.iter().chain(max_score.iter()).copied().collect(),
                mapping.as_slice(),
            ),
            ResponseDeclaration::MultipleChoice {
                max_score, mapping, ..
            } => (max_score.iter().copied().collect(), mapping.as_slice()),
            ResponseDeclaration::Subjective => (Vec::new(), &[]),
        };
        fixed.into_iter().chain(mapping.iter().map(|m| m.score))
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Wire/persisted shape of a question, validated into a `Question`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(rename = "identifier")]
    pub id: QuestionId,
    #[serde(default)]
    pub ordinal: u32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub options: Vec<InteractionOption>,
    #[serde(default)]
    pub response_declaration: Option<ResponseDeclaration>,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub solutions: Vec<Solution>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub is_answer_shown: bool,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// A missing response declaration is accepted here; it surfaces as a
    /// scoring error once the question is answered.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for a blank id, a declaration whose variant does
    /// not match the question type, duplicate option values, or invalid scores.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.id.as_str().is_empty() {
            return Err(QuestionError::EmptyId);
        }

        if let Some(decl) = &self.response_declaration {
            let declared = decl.question_type();
            if declared != self.question_type {
                return Err(QuestionError::DeclarationMismatch {
                    id: self.id,
                    declared,
                    actual: self.question_type,
                });
            }
            if decl.scores().any(|s| !s.is_finite() || s < 0.0) {
                return Err(QuestionError::InvalidScore { id: self.id });
            }
            let mut mapped = HashSet::new();
            for entry in decl.mapping() {
                if !mapped.insert(&entry.response) {
                    return Err(QuestionError::DuplicateMapping {
                        response: entry.response.clone(),
                        id: self.id,
                    });
                }
            }
        }

        if self.max_score.is_some_and(|s| !s.is_finite() || s < 0.0) {
            return Err(QuestionError::InvalidScore { id: self.id });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(option.value.clone()) {
                return Err(QuestionError::DuplicateOption {
                    value: option.value.clone(),
                    id: self.id,
                });
            }
        }

        Ok(Question {
            id: self.id,
            ordinal: self.ordinal,
            question_type: self.question_type,
            body: self.body,
            options: self.options,
            response_declaration: self.response_declaration,
            media: self.media,
            solutions: self.solutions,
            max_score: self.max_score,
            is_answer_shown: self.is_answer_shown,
        })
    }
}

impl From<&Question> for QuestionDraft {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            ordinal: q.ordinal,
            question_type: q.question_type,
            body: q.body.clone(),
            options: q.options.clone(),
            response_declaration: q.response_declaration.clone(),
            media: q.media.clone(),
            solutions: q.solutions.clone(),
            max_score: q.max_score,
            is_answer_shown: q.is_answer_shown,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A loaded assessment question. Immutable apart from `is_answer_shown`.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    ordinal: u32,
    question_type: QuestionType,
    body: String,
    options: Vec<InteractionOption>,
    response_declaration: Option<ResponseDeclaration>,
    media: Vec<MediaRef>,
    solutions: Vec<Solution>,
    max_score: Option<f64>,
    is_answer_shown: bool,
}

impl Question {
    // Accessors
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    #[must_use]
    pub fn tag(&self) -> QuestionTag {
        self.question_type.tag()
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn options(&self) -> &[InteractionOption] {
        &self.options
    }

    #[must_use]
    pub fn response_declaration(&self) -> Option<&ResponseDeclaration> {
        self.response_declaration.as_ref()
    }

    #[must_use]
    pub fn media(&self) -> &[MediaRef] {
        &self.media
    }

    #[must_use]
    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    #[must_use]
    pub fn has_solutions(&self) -> bool {
        !self.solutions.is_empty()
    }

    /// Media backing a video solution, looked up by id on this question.
    #[must_use]
    pub fn solution_media(&self, solution: &Solution) -> Option<&MediaRef> {
        if solution.kind != SolutionKind::Video {
            return None;
        }
        self.media.iter().find(|m| m.id == solution.value)
    }

    #[must_use]
    pub fn max_score(&self) -> Option<f64> {
        self.max_score
    }

    #[must_use]
    pub fn is_answer_shown(&self) -> bool {
        self.is_answer_shown
    }

    /// The only mutation permitted after load.
    pub fn mark_answer_shown(&mut self) {
        self.is_answer_shown = true;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::media::MediaKind;

    fn draft(question_type: QuestionType, decl: Option<ResponseDeclaration>) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new("do_1"),
            ordinal: 1,
            question_type,
            body: "<p>2 + 2?</p>".into(),
            options: vec![
                InteractionOption {
                    label: "3".into(),
                    value: OptionValue::from(0),
                },
                InteractionOption {
                    label: "4".into(),
                    value: OptionValue::from(1),
                },
            ],
            response_declaration: decl,
            media: Vec::new(),
            solutions: Vec::new(),
            max_score: None,
            is_answer_shown: false,
        }
    }

    fn single(correct: &str) -> ResponseDeclaration {
        ResponseDeclaration::SingleChoice {
            correct_value: OptionValue::from(correct),
            base_type: BaseType::Integer,
            outcome_score: None,
            max_score: Some(1.0),
            mapping: Vec::new(),
        }
    }

    #[test]
    fn validate_accepts_matching_declaration() {
        let q = draft(QuestionType::SingleChoice, Some(single("1")))
            .validate()
            .unwrap();
        assert_eq!(q.id(), &QuestionId::new("do_1"));
        assert_eq!(q.tag(), QuestionTag::Mcq);
        assert!(!q.is_answer_shown());
    }

    #[test]
    fn validate_rejects_mismatched_declaration() {
        let err = draft(QuestionType::MultipleChoice, Some(single("1")))
            .validate()
            .unwrap_err();
        assert!(matches!(err, QuestionError::DeclarationMismatch { .. }));
    }

    #[test]
    fn validate_rejects_duplicate_options() {
        let mut d = draft(QuestionType::SingleChoice, None);
        d.options.push(InteractionOption {
            label: "dup".into(),
            value: OptionValue::from(1),
        });
        let err = d.validate().unwrap_err();
        assert!(matches!(err, QuestionError::DuplicateOption { .. }));
    }

    #[test]
    fn validate_rejects_negative_scores() {
        let decl = ResponseDeclaration::MultipleChoice {
            base_type: BaseType::String,
            max_score: None,
            mapping: vec![MappingEntry {
                response: "A".into(),
                score: -1.0,
            }],
        };
        let err = draft(QuestionType::MultipleChoice, Some(decl))
            .validate()
            .unwrap_err();
        assert!(matches!(err, QuestionError::InvalidScore { .. }));
    }

    #[test]
    fn validate_rejects_duplicate_mapping_entries() {
        let entry = |response: &str, score: f64| MappingEntry {
            response: OptionValue::from(response),
            score,
        };
        let decl = ResponseDeclaration::MultipleChoice {
            base_type: BaseType::String,
            max_score: Some(5.0),
            mapping: vec![entry("A", 2.0), entry("B", 3.0), entry("A", 2.0)],
        };
        let err = draft(QuestionType::MultipleChoice, Some(decl))
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            QuestionError::DuplicateMapping {
                id: QuestionId::new("do_1"),
                response: OptionValue::from("A"),
            }
        );
    }

    #[test]
    fn missing_declaration_is_deferred_to_scoring() {
        assert!(draft(QuestionType::SingleChoice, None).validate().is_ok());
    }

    #[test]
    fn integer_base_type_compares_numerically() {
        let t = BaseType::Integer;
        assert!(t.matches(&"2".into(), &" 2".into()));
        assert!(t.matches(&"2".into(), &"2.0".into()));
        assert!(!t.matches(&"2".into(), &"3".into()));
        assert!(t.matches(&"abc".into(), &"abc".into()));
        assert!(!BaseType::String.matches(&"2".into(), &"2.0".into()));
    }

    #[test]
    fn deserializes_quml_shaped_json() {
        let json = r#"{
            "identifier": "do_42",
            "type": "multiple-choice",
            "options": [{"label": "A", "value": "A"}, {"label": "B", "value": "B"}],
            "response_declaration": {
                "type": "multiple-choice",
                "base_type": "string",
                "max_score": 5,
                "mapping": [{"response": "A", "score": 2}, {"response": "B", "score": 3}]
            },
            "media": [{"id": "v1", "type": "video", "src": "https://x.org/v.mp4"}],
            "solutions": [{"id": "s1", "type": "video", "value": "v1"}]
        }"#;
        let q = serde_json::from_str::<QuestionDraft>(json)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(q.question_type(), QuestionType::MultipleChoice);
        assert_eq!(q.response_declaration().unwrap().max_score(), Some(5.0));
        let media = q.solution_media(&q.solutions()[0]).unwrap();
        assert_eq!(media.kind, MediaKind::Video);
    }

    #[test]
    fn answer_shown_is_the_only_mutation() {
        let mut q = draft(QuestionType::Subjective, None).validate().unwrap();
        q.mark_answer_shown();
        assert!(q.is_answer_shown());
        assert!(QuestionDraft::from(&q).is_answer_shown);
    }
}
