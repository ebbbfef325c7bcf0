use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quml_core::model::{Question, QuestionDraft, QuestionId, SectionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// True for failures caused by the transport rather than the content.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

/// Persisted shape of a question: the validated draft serialized as JSON,
/// keyed by identifier and optionally grouped by section.
#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub section_id: Option<SectionId>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl QuestionRecord {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the question cannot be encoded.
    pub fn from_question(
        question: &Question,
        section_id: Option<&SectionId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StorageError> {
        let payload = serde_json::to_string(&QuestionDraft::from(question))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self {
            id: question.id().clone(),
            section_id: section_id.cloned(),
            payload,
            created_at,
        })
    }

    /// Decode and re-validate the stored payload.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the payload is not a valid
    /// question or its identifier disagrees with the record key.
    pub fn into_question(self) -> Result<Question, StorageError> {
        let draft: QuestionDraft = serde_json::from_str(&self.payload)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if draft.id != self.id {
            return Err(StorageError::Serialization(format!(
                "payload id {} does not match record id {}",
                draft.id, self.id
            )));
        }
        draft
            .validate()
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Read side used by a running session to load question batches.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the questions for `ids`, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is unknown, or a connection
    /// error when the backend is unreachable.
    async fn fetch_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// Whether the backend currently believes it is reachable.
    fn is_online(&self) -> bool {
        true
    }
}

/// Write side used by authoring tools and the seed binary.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Insert or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on serialization or backend failure.
    async fn upsert_question(
        &self,
        question: &Question,
        section_id: Option<&SectionId>,
    ) -> Result<(), StorageError>;

    /// Question ids in a section, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn section_question_ids(
        &self,
        section_id: &SectionId,
    ) -> Result<Vec<QuestionId>, StorageError>;
}

/// In-memory question bank for tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, (Option<SectionId>, Question)>>>,
    order: Arc<Mutex<Vec<QuestionId>>>,
    offline: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-loaded with `questions` (no section).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the internal lock is poisoned.
    pub fn with_questions(
        questions: impl IntoIterator<Item = Question>,
    ) -> Result<Self, StorageError> {
        let repo = Self::new();
        for question in questions {
            repo.insert(question, None)?;
        }
        Ok(repo)
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `fetch_questions` calls served so far, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn insert(&self, question: Question, section_id: Option<SectionId>) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = question.id().clone();
        if guard.insert(id.clone(), (section_id, question)).is_none() {
            self.order
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?
                .push(id);
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn fetch_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("offline".into()));
        }
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.get(id) {
                Some((_, question)) => found.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }

    fn is_online(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionBank for InMemoryRepository {
    async fn upsert_question(
        &self,
        question: &Question,
        section_id: Option<&SectionId>,
    ) -> Result<(), StorageError> {
        self.insert(question.clone(), section_id.cloned())
    }

    async fn section_question_ids(
        &self,
        section_id: &SectionId,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let questions = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let order = self
            .order
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(order
            .iter()
            .filter(|id| {
                questions
                    .get(*id)
                    .is_some_and(|(section, _)| section.as_ref() == Some(section_id))
            })
            .cloned()
            .collect())
    }
}

/// Aggregates the question source and bank behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub bank: Arc<dyn QuestionBank>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionSource> = Arc::new(repo.clone());
        let bank: Arc<dyn QuestionBank> = Arc::new(repo);
        Self { questions, bank }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quml_core::model::{QuestionType, ResponseDeclaration};
    use quml_core::time::fixed_now;

    fn question(id: &str) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            ordinal: 0,
            question_type: QuestionType::Subjective,
            body: format!("<p>{id}</p>"),
            options: Vec::new(),
            response_declaration: Some(ResponseDeclaration::Subjective),
            media: Vec::new(),
            solutions: Vec::new(),
            max_score: None,
            is_answer_shown: false,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_returns_requested_order() {
        let repo = InMemoryRepository::with_questions([question("a"), question("b")]).unwrap();
        let got = repo
            .fetch_questions(&[QuestionId::new("b"), QuestionId::new("a")])
            .await
            .unwrap();
        let ids: Vec<_> = got.iter().map(|q| q.id().as_str().to_owned()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(repo.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let repo = InMemoryRepository::with_questions([question("a")]).unwrap();
        let err = repo
            .fetch_questions(&[QuestionId::new("zzz")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(!err.is_connectivity());
    }

    #[tokio::test]
    async fn offline_repository_reports_connectivity() {
        let repo = InMemoryRepository::with_questions([question("a")]).unwrap();
        repo.set_offline(true);
        assert!(!repo.is_online());
        let err = repo
            .fetch_questions(&[QuestionId::new("a")])
            .await
            .unwrap_err();
        assert!(err.is_connectivity());

        repo.set_offline(false);
        assert_eq!(
            repo.fetch_questions(&[QuestionId::new("a")])
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn section_ids_keep_insertion_order() {
        let repo = InMemoryRepository::new();
        let s1 = SectionId::new("s1");
        let s2 = SectionId::new("s2");
        repo.upsert_question(&question("c"), Some(&s1)).await.unwrap();
        repo.upsert_question(&question("a"), Some(&s2)).await.unwrap();
        repo.upsert_question(&question("b"), Some(&s1)).await.unwrap();
        // Re-upserting keeps the original position.
        repo.upsert_question(&question("c"), Some(&s1)).await.unwrap();

        let ids = repo.section_question_ids(&s1).await.unwrap();
        assert_eq!(ids, vec![QuestionId::new("c"), QuestionId::new("b")]);
    }

    #[test]
    fn record_roundtrip_and_id_check() {
        let record = QuestionRecord::from_question(&question("a"), None, fixed_now()).unwrap();
        assert_eq!(record.clone().into_question().unwrap(), question("a"));

        let mut tampered = record;
        tampered.id = QuestionId::new("other");
        assert!(matches!(
            tampered.into_question(),
            Err(StorageError::Serialization(_))
        ));
    }
}
