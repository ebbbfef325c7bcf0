use std::collections::HashMap;

use chrono::Utc;
use quml_core::model::{Question, QuestionId, SectionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{question_from_row, record_from_row};
use crate::repository::{QuestionBank, QuestionRecord, QuestionSource, StorageError};

#[async_trait::async_trait]
impl QuestionSource for SqliteRepository {
    async fn fetch_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
            SELECT id, section_id, payload, created_at
            FROM questions
            WHERE id IN (
            ",
        );
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n");

        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id.as_str());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let question = question_from_row(row)?;
            by_id.insert(question.id().clone(), question);
        }

        let mut ordered = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(id) {
                Some(question) => ordered.push(question),
                None => {
                    tracing::debug!(question_id = %id, "question missing from bank");
                    return Err(StorageError::NotFound);
                }
            }
        }
        Ok(ordered)
    }
}

#[async_trait::async_trait]
impl QuestionBank for SqliteRepository {
    async fn upsert_question(
        &self,
        question: &Question,
        section_id: Option<&SectionId>,
    ) -> Result<(), StorageError> {
        let record = QuestionRecord::from_question(question, section_id, Utc::now())?;

        // created_at is kept on conflict so section order stays stable.
        sqlx::query(
            r"
            INSERT INTO questions (id, section_id, payload, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                section_id = excluded.section_id,
                payload = excluded.payload
            ",
        )
        .bind(record.id.as_str())
        .bind(record.section_id.as_ref().map(SectionId::as_str))
        .bind(record.payload)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn section_question_ids(
        &self,
        section_id: &SectionId,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, section_id, payload, created_at
            FROM questions
            WHERE section_id = ?1
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(section_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            ids.push(record_from_row(row)?.id);
        }
        Ok(ids)
    }
}

impl SqliteRepository {
    /// Number of stored questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the query fails.
    pub async fn count_questions(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
