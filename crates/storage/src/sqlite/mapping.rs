use chrono::{DateTime, Utc};
use quml_core::model::{Question, QuestionId, SectionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{QuestionRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn record_from_row(row: &SqliteRow) -> Result<QuestionRecord, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let section_id: Option<String> = row.try_get("section_id").map_err(ser)?;
    let payload: String = row.try_get("payload").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;

    Ok(QuestionRecord {
        id: id.parse::<QuestionId>().map_err(ser)?,
        section_id: section_id.map(|s| s.parse::<SectionId>()).transpose().map_err(ser)?,
        payload,
        created_at,
    })
}

pub(crate) fn question_from_row(row: &SqliteRow) -> Result<Question, StorageError> {
    record_from_row(row)?.into_question()
}
