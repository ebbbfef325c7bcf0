#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, QuestionBank, QuestionRecord, QuestionSource, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
