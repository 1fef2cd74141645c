use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewSalaryRecord, NewTodoItem, SalaryRecord, TodoItem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for the salary and todo tables.
///
/// Every query is scoped by user id. Rows of other users are never returned,
/// and writes addressed to another user's row fail with
/// [`RepositoryError::NotFound`].
#[async_trait]
pub trait FinanceRepository: Send + Sync {
    // Salary records

    /// Most recent record of `user_id` by `created_at` (ties go to the higher id).
    async fn latest_salary_record(
        &self,
        user_id: &str,
    ) -> Result<Option<SalaryRecord>, RepositoryError>;

    /// All records of `user_id`, newest first.
    async fn list_salary_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<SalaryRecord>, RepositoryError>;

    async fn create_salary_record(
        &self,
        record: NewSalaryRecord,
    ) -> Result<SalaryRecord, RepositoryError>;

    /// Inserts every record in one transaction. On error nothing is stored.
    async fn import_salary_records(
        &self,
        records: Vec<NewSalaryRecord>,
    ) -> Result<Vec<SalaryRecord>, RepositoryError>;

    /// Overwrites the four input amounts of the row with `record.id` owned by
    /// `record.user_id`.
    async fn update_salary_record(
        &self,
        record: &SalaryRecord,
    ) -> Result<(), RepositoryError>;

    async fn delete_salary_record(
        &self,
        user_id: &str,
        id: i64,
    ) -> Result<(), RepositoryError>;

    // Todo items

    /// All items of `user_id`, newest first.
    async fn list_todos(
        &self,
        user_id: &str,
    ) -> Result<Vec<TodoItem>, RepositoryError>;

    async fn create_todo(
        &self,
        item: NewTodoItem,
    ) -> Result<TodoItem, RepositoryError>;

    async fn set_todo_done(
        &self,
        user_id: &str,
        id: i64,
        done: bool,
    ) -> Result<(), RepositoryError>;

    async fn delete_todo(
        &self,
        user_id: &str,
        id: i64,
    ) -> Result<(), RepositoryError>;
}
