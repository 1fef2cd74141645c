use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use salary_core::{
    FinanceRepository, NewSalaryRecord, NewTodoItem, RepositoryError, SalaryRecord, TodoItem,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use tracing::debug;

use crate::decimal::{decimal_to_text, format_timestamp, get_decimal, get_timestamp};

const IN_MEMORY: &str = ":memory:";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open `database_url`, which may be a bare file path, a `sqlite:` URL,
    /// or `:memory:`. Database files are created when missing.
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.trim_start_matches("sqlite:") == IN_MEMORY;

        let options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)
        } else {
            Ok(SqliteConnectOptions::new().filename(database_url))
        }
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true);

        // An in-memory database lives only as long as its single connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        debug!(database_url, "opened sqlite database");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_salary_record(row: &SqliteRow) -> Result<SalaryRecord, RepositoryError> {
    Ok(SalaryRecord {
        id: Some(row.try_get("id").map_err(db_error)?),
        user_id: row.try_get("user_id").map_err(db_error)?,
        income: get_decimal(row, "income")?,
        social_insurance_deduction: get_decimal(row, "social_insurance_deduction")?,
        other_deduction: get_decimal(row, "other_deduction")?,
        tax_credit: get_decimal(row, "tax_credit")?,
        created_at: Some(get_timestamp(row, "created_at")?),
    })
}

fn row_to_todo(row: &SqliteRow) -> Result<TodoItem, RepositoryError> {
    Ok(TodoItem {
        id: row.try_get("id").map_err(db_error)?,
        user_id: row.try_get("user_id").map_err(db_error)?,
        text: row.try_get("text").map_err(db_error)?,
        done: row.try_get::<i64, _>("done").map_err(db_error)? != 0,
        created_at: get_timestamp(row, "created_at")?,
    })
}

const SALARY_COLUMNS: &str = "id, user_id, income, social_insurance_deduction, other_deduction,
                              tax_credit, created_at";

async fn insert_salary_record(
    conn: &mut SqliteConnection,
    record: &NewSalaryRecord,
) -> Result<SalaryRecord, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO salary_data (
            user_id, income, social_insurance_deduction, other_deduction,
            tax_credit, created_at
        ) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.user_id)
    .bind(decimal_to_text(record.income))
    .bind(decimal_to_text(record.social_insurance_deduction))
    .bind(decimal_to_text(record.other_deduction))
    .bind(decimal_to_text(record.tax_credit))
    .bind(format_timestamp(Utc::now()))
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    let id = result.last_insert_rowid();
    debug!(id, user_id = %record.user_id, "inserted salary_data row");

    let row = sqlx::query(&format!(
        "SELECT {SALARY_COLUMNS} FROM salary_data WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error)?;

    row_to_salary_record(&row)
}

#[async_trait]
impl FinanceRepository for SqliteRepository {
    async fn latest_salary_record(
        &self,
        user_id: &str,
    ) -> Result<Option<SalaryRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SALARY_COLUMNS} FROM salary_data
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_salary_record).transpose()
    }

    async fn list_salary_records(
        &self,
        user_id: &str,
    ) -> Result<Vec<SalaryRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SALARY_COLUMNS} FROM salary_data
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_salary_record).collect()
    }

    async fn create_salary_record(
        &self,
        record: NewSalaryRecord,
    ) -> Result<SalaryRecord, RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        insert_salary_record(&mut *conn, &record).await
    }

    async fn import_salary_records(
        &self,
        records: Vec<NewSalaryRecord>,
    ) -> Result<Vec<SalaryRecord>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let mut stored = Vec::with_capacity(records.len());
        for record in &records {
            stored.push(insert_salary_record(&mut *tx, record).await?);
        }

        tx.commit().await.map_err(db_error)?;
        debug!(count = stored.len(), "committed salary_data import");
        Ok(stored)
    }

    async fn update_salary_record(
        &self,
        record: &SalaryRecord,
    ) -> Result<(), RepositoryError> {
        let id = record.id.ok_or(RepositoryError::NotFound)?;

        let result = sqlx::query(
            "UPDATE salary_data SET
                income = ?, social_insurance_deduction = ?, other_deduction = ?, tax_credit = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(decimal_to_text(record.income))
        .bind(decimal_to_text(record.social_insurance_deduction))
        .bind(decimal_to_text(record.other_deduction))
        .bind(decimal_to_text(record.tax_credit))
        .bind(id)
        .bind(&record.user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_salary_record(
        &self,
        user_id: &str,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM salary_data WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_todos(
        &self,
        user_id: &str,
    ) -> Result<Vec<TodoItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, text, done, created_at FROM todos
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_todo).collect()
    }

    async fn create_todo(
        &self,
        item: NewTodoItem,
    ) -> Result<TodoItem, RepositoryError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO todos (user_id, text, done, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&item.user_id)
        .bind(&item.text)
        .bind(item.done)
        .bind(format_timestamp(created_at))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        let id = result.last_insert_rowid();
        debug!(id, user_id = %item.user_id, "inserted todos row");

        let row = sqlx::query("SELECT id, user_id, text, done, created_at FROM todos WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        row_to_todo(&row)
    }

    async fn set_todo_done(
        &self,
        user_id: &str,
        id: i64,
        done: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE todos SET done = ? WHERE id = ? AND user_id = ?")
            .bind(done)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_todo(
        &self,
        user_id: &str,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_repo() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn new_record(user_id: &str, income: Decimal) -> NewSalaryRecord {
        NewSalaryRecord {
            user_id: user_id.to_string(),
            income,
            social_insurance_deduction: dec!(972500),
            other_deduction: Decimal::ZERO,
            tax_credit: Decimal::ZERO,
        }
    }

    async fn insert_at(
        repo: &SqliteRepository,
        user_id: &str,
        income: i64,
        created_at: &str,
    ) {
        sqlx::query(
            "INSERT INTO salary_data (user_id, income, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(income)
        .bind(created_at)
        .execute(repo.pool())
        .await
        .expect("Failed to insert salary row");
    }

    // ==================== salary_data ====================

    #[tokio::test]
    async fn test_latest_salary_record_none_for_new_user() {
        let repo = setup_test_repo().await;

        let result = repo.latest_salary_record("nobody").await;

        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_create_salary_record_assigns_id_and_timestamp() {
        let repo = setup_test_repo().await;

        let created = repo
            .create_salary_record(new_record("u1", dec!(5000000)))
            .await
            .expect("Failed to create record");

        assert!(created.id.is_some());
        assert!(created.created_at.is_some());
        assert_eq!(created.user_id, "u1");
        assert_eq!(created.income, dec!(5000000));
        assert_eq!(created.social_insurance_deduction, dec!(972500));
    }

    #[tokio::test]
    async fn test_latest_salary_record_picks_newest_created_at() {
        let repo = setup_test_repo().await;
        insert_at(&repo, "u1", 3000000, "2025-01-01T00:00:00.000000Z").await;
        insert_at(&repo, "u1", 7000000, "2025-06-01T00:00:00.000000Z").await;
        insert_at(&repo, "u1", 5000000, "2025-03-01T00:00:00.000000Z").await;

        let latest = repo.latest_salary_record("u1").await.unwrap().unwrap();

        assert_eq!(latest.income, dec!(7000000));
    }

    #[tokio::test]
    async fn test_latest_salary_record_breaks_ties_by_id() {
        let repo = setup_test_repo().await;
        insert_at(&repo, "u1", 1000000, "2025-01-01T00:00:00.000000Z").await;
        insert_at(&repo, "u1", 2000000, "2025-01-01T00:00:00.000000Z").await;

        let latest = repo.latest_salary_record("u1").await.unwrap().unwrap();

        assert_eq!(latest.income, dec!(2000000));
    }

    #[tokio::test]
    async fn test_salary_records_are_scoped_to_user() {
        let repo = setup_test_repo().await;
        insert_at(&repo, "u1", 1000000, "2025-01-01T00:00:00.000000Z").await;
        insert_at(&repo, "u2", 2000000, "2025-02-01T00:00:00.000000Z").await;

        let records = repo.list_salary_records("u1").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].income, dec!(1000000));
    }

    #[tokio::test]
    async fn test_list_salary_records_newest_first() {
        let repo = setup_test_repo().await;
        insert_at(&repo, "u1", 1000000, "2025-01-01T00:00:00.000000Z").await;
        insert_at(&repo, "u1", 2000000, "2025-02-01T00:00:00.000000Z").await;

        let incomes: Vec<Decimal> = repo
            .list_salary_records("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.income)
            .collect();

        assert_eq!(incomes, vec![dec!(2000000), dec!(1000000)]);
    }

    #[tokio::test]
    async fn test_update_salary_record_overwrites_amounts() {
        let repo = setup_test_repo().await;
        let mut record = repo
            .create_salary_record(new_record("u1", dec!(5000000)))
            .await
            .unwrap();

        record.income = dec!(6000000);
        record.tax_credit = dec!(30000);
        repo.update_salary_record(&record).await.unwrap();

        let reloaded = repo.latest_salary_record("u1").await.unwrap().unwrap();
        assert_eq!(reloaded.income, dec!(6000000));
        assert_eq!(reloaded.tax_credit, dec!(30000));
        assert_eq!(reloaded.id, record.id);
        assert_eq!(reloaded.created_at, record.created_at);
    }

    #[tokio::test]
    async fn test_update_salary_record_missing_row_is_not_found() {
        let repo = setup_test_repo().await;
        let mut record = SalaryRecord::empty("u1");
        record.id = Some(999);

        let result = repo.update_salary_record(&record).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_update_unsaved_salary_record_is_not_found() {
        let repo = setup_test_repo().await;

        let result = repo.update_salary_record(&SalaryRecord::empty("u1")).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_salary_record() {
        let repo = setup_test_repo().await;
        let record = repo
            .create_salary_record(new_record("u1", dec!(5000000)))
            .await
            .unwrap();
        let id = record.id.unwrap();

        repo.delete_salary_record("u1", id).await.unwrap();

        assert_eq!(repo.latest_salary_record("u1").await, Ok(None));
        assert_eq!(
            repo.delete_salary_record("u1", id).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_salary_writes_of_another_user_are_not_found() {
        let repo = setup_test_repo().await;
        let record = repo
            .create_salary_record(new_record("u1", dec!(5000000)))
            .await
            .unwrap();
        let id = record.id.unwrap();

        let mut intruder = record.clone();
        intruder.user_id = "u2".to_string();
        intruder.income = dec!(1);
        assert_eq!(
            repo.update_salary_record(&intruder).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(
            repo.delete_salary_record("u2", id).await,
            Err(RepositoryError::NotFound)
        );

        let stored = repo.latest_salary_record("u1").await.unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn test_amounts_round_trip_exactly() {
        let repo = setup_test_repo().await;
        let mut new = new_record("u1", dec!(1234567890123456789.5));
        new.other_deduction = dec!(0.1);
        new.tax_credit = dec!(24.875);

        let created = repo.create_salary_record(new).await.unwrap();
        let reloaded = repo.latest_salary_record("u1").await.unwrap().unwrap();

        assert_eq!(reloaded, created);
        assert_eq!(reloaded.income, dec!(1234567890123456789.5));
        assert_eq!(reloaded.other_deduction, dec!(0.1));
        assert_eq!(reloaded.tax_credit, dec!(24.875));
    }

    #[tokio::test]
    async fn test_import_salary_records_inserts_all_rows() {
        let repo = setup_test_repo().await;

        let stored = repo
            .import_salary_records(vec![
                new_record("u1", dec!(3000000)),
                new_record("u1", dec!(4000000)),
            ])
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(repo.list_salary_records("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_salary_records_is_all_or_nothing() {
        let repo = setup_test_repo().await;

        let result = repo
            .import_salary_records(vec![
                new_record("u1", dec!(3000000)),
                new_record("u1", dec!(-1)),
            ])
            .await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(repo.list_salary_records("u1").await, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_negative_amounts_are_rejected_by_schema() {
        let repo = setup_test_repo().await;

        let result = repo
            .create_salary_record(new_record("u1", dec!(-1)))
            .await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    // ==================== todos ====================

    #[tokio::test]
    async fn test_create_todo_roundtrip() {
        let repo = setup_test_repo().await;

        let created = repo
            .create_todo(NewTodoItem {
                user_id: "u1".to_string(),
                text: "file year-end adjustment".to_string(),
                done: false,
            })
            .await
            .unwrap();

        let todos = repo.list_todos("u1").await.unwrap();
        assert_eq!(todos, vec![created]);
        assert!(!todos[0].done);
    }

    #[tokio::test]
    async fn test_list_todos_scoped_and_newest_first() {
        let repo = setup_test_repo().await;
        for (user, text, created_at) in [
            ("u1", "first", "2025-01-01T00:00:00.000000Z"),
            ("u2", "other user", "2025-01-02T00:00:00.000000Z"),
            ("u1", "second", "2025-01-03T00:00:00.000000Z"),
        ] {
            sqlx::query("INSERT INTO todos (user_id, text, created_at) VALUES (?, ?, ?)")
                .bind(user)
                .bind(text)
                .bind(created_at)
                .execute(repo.pool())
                .await
                .unwrap();
        }

        let texts: Vec<String> = repo
            .list_todos("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();

        assert_eq!(texts, vec!["second".to_string(), "first".to_string()]);
    }

    #[tokio::test]
    async fn test_set_todo_done() {
        let repo = setup_test_repo().await;
        let todo = repo
            .create_todo(NewTodoItem {
                user_id: "u1".to_string(),
                text: "check withholding slip".to_string(),
                done: false,
            })
            .await
            .unwrap();

        repo.set_todo_done("u1", todo.id, true).await.unwrap();

        let todos = repo.list_todos("u1").await.unwrap();
        assert!(todos[0].done);
        assert_eq!(
            repo.set_todo_done("u1", todo.id + 1, true).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_delete_todo() {
        let repo = setup_test_repo().await;
        let todo = repo
            .create_todo(NewTodoItem {
                user_id: "u1".to_string(),
                text: "renew my number card".to_string(),
                done: false,
            })
            .await
            .unwrap();

        repo.delete_todo("u1", todo.id).await.unwrap();

        assert_eq!(repo.list_todos("u1").await, Ok(vec![]));
        assert_eq!(
            repo.delete_todo("u1", todo.id).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_todo_writes_of_another_user_are_not_found() {
        let repo = setup_test_repo().await;
        let todo = repo
            .create_todo(NewTodoItem {
                user_id: "u1".to_string(),
                text: "mine".to_string(),
                done: false,
            })
            .await
            .unwrap();

        assert_eq!(
            repo.set_todo_done("u2", todo.id, true).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(
            repo.delete_todo("u2", todo.id).await,
            Err(RepositoryError::NotFound)
        );
        assert_eq!(repo.list_todos("u1").await, Ok(vec![todo]));
    }

    #[tokio::test]
    async fn test_blank_todo_is_rejected_by_schema() {
        let repo = setup_test_repo().await;

        let result = repo
            .create_todo(NewTodoItem {
                user_id: "u1".to_string(),
                text: "   ".to_string(),
                done: false,
            })
            .await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }
}
