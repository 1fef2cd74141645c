use tracing::info;

use crate::db::FinanceRepository;
use crate::models::{NewTodoItem, TodoItem};

use super::ServiceError;

pub async fn list_todos(
    repo: &dyn FinanceRepository,
    user_id: &str,
) -> Result<Vec<TodoItem>, ServiceError> {
    Ok(repo.list_todos(user_id).await?)
}

/// Adds an open item. Surrounding whitespace is trimmed and blank text is
/// rejected.
pub async fn add_todo(
    repo: &dyn FinanceRepository,
    user_id: &str,
    text: &str,
) -> Result<TodoItem, ServiceError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ServiceError::EmptyTodoText);
    }

    let item = repo
        .create_todo(NewTodoItem {
            user_id: user_id.to_string(),
            text: text.to_string(),
            done: false,
        })
        .await?;
    info!(user_id, id = item.id, "added todo");
    Ok(item)
}

/// Marks `user_id`'s item `id` as done.
pub async fn complete_todo(
    repo: &dyn FinanceRepository,
    user_id: &str,
    id: i64,
) -> Result<(), ServiceError> {
    repo.set_todo_done(user_id, id, true).await?;
    info!(user_id, id, "completed todo");
    Ok(())
}

/// Deletes `user_id`'s item `id`. Items of other users are reported as
/// [`RepositoryError::NotFound`](crate::RepositoryError::NotFound).
pub async fn delete_todo(
    repo: &dyn FinanceRepository,
    user_id: &str,
    id: i64,
) -> Result<(), ServiceError> {
    repo.delete_todo(user_id, id).await?;
    info!(user_id, id, "deleted todo");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::RepositoryError;
    use crate::services::memory::MemoryRepository;

    #[tokio::test]
    async fn add_trims_text_and_starts_open() {
        let repo = MemoryRepository::default();

        let item = add_todo(&repo, "user-1", "  pay rent  ").await.unwrap();

        assert_eq!(item.text, "pay rent");
        assert!(!item.done);
    }

    #[tokio::test]
    async fn add_rejects_blank_text() {
        let repo = MemoryRepository::default();

        assert_eq!(
            add_todo(&repo, "user-1", "   ").await,
            Err(ServiceError::EmptyTodoText)
        );
        assert!(list_todos(&repo, "user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_scoped_to_user() {
        let repo = MemoryRepository::default();
        add_todo(&repo, "user-1", "first").await.unwrap();
        add_todo(&repo, "user-2", "not mine").await.unwrap();
        add_todo(&repo, "user-1", "second").await.unwrap();

        let texts: Vec<_> = list_todos(&repo, "user-1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();

        assert_eq!(texts, vec!["second".to_string(), "first".to_string()]);
    }

    #[tokio::test]
    async fn complete_marks_item_done() {
        let repo = MemoryRepository::default();
        let item = add_todo(&repo, "user-1", "file taxes").await.unwrap();

        complete_todo(&repo, "user-1", item.id).await.unwrap();

        let items = list_todos(&repo, "user-1").await.unwrap();
        assert!(items[0].done);
    }

    #[tokio::test]
    async fn delete_removes_item_and_reports_missing_ids() {
        let repo = MemoryRepository::default();
        let item = add_todo(&repo, "user-1", "file taxes").await.unwrap();

        delete_todo(&repo, "user-1", item.id).await.unwrap();

        assert!(list_todos(&repo, "user-1").await.unwrap().is_empty());
        assert_eq!(
            delete_todo(&repo, "user-1", item.id).await,
            Err(ServiceError::Repository(RepositoryError::NotFound))
        );
    }

    #[tokio::test]
    async fn other_users_cannot_complete_or_delete_an_item() {
        let repo = MemoryRepository::default();
        let item = add_todo(&repo, "alice", "mine").await.unwrap();

        assert_eq!(
            complete_todo(&repo, "bob", item.id).await,
            Err(ServiceError::Repository(RepositoryError::NotFound))
        );
        assert_eq!(
            delete_todo(&repo, "bob", item.id).await,
            Err(ServiceError::Repository(RepositoryError::NotFound))
        );

        let items = list_todos(&repo, "alice").await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(!items[0].done);
    }
}
