use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub user_id: String,
    pub text: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

/// For creating new todo items (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodoItem {
    pub user_id: String,
    pub text: String,
    pub done: bool,
}
