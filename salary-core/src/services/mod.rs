//! Record-level operations shared by every front end.

mod salary;
mod todo;

use thiserror::Error;

use crate::calculations::SalaryTaxError;
use crate::db::RepositoryError;

pub use salary::{estimate, load_salary_record, save_salary_record};
pub use todo::{add_todo, complete_todo, delete_todo, list_todos};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("todo text must not be empty")]
    EmptyTodoText,

    #[error(transparent)]
    Tax(#[from] SalaryTaxError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
