mod salary_field;
mod salary_record;
mod todo_item;

pub use salary_field::{ParseSalaryFieldError, SalaryField};
pub use salary_record::{NewSalaryRecord, SalaryRecord};
pub use todo_item::{NewTodoItem, TodoItem};
