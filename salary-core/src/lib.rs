pub mod auth;
pub mod calculations;
pub mod db;
pub mod models;
pub mod services;

pub use auth::{AuthError, AuthService, AuthUser};
pub use calculations::{SalaryTaxError, SalaryTaxInput, TaxCalculationResult, calculate_tax};
pub use db::repository::{FinanceRepository, RepositoryError};
pub use models::*;
