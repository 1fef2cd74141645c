//! Salary tax calculations.
//!
//! The estimate follows a simplified Japanese withholding model: employment
//! income deduction, a flat social insurance estimate, a single rate looked up
//! from the taxable base, and a 10% residence tax.

pub mod common;
pub mod income_tax;

pub use income_tax::{
    SalaryTaxError, SalaryTaxInput, TaxCalculationResult, calculate_tax,
    employment_income_deduction, residence_tax, social_insurance_deduction, tax_rate,
};
