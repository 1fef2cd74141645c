//! Salary income tax estimate.
//!
//! # Calculation Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Employment income deduction (bracket lookup on gross income) |
//! | 2    | Employment income (income - step 1) |
//! | 3    | Total deduction (social insurance + other deductions) |
//! | 4    | Taxable income (step 2 - step 3, not clamped) |
//! | 5    | Tax rate (bracket lookup on step 4) |
//! | 6    | Tax amount (step 4 × step 5) |
//! | 7    | Final tax (step 6 - tax credit, minimum 0) |
//! | 8    | Residence tax (step 4 × 10%, rounded to the yen) |
//! | 9    | Total tax (step 7 + step 8) |
//!
//! The rate from step 5 applies to the whole taxable base; there is no
//! marginal stacking. A negative taxable income lands in the 5% bracket and
//! is only clamped at step 7, so the residence tax (and the total) can be
//! negative.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use salary_core::calculations::{SalaryTaxInput, calculate_tax};
//!
//! let input = SalaryTaxInput::new(dec!(5000000), dec!(972500), dec!(0), dec!(0));
//! let result = calculate_tax(&input).unwrap();
//!
//! assert_eq!(result.taxable_income, dec!(2487500));
//! assert_eq!(result.tax_rate_percent, dec!(10));
//! assert_eq!(result.total_tax, dec!(497500));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{max, round_to_yen};
use crate::models::{SalaryField, SalaryRecord};

/// Share of gross income withheld for health, pension and employment insurance.
const SOCIAL_INSURANCE_RATE: Decimal = dec!(0.1945);

const RESIDENCE_TAX_RATE: Decimal = dec!(0.10);

const ONE_HUNDRED: Decimal = dec!(100);

/// Errors raised when salary inputs are outside the supported range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SalaryTaxError {
    /// Amounts are entered in yen and may not be negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeInput { field: SalaryField, value: Decimal },

    /// NaN or infinite input.
    #[error("{field} must be a finite number")]
    NonFinite { field: SalaryField },

    /// Finite input too large to be represented as a decimal amount, or
    /// large enough to overflow the estimate.
    #[error("{field} is out of range")]
    OutOfRange { field: SalaryField },
}

enum DeductionFormula {
    Flat(Decimal),
    Proportional { rate: Decimal, base: Decimal },
}

struct EmploymentDeductionBracket {
    max_income: Option<Decimal>,
    formula: DeductionFormula,
}

struct TaxRateBracket {
    max_taxable_income: Option<Decimal>,
    rate: Decimal,
}

const EMPLOYMENT_DEDUCTION_BRACKETS: [EmploymentDeductionBracket; 6] = [
    EmploymentDeductionBracket {
        max_income: Some(dec!(1625000)),
        formula: DeductionFormula::Flat(dec!(550000)),
    },
    EmploymentDeductionBracket {
        max_income: Some(dec!(1800000)),
        formula: DeductionFormula::Proportional {
            rate: dec!(0.4),
            base: dec!(0),
        },
    },
    EmploymentDeductionBracket {
        max_income: Some(dec!(3600000)),
        formula: DeductionFormula::Proportional {
            rate: dec!(0.3),
            base: dec!(180000),
        },
    },
    EmploymentDeductionBracket {
        max_income: Some(dec!(6600000)),
        formula: DeductionFormula::Proportional {
            rate: dec!(0.2),
            base: dec!(540000),
        },
    },
    EmploymentDeductionBracket {
        max_income: Some(dec!(8500000)),
        formula: DeductionFormula::Proportional {
            rate: dec!(0.1),
            base: dec!(1200000),
        },
    },
    EmploymentDeductionBracket {
        max_income: None,
        formula: DeductionFormula::Flat(dec!(1950000)),
    },
];

const TAX_RATE_BRACKETS: [TaxRateBracket; 7] = [
    TaxRateBracket {
        max_taxable_income: Some(dec!(1950000)),
        rate: dec!(0.05),
    },
    TaxRateBracket {
        max_taxable_income: Some(dec!(3300000)),
        rate: dec!(0.10),
    },
    TaxRateBracket {
        max_taxable_income: Some(dec!(6950000)),
        rate: dec!(0.20),
    },
    TaxRateBracket {
        max_taxable_income: Some(dec!(9000000)),
        rate: dec!(0.23),
    },
    TaxRateBracket {
        max_taxable_income: Some(dec!(18000000)),
        rate: dec!(0.33),
    },
    TaxRateBracket {
        max_taxable_income: Some(dec!(40000000)),
        rate: dec!(0.40),
    },
    TaxRateBracket {
        max_taxable_income: None,
        rate: dec!(0.45),
    },
];

const TOP_EMPLOYMENT_DEDUCTION: Decimal = dec!(1950000);
const TOP_TAX_RATE: Decimal = dec!(0.45);

/// Upper bounds are inclusive; an open bracket matches everything.
fn within(
    max: Option<Decimal>,
    value: Decimal,
) -> bool {
    max.is_none_or(|upper| value <= upper)
}

/// Employment income deduction for gross salary `income`.
///
/// Brackets are checked in ascending order and the first whose upper bound
/// is at least `income` wins. No rounding is applied.
pub fn employment_income_deduction(income: Decimal) -> Decimal {
    EMPLOYMENT_DEDUCTION_BRACKETS
        .iter()
        .find(|b| within(b.max_income, income))
        .map_or(TOP_EMPLOYMENT_DEDUCTION, |b| match b.formula {
            DeductionFormula::Flat(amount) => amount,
            DeductionFormula::Proportional { rate, base } => income * rate + base,
        })
}

/// Estimated social insurance premiums: 19.45% of income, rounded to the yen.
pub fn social_insurance_deduction(income: Decimal) -> Decimal {
    round_to_yen(income * SOCIAL_INSURANCE_RATE)
}

/// Income tax rate as a fraction (`0.05` for 5%).
///
/// Negative taxable income falls into the lowest bracket.
pub fn tax_rate(taxable_income: Decimal) -> Decimal {
    TAX_RATE_BRACKETS
        .iter()
        .find(|b| within(b.max_taxable_income, taxable_income))
        .map_or(TOP_TAX_RATE, |b| b.rate)
}

/// Residence tax estimate: 10% of taxable income, rounded to the yen.
///
/// Not clamped, so a negative taxable income yields a negative amount.
pub fn residence_tax(taxable_income: Decimal) -> Decimal {
    round_to_yen(taxable_income * RESIDENCE_TAX_RATE)
}

/// The four user-provided amounts, in yen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryTaxInput {
    /// Annual gross salary.
    pub income: Decimal,

    /// Social insurance premiums paid, either entered or estimated with
    /// [`social_insurance_deduction`].
    pub social_insurance_deduction: Decimal,

    /// Any other income deductions.
    pub other_deduction: Decimal,

    /// Credit subtracted from the computed tax, not from taxable income.
    pub tax_credit: Decimal,
}

impl SalaryTaxInput {
    pub fn new(
        income: Decimal,
        social_insurance_deduction: Decimal,
        other_deduction: Decimal,
        tax_credit: Decimal,
    ) -> Self {
        Self {
            income,
            social_insurance_deduction,
            other_deduction,
            tax_credit,
        }
    }

    /// Builds an input whose social insurance deduction is estimated from
    /// `income`.
    pub fn with_estimated_social_insurance(
        income: Decimal,
        other_deduction: Decimal,
        tax_credit: Decimal,
    ) -> Self {
        Self::new(
            income,
            social_insurance_deduction(income),
            other_deduction,
            tax_credit,
        )
    }

    /// Converts floating point amounts, rejecting NaN, infinities and
    /// negative values.
    pub fn from_f64(
        income: f64,
        social_insurance_deduction: f64,
        other_deduction: f64,
        tax_credit: f64,
    ) -> Result<Self, SalaryTaxError> {
        let input = Self {
            income: decimal_from_f64(SalaryField::Income, income)?,
            social_insurance_deduction: decimal_from_f64(
                SalaryField::SocialInsuranceDeduction,
                social_insurance_deduction,
            )?,
            other_deduction: decimal_from_f64(SalaryField::OtherDeduction, other_deduction)?,
            tax_credit: decimal_from_f64(SalaryField::TaxCredit, tax_credit)?,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn field(
        &self,
        field: SalaryField,
    ) -> Decimal {
        match field {
            SalaryField::Income => self.income,
            SalaryField::SocialInsuranceDeduction => self.social_insurance_deduction,
            SalaryField::OtherDeduction => self.other_deduction,
            SalaryField::TaxCredit => self.tax_credit,
        }
    }

    /// Checks that no amount is negative.
    ///
    /// # Errors
    ///
    /// Returns [`SalaryTaxError::NegativeInput`] naming the first negative
    /// field.
    pub fn validate(&self) -> Result<(), SalaryTaxError> {
        SalaryField::ALL
            .into_iter()
            .map(|field| (field, self.field(field)))
            .find(|(_, value)| *value < Decimal::ZERO)
            .map_or(Ok(()), |(field, value)| {
                Err(SalaryTaxError::NegativeInput { field, value })
            })
    }
}

impl From<&SalaryRecord> for SalaryTaxInput {
    fn from(record: &SalaryRecord) -> Self {
        Self::new(
            record.income,
            record.social_insurance_deduction,
            record.other_deduction,
            record.tax_credit,
        )
    }
}

fn in_range(
    field: SalaryField,
    value: Option<Decimal>,
) -> Result<Decimal, SalaryTaxError> {
    value.ok_or(SalaryTaxError::OutOfRange { field })
}

fn decimal_from_f64(
    field: SalaryField,
    value: f64,
) -> Result<Decimal, SalaryTaxError> {
    if !value.is_finite() {
        return Err(SalaryTaxError::NonFinite { field });
    }
    Decimal::try_from(value).map_err(|_| SalaryTaxError::OutOfRange { field })
}

/// Breakdown of the estimate. Derived from the inputs, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub employment_deduction: Decimal,
    pub employment_income: Decimal,
    pub total_deduction: Decimal,
    pub taxable_income: Decimal,

    /// Applied rate on a 0–100 scale.
    pub tax_rate_percent: Decimal,

    pub tax_amount: Decimal,

    /// Tax after credits, never negative.
    pub final_tax: Decimal,

    pub residence_tax: Decimal,

    /// `final_tax + residence_tax`.
    pub total_tax: Decimal,
}

/// Runs the full estimate for `input`.
///
/// # Errors
///
/// Returns [`SalaryTaxError::NegativeInput`] if any input amount is negative,
/// or [`SalaryTaxError::OutOfRange`] naming the input whose size pushed an
/// intermediate amount past the range of [`Decimal`].
pub fn calculate_tax(input: &SalaryTaxInput) -> Result<TaxCalculationResult, SalaryTaxError> {
    input.validate()?;

    let employment_deduction = employment_income_deduction(input.income);
    let employment_income = in_range(
        SalaryField::Income,
        input.income.checked_sub(employment_deduction),
    )?;
    let deduction_field = if input.social_insurance_deduction >= input.other_deduction {
        SalaryField::SocialInsuranceDeduction
    } else {
        SalaryField::OtherDeduction
    };
    let total_deduction = in_range(
        deduction_field,
        input
            .social_insurance_deduction
            .checked_add(input.other_deduction),
    )?;
    let taxable_income = in_range(
        deduction_field,
        employment_income.checked_sub(total_deduction),
    )?;
    let rate = tax_rate(taxable_income);
    let tax_amount = in_range(SalaryField::Income, taxable_income.checked_mul(rate))?;
    // Subtracting a non-negative credit can only overflow downwards.
    let final_tax = tax_amount
        .checked_sub(input.tax_credit)
        .map_or(Decimal::ZERO, |tax| max(Decimal::ZERO, tax));
    let residence_tax = residence_tax(taxable_income);
    let total_tax = in_range(SalaryField::Income, final_tax.checked_add(residence_tax))?;

    debug!(
        %taxable_income,
        %rate,
        %final_tax,
        %residence_tax,
        "salary tax calculated"
    );

    Ok(TaxCalculationResult {
        employment_deduction,
        employment_income,
        total_deduction,
        taxable_income,
        tax_rate_percent: rate * ONE_HUNDRED,
        tax_amount,
        final_tax,
        residence_tax,
        total_tax,
    })
}
