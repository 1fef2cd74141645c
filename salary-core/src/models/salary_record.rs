use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::{SalaryTaxError, SalaryTaxInput};

use super::SalaryField;

/// Salary inputs for one user, as shown on the salary screen.
///
/// `id` and `created_at` stay `None` until the record has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    pub id: Option<i64>,
    pub user_id: String,

    // User-provided values (yen)
    pub income: Decimal,
    pub social_insurance_deduction: Decimal,
    pub other_deduction: Decimal,
    pub tax_credit: Decimal,

    pub created_at: Option<DateTime<Utc>>,
}

/// For creating new records (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalaryRecord {
    pub user_id: String,
    pub income: Decimal,
    pub social_insurance_deduction: Decimal,
    pub other_deduction: Decimal,
    pub tax_credit: Decimal,
}

impl SalaryRecord {
    /// An unsaved record with every amount set to zero.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            income: Decimal::ZERO,
            social_insurance_deduction: Decimal::ZERO,
            other_deduction: Decimal::ZERO,
            tax_credit: Decimal::ZERO,
            created_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn field(
        &self,
        field: SalaryField,
    ) -> Decimal {
        SalaryTaxInput::from(self).field(field)
    }

    /// Updates a single input. Amounts must not be negative.
    pub fn set_field(
        &mut self,
        field: SalaryField,
        value: Decimal,
    ) -> Result<(), SalaryTaxError> {
        if value < Decimal::ZERO {
            return Err(SalaryTaxError::NegativeInput { field, value });
        }

        let slot = match field {
            SalaryField::Income => &mut self.income,
            SalaryField::SocialInsuranceDeduction => &mut self.social_insurance_deduction,
            SalaryField::OtherDeduction => &mut self.other_deduction,
            SalaryField::TaxCredit => &mut self.tax_credit,
        };
        *slot = value;
        Ok(())
    }

    pub fn to_new_record(&self) -> NewSalaryRecord {
        NewSalaryRecord {
            user_id: self.user_id.clone(),
            income: self.income,
            social_insurance_deduction: self.social_insurance_deduction,
            other_deduction: self.other_deduction,
            tax_credit: self.tax_credit,
        }
    }
}
