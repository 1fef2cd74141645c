use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The user-editable inputs of a [`SalaryRecord`](super::SalaryRecord).
///
/// Field names match the persisted column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryField {
    Income,
    SocialInsuranceDeduction,
    OtherDeduction,
    TaxCredit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown salary field '{0}'; expected one of: income, social_insurance_deduction, other_deduction, tax_credit")]
pub struct ParseSalaryFieldError(pub String);

impl SalaryField {
    pub const ALL: [SalaryField; 4] = [
        Self::Income,
        Self::SocialInsuranceDeduction,
        Self::OtherDeduction,
        Self::TaxCredit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::SocialInsuranceDeduction => "social_insurance_deduction",
            Self::OtherDeduction => "other_deduction",
            Self::TaxCredit => "tax_credit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::SocialInsuranceDeduction => "Social insurance deduction",
            Self::OtherDeduction => "Other deduction",
            Self::TaxCredit => "Tax credit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "social_insurance_deduction" => Some(Self::SocialInsuranceDeduction),
            "other_deduction" => Some(Self::OtherDeduction),
            "tax_credit" => Some(Self::TaxCredit),
            _ => None,
        }
    }
}

impl FromStr for SalaryField {
    type Err = ParseSalaryFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::parse(&normalized).ok_or_else(|| ParseSalaryFieldError(s.to_string()))
    }
}

impl fmt::Display for SalaryField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
