//! Text and JSON rendering of a salary estimate.

use std::fmt;

use rust_decimal::Decimal;
use salary_core::{SalaryField, SalaryRecord, SalaryTaxInput, TaxCalculationResult, TodoItem};
use serde::Serialize;

use crate::units::DisplayUnit;
use crate::utils::group_thousands;

/// Inputs plus breakdown, printed in `unit`.
#[derive(Debug, Clone)]
pub struct SalaryReport {
    pub input: SalaryTaxInput,
    pub result: TaxCalculationResult,
    pub unit: DisplayUnit,
}

impl SalaryReport {
    pub fn new(
        input: SalaryTaxInput,
        result: TaxCalculationResult,
        unit: DisplayUnit,
    ) -> Self {
        Self {
            input,
            result,
            unit,
        }
    }

    fn amount(
        &self,
        yen: Decimal,
    ) -> String {
        group_thousands(self.unit.from_yen(yen))
    }
}

impl fmt::Display for SalaryReport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = &self.result;

        writeln!(f, "Amounts in {}", self.unit)?;
        for field in SalaryField::ALL {
            writeln!(
                f,
                "{:<28}{:>16}",
                format!("{}:", field.label()),
                self.amount(self.input.field(field))
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Income {} - employment deduction {} = employment income {}",
            self.amount(self.input.income),
            self.amount(r.employment_deduction),
            self.amount(r.employment_income)
        )?;
        writeln!(
            f,
            "Employment income {} - deductions {} = taxable income {}",
            self.amount(r.employment_income),
            self.amount(r.total_deduction),
            self.amount(r.taxable_income)
        )?;
        writeln!(
            f,
            "Taxable income {} x {}% = tax amount {}",
            self.amount(r.taxable_income),
            r.tax_rate_percent.normalize(),
            self.amount(r.tax_amount)
        )?;
        writeln!(
            f,
            "Tax amount {} - tax credit {} = income tax {}",
            self.amount(r.tax_amount),
            self.amount(self.input.tax_credit),
            self.amount(r.final_tax)
        )?;
        writeln!(f)?;
        writeln!(f, "{:<28}{:>16}", "Income tax:", self.amount(r.final_tax))?;
        writeln!(f, "{:<28}{:>16}", "Residence tax:", self.amount(r.residence_tax))?;
        write!(f, "{:<28}{:>16}", "Total tax:", self.amount(r.total_tax))
    }
}

/// `--json` shape. Amounts are always in yen.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
    pub input: &'a SalaryTaxInput,
    pub result: &'a TaxCalculationResult,
}

impl<'a> From<&'a SalaryReport> for JsonReport<'a> {
    fn from(report: &'a SalaryReport) -> Self {
        Self {
            record_id: None,
            input: &report.input,
            result: &report.result,
        }
    }
}

/// One line per stored record, newest first.
pub fn history_table(
    records: &[(SalaryRecord, TaxCalculationResult)],
    unit: DisplayUnit,
) -> String {
    if records.is_empty() {
        return "No salary records saved yet.".to_string();
    }

    let amount = |yen: Decimal| group_thousands(unit.from_yen(yen));
    let mut out = format!(
        "{:>5}  {:<19}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}  ({})",
        "id", "saved", "income", "social ins.", "other", "credit", "total tax", unit
    );
    for (record, result) in records {
        let id = record.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let saved = record.created_at.map_or_else(
            || "-".to_string(),
            |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        out.push_str(&format!(
            "\n{:>5}  {:<19}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}",
            id,
            saved,
            amount(record.income),
            amount(record.social_insurance_deduction),
            amount(record.other_deduction),
            amount(record.tax_credit),
            amount(result.total_tax),
        ));
    }
    out
}

pub fn todo_list(items: &[TodoItem]) -> String {
    if items.is_empty() {
        return "No todos.".to_string();
    }

    items
        .iter()
        .map(|item| {
            let mark = if item.done { "x" } else { " " };
            format!("[{mark}] {:>4}  {}", item.id, item.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
