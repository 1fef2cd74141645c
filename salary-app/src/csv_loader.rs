//! CSV import of salary records.
//!
//! ## CSV Format
//!
//! Headers are matched by name, so column order does not matter. Header
//! names are case-sensitive.
//!
//! | Column                       | Required | Notes                      |
//! |------------------------------|----------|----------------------------|
//! | `income`                     | yes      | annual gross salary        |
//! | `social_insurance_deduction` | no       | empty or missing means 0   |
//! | `other_deduction`            | no       | empty or missing means 0   |
//! | `tax_credit`                 | no       | empty or missing means 0   |
//!
//! Amounts may use `,` as a thousands separator (quote the cell) and are read
//! in the caller's [`DisplayUnit`].
//!
//! ```csv
//! income,social_insurance_deduction,other_deduction,tax_credit
//! 5000000,972500,,
//! "7,200,000",1400400,120000,30000
//! ```

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use salary_core::{NewSalaryRecord, SalaryField, SalaryTaxError, SalaryTaxInput};
use serde::Deserialize;

use crate::units::DisplayUnit;
use crate::utils::{ParseDecimalError, parse_decimal};

#[derive(Debug, Deserialize)]
struct CsvRow {
    income: String,
    #[serde(default)]
    social_insurance_deduction: String,
    #[serde(default)]
    other_deduction: String,
    #[serde(default)]
    tax_credit: String,
}

impl CsvRow {
    fn cell(
        &self,
        field: SalaryField,
    ) -> &str {
        match field {
            SalaryField::Income => &self.income,
            SalaryField::SocialInsuranceDeduction => &self.social_insurance_deduction,
            SalaryField::OtherDeduction => &self.other_deduction,
            SalaryField::TaxCredit => &self.tax_credit,
        }
    }
}

/// Errors that can occur while loading or converting CSV data.
///
/// Row numbers are 1-based and count data rows only.
#[derive(Debug, thiserror::Error)]
pub enum CsvImportError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bad structure, missing `income` column, wrong column count.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("row {row}, column '{field}': {source}")]
    InvalidAmount {
        row: usize,
        field: SalaryField,
        #[source]
        source: ParseDecimalError,
    },

    #[error("row {row}: {source}")]
    InvalidRecord {
        row: usize,
        #[source]
        source: SalaryTaxError,
    },
}

fn convert_row(
    row: &CsvRow,
    row_number: usize,
    user_id: &str,
    unit: DisplayUnit,
) -> Result<NewSalaryRecord, CsvImportError> {
    let amount = |field: SalaryField| -> Result<Decimal, CsvImportError> {
        let value = parse_decimal(row.cell(field)).map_err(|source| {
            CsvImportError::InvalidAmount {
                row: row_number,
                field,
                source,
            }
        })?;
        unit.to_yen(field, value)
            .map_err(|source| CsvImportError::InvalidRecord {
                row: row_number,
                source,
            })
    };

    let input = SalaryTaxInput::new(
        amount(SalaryField::Income)?,
        amount(SalaryField::SocialInsuranceDeduction)?,
        amount(SalaryField::OtherDeduction)?,
        amount(SalaryField::TaxCredit)?,
    );
    input
        .validate()
        .map_err(|source| CsvImportError::InvalidRecord {
            row: row_number,
            source,
        })?;

    Ok(NewSalaryRecord {
        user_id: user_id.to_string(),
        income: input.income,
        social_insurance_deduction: input.social_insurance_deduction,
        other_deduction: input.other_deduction,
        tax_credit: input.tax_credit,
    })
}

/// Parse CSV text and return one record per data row, in file order.
pub fn load_from_str(
    input: &str,
    user_id: &str,
    unit: DisplayUnit,
) -> Result<Vec<NewSalaryRecord>, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row = result?;
            convert_row(&row, idx + 1, user_id, unit)
        })
        .collect()
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(
    path: &Path,
    user_id: &str,
    unit: DisplayUnit,
) -> Result<Vec<NewSalaryRecord>, CsvImportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CsvImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents, user_id, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const FULL_CSV: &str = "\
income,social_insurance_deduction,other_deduction,tax_credit
5000000,972500,0,0
\"7,200,000\",1400400,120000,30000
";

    #[test]
    fn test_full_csv_rows_in_file_order() {
        let records = load_from_str(FULL_CSV, "alice", DisplayUnit::Yen).expect("should parse");

        assert_eq!(
            records,
            vec![
                NewSalaryRecord {
                    user_id: "alice".to_string(),
                    income: dec!(5000000),
                    social_insurance_deduction: dec!(972500),
                    other_deduction: dec!(0),
                    tax_credit: dec!(0),
                },
                NewSalaryRecord {
                    user_id: "alice".to_string(),
                    income: dec!(7200000),
                    social_insurance_deduction: dec!(1400400),
                    other_deduction: dec!(120000),
                    tax_credit: dec!(30000),
                },
            ]
        );
    }

    #[test]
    fn test_blank_cells_are_zero() {
        let csv = "income,social_insurance_deduction,other_deduction,tax_credit\n3000000,,,\n";

        let records = load_from_str(csv, "alice", DisplayUnit::Yen).unwrap();

        assert_eq!(records[0].income, dec!(3000000));
        assert_eq!(records[0].social_insurance_deduction, Decimal::ZERO);
        assert_eq!(records[0].other_deduction, Decimal::ZERO);
        assert_eq!(records[0].tax_credit, Decimal::ZERO);
    }

    #[test]
    fn test_optional_columns_may_be_missing() {
        let csv = "income\n4000000\n";

        let records = load_from_str(csv, "alice", DisplayUnit::Yen).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].income, dec!(4000000));
        assert_eq!(records[0].tax_credit, Decimal::ZERO);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "tax_credit,income\n10000,6000000\n";

        let records = load_from_str(csv, "alice", DisplayUnit::Yen).unwrap();

        assert_eq!(records[0].income, dec!(6000000));
        assert_eq!(records[0].tax_credit, dec!(10000));
    }

    #[test]
    fn test_man_yen_amounts_are_scaled() {
        let csv = "income,social_insurance_deduction\n500,97.25\n";

        let records = load_from_str(csv, "alice", DisplayUnit::ManYen).unwrap();

        assert_eq!(records[0].income, dec!(5000000));
        assert_eq!(records[0].social_insurance_deduction, dec!(972500));
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let records = load_from_str("income\n", "alice", DisplayUnit::Yen).unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_income_column_is_parse_error() {
        let csv = "social_insurance_deduction\n972500\n";

        match load_from_str(csv, "alice", DisplayUnit::Yen).unwrap_err() {
            CsvImportError::Parse(_) => {}
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_amount_reports_row_and_column() {
        let csv = "income,tax_credit\n5000000,0\n6000000,lots\n";

        match load_from_str(csv, "alice", DisplayUnit::Yen).unwrap_err() {
            CsvImportError::InvalidAmount { row, field, source } => {
                assert_eq!(row, 2);
                assert_eq!(field, SalaryField::TaxCredit);
                assert_eq!(source.input(), "lots");
            }
            other => panic!("expected InvalidAmount, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let csv = "income,other_deduction\n5000000,-1\n";

        match load_from_str(csv, "alice", DisplayUnit::Yen).unwrap_err() {
            CsvImportError::InvalidRecord { row, source } => {
                assert_eq!(row, 1);
                assert_eq!(
                    source,
                    SalaryTaxError::NegativeInput {
                        field: SalaryField::OtherDeduction,
                        value: dec!(-1),
                    }
                );
            }
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_man_yen_amount_beyond_decimal_range_is_rejected() {
        let csv = "income,tax_credit\n500,0\n600,79228162514264337593543950\n";

        match load_from_str(csv, "alice", DisplayUnit::ManYen).unwrap_err() {
            CsvImportError::InvalidRecord { row, source } => {
                assert_eq!(row, 2);
                assert_eq!(
                    source,
                    SalaryTaxError::OutOfRange {
                        field: SalaryField::TaxCredit,
                    }
                );
            }
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let csv = "income,tax_credit\n5000000\n";

        assert!(matches!(
            load_from_str(csv, "alice", DisplayUnit::Yen),
            Err(CsvImportError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let result = load_from_file(
            Path::new("/definitely/not/here.csv"),
            "alice",
            DisplayUnit::Yen,
        );

        assert!(matches!(result, Err(CsvImportError::Io { .. })));
    }
}
