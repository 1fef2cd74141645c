//! Display units for yen amounts.
//!
//! Everything below the command line works in yen. Amounts typed by the user
//! and amounts printed back are scaled here and nowhere else.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use salary_core::{SalaryField, SalaryTaxError};
use serde::{Deserialize, Serialize};

use crate::utils::group_thousands;

const YEN_PER_MAN: Decimal = dec!(10000);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayUnit {
    #[default]
    Yen,
    /// 万円, ten thousand yen.
    ManYen,
}

impl DisplayUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yen => "yen",
            Self::ManYen => "man-yen",
        }
    }

    /// Converts an amount entered in this unit to yen.
    ///
    /// # Errors
    ///
    /// [`SalaryTaxError::OutOfRange`] naming `field` when the yen amount does
    /// not fit in a [`Decimal`].
    pub fn to_yen(
        &self,
        field: SalaryField,
        amount: Decimal,
    ) -> Result<Decimal, SalaryTaxError> {
        match self {
            Self::Yen => Ok(amount),
            Self::ManYen => amount
                .checked_mul(YEN_PER_MAN)
                .ok_or(SalaryTaxError::OutOfRange { field }),
        }
    }

    /// Converts a yen amount to this unit.
    pub fn from_yen(
        &self,
        yen: Decimal,
    ) -> Decimal {
        match self {
            Self::Yen => yen,
            Self::ManYen => yen / YEN_PER_MAN,
        }
    }

    /// `5,000,000 yen` or `500 man-yen`.
    pub fn format(
        &self,
        yen: Decimal,
    ) -> String {
        format!("{} {}", group_thousands(self.from_yen(yen)), self.as_str())
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "yen" => Ok(Self::Yen),
            "man-yen" | "man" => Ok(Self::ManYen),
            other => Err(format!("unknown display unit '{other}'; expected yen or man-yen")),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::parse_decimal;

    #[test]
    fn yen_is_identity() {
        assert_eq!(
            DisplayUnit::Yen.to_yen(SalaryField::Income, dec!(5000000)),
            Ok(dec!(5000000))
        );
        assert_eq!(DisplayUnit::Yen.from_yen(dec!(972500)), dec!(972500));
    }

    #[test]
    fn man_yen_scales_by_ten_thousand() {
        assert_eq!(
            DisplayUnit::ManYen.to_yen(SalaryField::Income, dec!(500)),
            Ok(dec!(5000000))
        );
        assert_eq!(
            DisplayUnit::ManYen.to_yen(SalaryField::SocialInsuranceDeduction, dec!(97.25)),
            Ok(dec!(972500))
        );
        assert_eq!(DisplayUnit::ManYen.from_yen(dec!(248750)), dec!(24.875));
    }

    #[test]
    fn man_yen_too_large_for_yen_is_out_of_range() {
        let amount = parse_decimal("79228162514264337593543950").unwrap();

        assert_eq!(
            DisplayUnit::ManYen.to_yen(SalaryField::Income, amount),
            Err(SalaryTaxError::OutOfRange {
                field: SalaryField::Income,
            })
        );
        assert_eq!(
            DisplayUnit::Yen.to_yen(SalaryField::Income, amount),
            Ok(amount)
        );
    }

    #[test]
    fn format_groups_digits_and_names_unit() {
        assert_eq!(DisplayUnit::Yen.format(dec!(5000000)), "5,000,000 yen");
        assert_eq!(DisplayUnit::ManYen.format(dec!(5000000)), "500 man-yen");
        assert_eq!(DisplayUnit::ManYen.format(dec!(-550000)), "-55 man-yen");
    }

    #[test]
    fn parses_config_spellings() {
        assert_eq!("yen".parse::<DisplayUnit>(), Ok(DisplayUnit::Yen));
        assert_eq!("Man-Yen".parse::<DisplayUnit>(), Ok(DisplayUnit::ManYen));
        assert_eq!("man_yen".parse::<DisplayUnit>(), Ok(DisplayUnit::ManYen));
        assert!("dollars".parse::<DisplayUnit>().is_err());
    }
}
