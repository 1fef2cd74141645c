//! Common utility functions for tax calculations.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a yen amount to the nearest whole yen.
///
/// Midpoints are rounded away from zero, so `194.5` becomes `195` and
/// `-0.5` becomes `-1`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use salary_core::calculations::common::round_to_yen;
///
/// assert_eq!(round_to_yen(dec!(194.4)), dec!(194));
/// assert_eq!(round_to_yen(dec!(194.5)), dec!(195));
/// assert_eq!(round_to_yen(dec!(-27.5)), dec!(-28));
/// ```
pub fn round_to_yen(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use salary_core::calculations::common::max;
///
/// assert_eq!(max(dec!(0), dec!(-27500)), dec!(0));
/// assert_eq!(max(dec!(248750), dec!(0)), dec!(248750));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}
