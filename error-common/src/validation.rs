// Input checks shared by the service crates
use rust_decimal::Decimal;

use crate::types::{HimsError, Result};

/// Largest amount any money field holds: ten digits, two of them decimals
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Reject empty or whitespace-only text
pub fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HimsError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Reject zero and negative values
pub fn require_positive<T: PartialOrd + Default>(field: &str, value: T) -> Result<()> {
    if value <= T::default() {
        return Err(HimsError::validation(format!("{} must be greater than zero", field)));
    }
    Ok(())
}

pub fn require_range<T: PartialOrd + std::fmt::Display>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(HimsError::validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(())
}

/// Money in `0..=MAX_AMOUNT`
pub fn require_amount(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(HimsError::validation(format!("{} cannot be negative", field)));
    }
    if value > MAX_AMOUNT {
        return Err(HimsError::validation(format!(
            "{} cannot exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Sum money values, failing instead of overflowing
pub fn checked_sum<I>(field: &str, values: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| HimsError::validation(format!("{} is out of range", field)))
}
