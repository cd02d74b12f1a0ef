// Window and rate helpers shared by the service reports
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::types::{HimsError, Result};

/// Days covered when a report is given no start date
pub const DEFAULT_REPORT_DAYS: i64 = 30;

/// Inclusive date window of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// Resolve optional bounds: the end defaults to today and the start to
    /// [`DEFAULT_REPORT_DAYS`] before the end
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        let end = end.unwrap_or_else(|| Utc::now().date_naive());
        let start = start.unwrap_or(end - Duration::days(DEFAULT_REPORT_DAYS));
        if start > end {
            return Err(HimsError::validation(
                "Report start date must not be after the end date",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

/// `part` as a percentage of `whole`, two decimal places; zero when `whole`
/// is zero
pub fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2)
}
