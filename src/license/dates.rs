use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};

use super::LicenseError;
use crate::types::PlanType;

/// Parses `YYYY-MM-DD` exactly; shorter forms such as `2025-3-1` are rejected.
#[must_use]
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[must_use]
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Adds whole months, clamping the day to the end of the target month.
pub fn add_months_clamped(date: NaiveDate, months: u32) -> Result<NaiveDate, LicenseError> {
    date.checked_add_months(Months::new(months))
        .ok_or(LicenseError::InvalidDate("Expiry date is out of range"))
}

/// Uses the explicit expiry when given, otherwise one plan period after `start`.
pub fn compute_expiry(
    start: NaiveDate,
    plan: PlanType,
    explicit: Option<NaiveDate>,
) -> Result<NaiveDate, LicenseError> {
    match explicit {
        Some(expiry) => Ok(expiry),
        None => add_months_clamped(start, plan.months()),
    }
}

/// A license lapses once the clock passes the start of its expiry day (UTC).
#[must_use]
pub fn is_past_expiry(expiry: NaiveDate, now: DateTime<Utc>) -> bool {
    now > expiry.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn test_strict_parse() {
        assert_eq!(
            parse_iso_date("2025-03-01"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert!(parse_iso_date("2025-3-01").is_none());
        assert!(parse_iso_date("2025/03/01").is_none());
        assert!(parse_iso_date("2025-02-30").is_none());
        assert!(parse_iso_date("2025-03-01T00:00:00Z").is_none());
        assert!(parse_iso_date("").is_none());
    }

    #[test]
    fn test_monthly_expiry_clamps_to_month_end() {
        assert_eq!(
            compute_expiry(date("2025-01-31"), PlanType::Monthly, None).unwrap(),
            date("2025-02-28")
        );
        assert_eq!(
            compute_expiry(date("2024-01-31"), PlanType::Monthly, None).unwrap(),
            date("2024-02-29")
        );
        assert_eq!(
            compute_expiry(date("2025-03-31"), PlanType::Monthly, None).unwrap(),
            date("2025-04-30")
        );
    }

    #[test]
    fn test_yearly_expiry() {
        assert_eq!(
            compute_expiry(date("2025-03-15"), PlanType::Yearly, None).unwrap(),
            date("2026-03-15")
        );
        assert_eq!(
            compute_expiry(date("2024-02-29"), PlanType::Yearly, None).unwrap(),
            date("2025-02-28")
        );
    }

    #[test]
    fn test_explicit_expiry_wins() {
        assert_eq!(
            compute_expiry(date("2025-03-15"), PlanType::Yearly, Some(date("2025-04-01"))).unwrap(),
            date("2025-04-01")
        );
    }

    #[test]
    fn test_past_expiry_boundary() {
        let expiry = date("2025-03-01");
        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        assert!(!is_past_expiry(expiry, midnight));
        assert!(is_past_expiry(expiry, midnight + chrono::Duration::seconds(1)));
        assert!(!is_past_expiry(expiry, midnight - chrono::Duration::days(1)));
    }
}
