use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::license::parse_iso_date;
use crate::server::response::ApiError;
use crate::types::{LicenseStatus, PlanType, Role};

pub const EVENT_STATUSES: [&str; 4] = ["pending", "confirmed", "cancelled", "closed"];
pub const PAYMENT_STATUSES: [&str; 3] = ["paid", "unpaid", "partial"];

pub fn parse_role(value: &str) -> Result<Role, ApiError> {
    Role::parse(value).ok_or_else(|| ApiError::bad_request("Invalid role"))
}

pub fn parse_plan(value: &str) -> Result<PlanType, ApiError> {
    PlanType::parse(value).ok_or_else(|| ApiError::bad_request("Invalid plan type"))
}

pub fn parse_license_status(value: &str) -> Result<LicenseStatus, ApiError> {
    LicenseStatus::parse(value).ok_or_else(|| ApiError::bad_request("Invalid license status"))
}

pub fn parse_date_field(value: &str, field: &str) -> Result<NaiveDate, ApiError> {
    parse_iso_date(value)
        .ok_or_else(|| ApiError::bad_request(format!("{field} must be in YYYY-MM-DD format")))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_iso_date(value).map(|d| d.and_time(NaiveTime::MIN).and_utc()))
}

#[must_use]
pub fn is_valid_time(value: &str) -> bool {
    NaiveTime::parse_from_str(value, "%H:%M").is_ok()
        || NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok()
}

/// Collects human-readable problems with event fields instead of failing on the first.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn required<'a>(&mut self, value: Option<&'a str>, field: &str) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.0.push(format!("{field} is required"));
                None
            }
        }
    }

    pub fn date(&mut self, value: Option<&str>, field: &str) {
        if let Some(v) = value {
            if parse_iso_date(v).is_none() {
                self.0.push(format!("{field} must be in YYYY-MM-DD format"));
            }
        }
    }

    pub fn time(&mut self, value: Option<&str>, field: &str) {
        if let Some(v) = value {
            if !is_valid_time(v) {
                self.0.push(format!("{field} must be in HH:MM format"));
            }
        }
    }

    pub fn one_of(&mut self, value: Option<&str>, field: &str, allowed: &[&str]) {
        if let Some(v) = value {
            if !allowed.contains(&v) {
                self.0.push(format!("{field} must be one of: {}", allowed.join(", ")));
            }
        }
    }

    pub fn timestamp(&mut self, value: Option<&str>, field: &str) -> Option<DateTime<Utc>> {
        let v = value?;
        let parsed = parse_timestamp(v);
        if parsed.is_none() {
            self.0.push(format!("{field} must be an ISO 8601 timestamp"));
        }
        parsed
    }

    pub fn into_result(self, message: &str) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::invalid_fields(message, self.0))
        }
    }
}
