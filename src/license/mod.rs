//! License issuance and entitlement checks.
//!
//! Serials are generated optimistically: a candidate is probed against the
//! store and regenerated on collision. The unique index on
//! `(tenant_id, serial_number)` catches whatever slips between probe and insert,
//! and both paths surface as [`LicenseError::DuplicateSerial`].

mod dates;
mod serial;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use dates::{add_months_clamped, compute_expiry, format_iso_date, is_past_expiry, parse_iso_date};
pub use serial::{build_serial, random_segment, sanitize_base};

use crate::config::ServiceConfig;
use crate::error::Error as StoreError;
use crate::store::Store;
use crate::types::{License, LicenseStatus, PlanType, Tenant};

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("Serial number already exists")]
    DuplicateSerial,

    #[error("{0}")]
    InvalidDate(&'static str),

    #[error("Failed to generate a unique license serial number")]
    SerialExhausted,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LicenseError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists => LicenseError::DuplicateSerial,
            other => LicenseError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LicenseError>;

#[derive(Debug, Clone)]
pub struct SerialOptions<'a> {
    pub prefix: Option<&'a str>,
    pub user_name: Option<&'a str>,
    pub plan: PlanType,
    pub issued_on: NaiveDate,
    pub random_length: Option<i64>,
}

/// Fields for a new license. Dates are raw `YYYY-MM-DD` strings, checked on insert.
#[derive(Debug, Clone)]
pub struct LicenseInput {
    pub serial_number: String,
    pub user_name: String,
    pub plan_type: PlanType,
    pub start_date: String,
    pub expiry_date: String,
    pub status: LicenseStatus,
    pub notes: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct LicensePatch {
    pub serial_number: Option<String>,
    pub user_name: Option<String>,
    pub plan_type: Option<PlanType>,
    pub start_date: Option<String>,
    pub expiry_date: Option<String>,
    pub status: Option<LicenseStatus>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid {
        user: String,
        expiry: NaiveDate,
        plan: PlanType,
        status: LicenseStatus,
    },
    InvalidSerial,
    Inactive {
        status: LicenseStatus,
    },
    Expired {
        expiry: NaiveDate,
    },
}

pub struct LicenseEngine {
    store: Arc<dyn Store>,
    config: ServiceConfig,
}

fn validated_range(start: &str, expiry: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start =
        parse_iso_date(start).ok_or(LicenseError::InvalidDate("Invalid start date format"))?;
    let expiry =
        parse_iso_date(expiry).ok_or(LicenseError::InvalidDate("Invalid expiry date format"))?;
    if expiry < start {
        return Err(LicenseError::InvalidDate(
            "Expiry date must be after start date",
        ));
    }
    Ok((start, expiry))
}

impl LicenseEngine {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Label stored when a generated license names no assignee.
    #[must_use]
    pub fn unassigned_user(&self) -> &str {
        &self.config.unassigned_license_user
    }

    /// Generates a serial not yet used in the tenant, giving up after the configured attempts.
    pub fn generate_serial(&self, tenant: &Tenant, opts: &SerialOptions<'_>) -> Result<String> {
        let base = sanitize_base(
            opts.prefix.or(opts.user_name),
            &self.config.serial_fallback_base,
            self.config.serial_base_max_len,
        );
        let random_len = self.config.serial_random_len(opts.random_length);

        for _ in 0..self.config.serial_max_attempts {
            let candidate = build_serial(&base, opts.plan, opts.issued_on, &random_segment(random_len));
            if !self.store.serial_exists(tenant, &candidate, None)? {
                return Ok(candidate);
            }
        }

        tracing::warn!(tenant = %tenant, base = %base, "Serial generation exhausted its attempts");
        Err(LicenseError::SerialExhausted)
    }

    pub fn compute_expiry(
        &self,
        start: NaiveDate,
        plan: PlanType,
        explicit: Option<NaiveDate>,
    ) -> Result<NaiveDate> {
        compute_expiry(start, plan, explicit)
    }

    pub fn insert(&self, tenant: &Tenant, input: LicenseInput) -> Result<License> {
        let (start_date, expiry_date) = validated_range(&input.start_date, &input.expiry_date)?;

        if self.store.serial_exists(tenant, &input.serial_number, None)? {
            return Err(LicenseError::DuplicateSerial);
        }

        let now = Utc::now();
        let license = License {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.as_str().to_string(),
            serial_number: input.serial_number,
            user_name: input.user_name,
            plan_type: input.plan_type,
            start_date,
            expiry_date,
            status: input.status,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        self.store.create_license(&license)?;
        tracing::info!(tenant = %tenant, serial = %license.serial_number, "License created");
        Ok(license)
    }

    pub fn get(&self, tenant: &Tenant, id: &str) -> Result<Option<License>> {
        Ok(self.store.get_license(tenant, id)?)
    }

    pub fn list(&self, tenant: &Tenant) -> Result<Vec<License>> {
        Ok(self.store.list_licenses(tenant)?)
    }

    pub fn update(&self, tenant: &Tenant, mut license: License, patch: LicensePatch) -> Result<License> {
        if let Some(serial) = patch.serial_number {
            if serial != license.serial_number
                && self.store.serial_exists(tenant, &serial, Some(&license.id))?
            {
                return Err(LicenseError::DuplicateSerial);
            }
            license.serial_number = serial;
        }

        let start = patch
            .start_date
            .unwrap_or_else(|| format_iso_date(license.start_date));
        let expiry = patch
            .expiry_date
            .unwrap_or_else(|| format_iso_date(license.expiry_date));
        (license.start_date, license.expiry_date) = validated_range(&start, &expiry)?;

        if let Some(user_name) = patch.user_name {
            license.user_name = user_name;
        }
        if let Some(plan) = patch.plan_type {
            license.plan_type = plan;
        }
        if let Some(status) = patch.status {
            license.status = status;
        }
        if let Some(notes) = patch.notes {
            license.notes = notes;
        }
        license.updated_at = Utc::now();

        self.store.update_license(&license)?;
        Ok(license)
    }

    pub fn delete(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        Ok(self.store.delete_license(tenant, id)?)
    }

    /// Public entitlement check. Lapsed active licenses are flipped to `expired` and persisted.
    pub fn verify(&self, tenant: &Tenant, serial: &str, now: DateTime<Utc>) -> Result<Verification> {
        let Some(license) = self.store.get_license_by_serial(tenant, serial.trim())? else {
            return Ok(Verification::InvalidSerial);
        };

        if license.status != LicenseStatus::Active {
            return Ok(Verification::Inactive {
                status: license.status,
            });
        }

        if is_past_expiry(license.expiry_date, now) {
            self.store
                .set_license_status(tenant, &license.id, LicenseStatus::Expired, now)?;
            tracing::info!(tenant = %tenant, serial = %license.serial_number, "License marked expired");
            return Ok(Verification::Expired {
                expiry: license.expiry_date,
            });
        }

        Ok(Verification::Valid {
            user: license.user_name,
            expiry: license.expiry_date,
            plan: license.plan_type,
            status: license.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;
    use std::thread;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<dyn Store>, LicenseEngine, Tenant) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);
        let engine = LicenseEngine::new(store.clone(), ServiceConfig::default());
        (temp, store, engine, Tenant::new("acme").unwrap())
    }

    fn input(serial: &str, start: &str, expiry: &str) -> LicenseInput {
        LicenseInput {
            serial_number: serial.to_string(),
            user_name: "Grand Hall".to_string(),
            plan_type: PlanType::Monthly,
            start_date: start.to_string(),
            expiry_date: expiry.to_string(),
            status: LicenseStatus::Active,
            notes: None,
        }
    }

    fn opts(random_length: Option<i64>) -> SerialOptions<'static> {
        SerialOptions {
            prefix: None,
            user_name: Some("Grand Hall"),
            plan: PlanType::Yearly,
            issued_on: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            random_length,
        }
    }

    #[test]
    fn test_generated_serial_shape() {
        let (_temp, _store, engine, tenant) = setup();

        let serial = engine.generate_serial(&tenant, &opts(None)).unwrap();
        let parts: Vec<&str> = serial.split('-').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "GRANDHALL");
        assert_eq!(parts[1], "YR");
        assert_eq!(parts[2], "20250601");
        assert_eq!(parts[3].len(), 4);
    }

    #[test]
    fn test_prefix_beats_user_name() {
        let (_temp, _store, engine, tenant) = setup();
        let options = SerialOptions {
            prefix: Some("vip"),
            ..opts(Some(20))
        };

        let serial = engine.generate_serial(&tenant, &options).unwrap();
        assert!(serial.starts_with("VIP-YR-20250601-"));
        assert_eq!(serial.rsplit('-').next().unwrap().len(), 8);
    }

    #[test]
    fn test_generation_exhausts_when_space_is_full() {
        let (_temp, store, engine, tenant) = setup();
        let config = ServiceConfig {
            serial_random_len_range: 1..=1,
            serial_default_random_len: 1,
            ..ServiceConfig::default()
        };
        let engine_narrow = LicenseEngine::new(store.clone(), config);

        for c in "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".chars() {
            let serial = format!("GRANDHALL-YR-20250601-{c}");
            engine
                .insert(&tenant, input(&serial, "2025-06-01", "2026-06-01"))
                .unwrap();
        }

        let result = engine_narrow.generate_serial(&tenant, &opts(None));
        assert!(matches!(result, Err(LicenseError::SerialExhausted)));
    }

    #[test]
    fn test_insert_rejects_inverted_range() {
        let (_temp, _store, engine, tenant) = setup();

        let result = engine.insert(&tenant, input("S-1", "2025-03-10", "2025-03-01"));
        assert!(matches!(result, Err(LicenseError::InvalidDate(_))));
    }

    #[test]
    fn test_insert_rejects_loose_dates() {
        let (_temp, _store, engine, tenant) = setup();

        let result = engine.insert(&tenant, input("S-1", "2025-3-10", "2025-04-01"));
        assert!(matches!(
            result,
            Err(LicenseError::InvalidDate("Invalid start date format"))
        ));
    }

    #[test]
    fn test_insert_rejects_duplicate_serial() {
        let (_temp, _store, engine, tenant) = setup();

        engine
            .insert(&tenant, input("S-1", "2025-03-01", "2025-04-01"))
            .unwrap();
        let dup = engine.insert(&tenant, input("S-1", "2025-03-01", "2025-04-01"));
        assert!(matches!(dup, Err(LicenseError::DuplicateSerial)));

        let other = Tenant::new("globex").unwrap();
        engine
            .insert(&other, input("S-1", "2025-03-01", "2025-04-01"))
            .unwrap();
    }

    #[test]
    fn test_store_level_violation_maps_to_duplicate() {
        let err: LicenseError = StoreError::AlreadyExists.into();
        assert!(matches!(err, LicenseError::DuplicateSerial));
    }

    #[test]
    fn test_concurrent_generation_never_duplicates() {
        let (_temp, store, _engine, tenant) = setup();
        let engine = Arc::new(LicenseEngine::new(store.clone(), ServiceConfig::default()));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let tenant = tenant.clone();
                thread::spawn(move || {
                    let serial = engine.generate_serial(&tenant, &opts(Some(2)))?;
                    engine.insert(&tenant, input(&serial, "2025-06-01", "2026-06-01"))
                })
            })
            .collect();

        let mut serials = HashSet::new();
        for handle in handles {
            match handle.join().unwrap() {
                Ok(license) => assert!(serials.insert(license.serial_number)),
                Err(LicenseError::DuplicateSerial | LicenseError::SerialExhausted) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert!(!serials.is_empty());
        assert_eq!(store.list_licenses(&tenant).unwrap().len(), serials.len());
    }

    #[test]
    fn test_verify_paths() {
        let (_temp, store, engine, tenant) = setup();
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

        assert_eq!(
            engine.verify(&tenant, "NOPE", now).unwrap(),
            Verification::InvalidSerial
        );

        engine
            .insert(&tenant, input("LIVE", "2025-06-01", "2025-07-01"))
            .unwrap();
        assert_eq!(
            engine.verify(&tenant, "  LIVE ", now).unwrap(),
            Verification::Valid {
                user: "Grand Hall".to_string(),
                expiry: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                plan: PlanType::Monthly,
                status: LicenseStatus::Active,
            }
        );

        let mut disabled = input("OFF", "2025-06-01", "2025-07-01");
        disabled.status = LicenseStatus::Disabled;
        engine.insert(&tenant, disabled).unwrap();
        assert_eq!(
            engine.verify(&tenant, "OFF", now).unwrap(),
            Verification::Inactive {
                status: LicenseStatus::Disabled
            }
        );

        assert!(store.get_license_by_serial(&tenant, "LIVE").unwrap().is_some());
    }

    #[test]
    fn test_verify_flips_expired_and_persists() {
        let (_temp, store, engine, tenant) = setup();
        engine
            .insert(&tenant, input("OLD", "2025-01-01", "2025-02-01"))
            .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(
            engine.verify(&tenant, "OLD", now).unwrap(),
            Verification::Expired {
                expiry: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
            }
        );

        let stored = store.get_license_by_serial(&tenant, "OLD").unwrap().unwrap();
        assert_eq!(stored.status, LicenseStatus::Expired);

        assert_eq!(
            engine.verify(&tenant, "OLD", now + Duration::days(1)).unwrap(),
            Verification::Inactive {
                status: LicenseStatus::Expired
            }
        );
    }

    #[test]
    fn test_update_checks_serial_and_range() {
        let (_temp, _store, engine, tenant) = setup();
        engine
            .insert(&tenant, input("A", "2025-01-01", "2025-02-01"))
            .unwrap();
        let b = engine
            .insert(&tenant, input("B", "2025-01-01", "2025-02-01"))
            .unwrap();

        let dup = engine.update(
            &tenant,
            b.clone(),
            LicensePatch {
                serial_number: Some("A".to_string()),
                ..LicensePatch::default()
            },
        );
        assert!(matches!(dup, Err(LicenseError::DuplicateSerial)));

        let inverted = engine.update(
            &tenant,
            b.clone(),
            LicensePatch {
                expiry_date: Some("2024-12-31".to_string()),
                ..LicensePatch::default()
            },
        );
        assert!(matches!(inverted, Err(LicenseError::InvalidDate(_))));

        let renamed = engine
            .update(
                &tenant,
                b,
                LicensePatch {
                    serial_number: Some("B".to_string()),
                    status: Some(LicenseStatus::Disabled),
                    notes: Some(Some("paused".to_string())),
                    ..LicensePatch::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.status, LicenseStatus::Disabled);
        assert_eq!(renamed.notes.as_deref(), Some("paused"));
    }
}
