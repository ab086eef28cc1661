use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str = "tenant_id, id, username, role, first_name, last_name, phone, email, \
     password_hash, password_salt, is_default_admin, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, tenant_id, title, venue, venue_id, color, date, start_time, \
     end_time, status, payment_status, payment_method, contact_name, contact_phone, \
     contact_email, pricing_data, notes, created_at, updated_at, created_by_user_id, \
     created_by_display_name, created_by_role, updated_by_user_id, updated_by_display_name, \
     updated_by_role";

const LICENSE_COLUMNS: &str = "id, tenant_id, serial_number, user_name, plan_type, start_date, \
     expiry_date, status, notes, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(|| {
        tracing::error!("Invalid token expiry in database: {ms}");
        DateTime::<Utc>::MIN_UTC
    })
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn column_with<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unexpected value '{raw}'")))
}

fn optional_role(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Role>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .and_then(|raw| Role::parse(&raw)))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| conversion_error(idx, format!("invalid date '{raw}': {e}")))
}

/// Maps a uniqueness or primary-key violation to `AlreadyExists`.
fn map_insert_error(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Error::AlreadyExists
        }
        _ => Error::from(e),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        tenant_id: row.get(0)?,
        id: row.get(1)?,
        username: row.get(2)?,
        role: column_with(row, 3, Role::parse)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        phone: row.get(6)?,
        email: row.get(7)?,
        password_hash: row.get(8)?,
        password_salt: row.get(9)?,
        is_default_admin: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<SessionToken> {
    Ok(SessionToken {
        token_hash: row.get(0)?,
        tenant_id: row.get(1)?,
        user_id: row.get(2)?,
        expires_at: from_millis(row.get(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let pricing = match row.get::<_, Option<String>>(15)? {
        Some(raw) => Some(
            serde_json::from_str(&raw)
                .map_err(|e| conversion_error(15, format!("invalid pricing json: {e}")))?,
        ),
        None => None,
    };

    let created_by = row
        .get::<_, Option<String>>(19)?
        .map(|user_id| -> rusqlite::Result<Attribution> {
            Ok(Attribution {
                user_id,
                display_name: row.get(20)?,
                role: optional_role(row, 21)?,
            })
        })
        .transpose()?;

    let updated_by = row
        .get::<_, Option<String>>(22)?
        .map(|user_id| -> rusqlite::Result<Attribution> {
            Ok(Attribution {
                user_id,
                display_name: row.get(23)?,
                role: optional_role(row, 24)?,
            })
        })
        .transpose()?;

    Ok(Event {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        title: row.get(2)?,
        venue: row.get(3)?,
        venue_id: row.get(4)?,
        color: row.get(5)?,
        date: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        status: row.get(9)?,
        payment_status: row.get(10)?,
        payment_method: row.get(11)?,
        contact: Contact {
            name: row.get(12)?,
            phone: row.get(13)?,
            email: row.get(14)?,
        },
        pricing,
        notes: row.get(16)?,
        created_at: parse_datetime(&row.get::<_, String>(17)?),
        updated_at: parse_datetime(&row.get::<_, String>(18)?),
        created_by,
        updated_by,
    })
}

fn license_from_row(row: &Row<'_>) -> rusqlite::Result<License> {
    Ok(License {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        serial_number: row.get(2)?,
        user_name: row.get(3)?,
        plan_type: column_with(row, 4, PlanType::parse)?,
        start_date: date_column(row, 5)?,
        expiry_date: date_column(row, 6)?,
        status: column_with(row, 7, LicenseStatus::parse)?,
        notes: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn insert_token(conn: &Connection, token: &SessionToken) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO user_tokens (token_hash, tenant_id, user_id, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            token.token_hash,
            token.tenant_id,
            token.user_id,
            token.expires_at.timestamp_millis(),
            format_datetime(&token.created_at),
        ],
    )
}

fn insert_event(conn: &Connection, event: &Event) -> rusqlite::Result<usize> {
    let pricing = event.pricing.as_ref().map(|p| p.to_string());
    let created_by = event.created_by.as_ref();
    let updated_by = event.updated_by.as_ref();

    conn.execute(
        &format!(
            "INSERT INTO events ({EVENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)"
        ),
        params![
            event.id,
            event.tenant_id,
            event.title,
            event.venue,
            event.venue_id,
            event.color,
            event.date,
            event.start_time,
            event.end_time,
            event.status,
            event.payment_status,
            event.payment_method,
            event.contact.name,
            event.contact.phone,
            event.contact.email,
            pricing,
            event.notes,
            format_datetime(&event.created_at),
            format_datetime(&event.updated_at),
            created_by.map(|a| a.user_id.as_str()),
            created_by.and_then(|a| a.display_name.as_deref()),
            created_by.and_then(|a| a.role).map(Role::as_str),
            updated_by.map(|a| a.user_id.as_str()),
            updated_by.and_then(|a| a.display_name.as_deref()),
            updated_by.and_then(|a| a.role).map(Role::as_str),
        ],
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    user.tenant_id,
                    user.id,
                    user.username,
                    user.role.as_str(),
                    user.first_name,
                    user.last_name,
                    user.phone,
                    user.email,
                    user.password_hash,
                    user.password_salt,
                    user.is_default_admin,
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn get_user(&self, tenant: &Tenant, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ?1 AND id = ?2"),
            params![tenant.as_str(), id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, tenant: &Tenant, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE tenant_id = ?1 AND username = ?2 COLLATE NOCASE LIMIT 1"
            ),
            params![tenant.as_str(), username.trim()],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, tenant: &Tenant) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ?1 ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map(params![tenant.as_str()], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE users SET first_name = ?1, last_name = ?2, phone = ?3, email = ?4,
                     role = ?5, password_hash = ?6, password_salt = ?7, updated_at = ?8
                 WHERE tenant_id = ?9 AND id = ?10",
                params![
                    user.first_name,
                    user.last_name,
                    user.phone,
                    user.email,
                    user.role.as_str(),
                    user.password_hash,
                    user.password_salt,
                    format_datetime(&user.updated_at),
                    user.tenant_id,
                    user.id,
                ],
            )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM users WHERE tenant_id = ?1 AND id = ?2",
            params![tenant.as_str(), id],
        )?;
        Ok(rows > 0)
    }

    fn max_user_sequence(&self, tenant: &Tenant, prefix: &str) -> Result<Option<u32>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM users WHERE tenant_id = ?1")?;
        let ids = stmt
            .query_map(params![tenant.as_str()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ids
            .iter()
            .filter_map(|id| id.strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max())
    }

    fn has_default_admin(&self, tenant: &Tenant) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE tenant_id = ?1 AND is_default_admin = 1",
            params![tenant.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Session token operations

    fn create_token(&self, token: &SessionToken) -> Result<()> {
        insert_token(&self.conn(), token).map_err(map_insert_error)?;
        Ok(())
    }

    fn replace_user_tokens(&self, token: &SessionToken) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let replaced = tx.execute(
            "DELETE FROM user_tokens WHERE tenant_id = ?1 AND user_id = ?2",
            params![token.tenant_id, token.user_id],
        )?;
        insert_token(&tx, token).map_err(map_insert_error)?;

        tx.commit()?;
        Ok(replaced)
    }

    fn get_token(&self, tenant: &Tenant, token_hash: &str) -> Result<Option<SessionToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT token_hash, tenant_id, user_id, expires_at, created_at
             FROM user_tokens WHERE token_hash = ?1 AND tenant_id = ?2",
            params![token_hash, tenant.as_str()],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, token_hash: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM user_tokens WHERE token_hash = ?1",
            params![token_hash],
        )?;
        Ok(rows > 0)
    }

    fn delete_user_tokens(&self, tenant: &Tenant, user_id: &str) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM user_tokens WHERE tenant_id = ?1 AND user_id = ?2",
            params![tenant.as_str(), user_id],
        )?;
        Ok(rows)
    }

    fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM user_tokens WHERE expires_at < ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(rows)
    }

    // Event operations

    fn create_event(&self, event: &Event) -> Result<()> {
        insert_event(&self.conn(), event).map_err(map_insert_error)?;
        Ok(())
    }

    fn create_events(&self, events: &[Event]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for event in events {
            insert_event(&tx, event).map_err(map_insert_error)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_event(&self, tenant: &Tenant, id: &str) -> Result<Option<Event>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND tenant_id = ?2"),
            params![id, tenant.as_str()],
            event_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_events(&self, tenant: &Tenant) -> Result<Vec<Event>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE tenant_id = ?1
             ORDER BY date ASC, start_time ASC"
        ))?;

        let rows = stmt.query_map(params![tenant.as_str()], event_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn adopt_ownerless_events(&self, tenant: &Tenant) -> Result<usize> {
        let rows = self.conn().execute(
            "UPDATE events SET tenant_id = ?1
             WHERE tenant_id IS NULL
               AND id NOT IN (SELECT id FROM events WHERE tenant_id = ?1)",
            params![tenant.as_str()],
        )?;
        Ok(rows)
    }

    fn update_event(&self, event: &Event) -> Result<()> {
        let pricing = event.pricing.as_ref().map(|p| p.to_string());
        let updated_by = event.updated_by.as_ref();

        let rows = self.conn().execute(
            "UPDATE events SET title = ?1, venue = ?2, venue_id = ?3, color = ?4, date = ?5,
                 start_time = ?6, end_time = ?7, status = ?8, payment_status = ?9,
                 payment_method = ?10, contact_name = ?11, contact_phone = ?12,
                 contact_email = ?13, pricing_data = ?14, notes = ?15, updated_at = ?16,
                 updated_by_user_id = ?17, updated_by_display_name = ?18, updated_by_role = ?19
             WHERE id = ?20 AND tenant_id = ?21",
            params![
                event.title,
                event.venue,
                event.venue_id,
                event.color,
                event.date,
                event.start_time,
                event.end_time,
                event.status,
                event.payment_status,
                event.payment_method,
                event.contact.name,
                event.contact.phone,
                event.contact.email,
                pricing,
                event.notes,
                format_datetime(&event.updated_at),
                updated_by.map(|a| a.user_id.as_str()),
                updated_by.and_then(|a| a.display_name.as_deref()),
                updated_by.and_then(|a| a.role).map(Role::as_str),
                event.id,
                event.tenant_id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_event(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM events WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant.as_str()],
        )?;
        Ok(rows > 0)
    }

    fn delete_tenant_events(&self, tenant: &Tenant) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM events WHERE tenant_id = ?1",
            params![tenant.as_str()],
        )?;
        Ok(rows)
    }

    // License operations

    fn create_license(&self, license: &License) -> Result<()> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO licenses ({LICENSE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    license.id,
                    license.tenant_id,
                    license.serial_number,
                    license.user_name,
                    license.plan_type.as_str(),
                    format_date(&license.start_date),
                    format_date(&license.expiry_date),
                    license.status.as_str(),
                    license.notes,
                    format_datetime(&license.created_at),
                    format_datetime(&license.updated_at),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn get_license(&self, tenant: &Tenant, id: &str) -> Result<Option<License>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE id = ?1 AND tenant_id = ?2"),
            params![id, tenant.as_str()],
            license_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_license_by_serial(&self, tenant: &Tenant, serial: &str) -> Result<Option<License>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {LICENSE_COLUMNS} FROM licenses WHERE tenant_id = ?1 AND serial_number = ?2"
            ),
            params![tenant.as_str(), serial],
            license_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn serial_exists(
        &self,
        tenant: &Tenant,
        serial: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM licenses
             WHERE tenant_id = ?1 AND serial_number = ?2 AND (?3 IS NULL OR id != ?3)",
            params![tenant.as_str(), serial, exclude_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_licenses(&self, tenant: &Tenant) -> Result<Vec<License>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses WHERE tenant_id = ?1
             ORDER BY created_at DESC, id"
        ))?;

        let rows = stmt.query_map(params![tenant.as_str()], license_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_license(&self, license: &License) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE licenses SET serial_number = ?1, user_name = ?2, plan_type = ?3,
                     start_date = ?4, expiry_date = ?5, status = ?6, notes = ?7, updated_at = ?8
                 WHERE id = ?9 AND tenant_id = ?10",
                params![
                    license.serial_number,
                    license.user_name,
                    license.plan_type.as_str(),
                    format_date(&license.start_date),
                    format_date(&license.expiry_date),
                    license.status.as_str(),
                    license.notes,
                    format_datetime(&license.updated_at),
                    license.id,
                    license.tenant_id,
                ],
            )
            .map_err(map_insert_error)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_license_status(
        &self,
        tenant: &Tenant,
        id: &str,
        status: LicenseStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE licenses SET status = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4",
            params![status.as_str(), format_datetime(&at), id, tenant.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_license(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM licenses WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant.as_str()],
        )?;
        Ok(rows > 0)
    }
}
