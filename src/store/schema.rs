pub const SCHEMA: &str = r#"
-- Users are scoped by tenant; ids repeat across tenants (EVN001 in each)
CREATE TABLE IF NOT EXISTS users (
    tenant_id TEXT NOT NULL,
    id TEXT NOT NULL,
    username TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'manager', 'host', 'operator')),
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,       -- argon2id PHC string
    password_salt TEXT NOT NULL,       -- b64 salt, also embedded in the hash
    is_default_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (tenant_id, id)
);

-- Sessions: only the sha256 of the bearer value is stored
CREATE TABLE IF NOT EXISTS user_tokens (
    token_hash TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    expires_at INTEGER NOT NULL,       -- unix millis
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (tenant_id, user_id) REFERENCES users(tenant_id, id) ON DELETE CASCADE
);

-- Events; tenant_id is NULL only for rows that predate tenancy.
-- Ids are unique per tenant, so a client-chosen id never reveals another tenant's rows.
CREATE TABLE IF NOT EXISTS events (
    id TEXT NOT NULL,
    tenant_id TEXT,
    title TEXT NOT NULL,
    venue TEXT NOT NULL,
    venue_id TEXT NOT NULL,
    color TEXT,
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    status TEXT NOT NULL,
    payment_status TEXT NOT NULL,
    payment_method TEXT,
    contact_name TEXT NOT NULL DEFAULT '',
    contact_phone TEXT NOT NULL DEFAULT '',
    contact_email TEXT NOT NULL DEFAULT '',
    pricing_data TEXT,                 -- opaque JSON owned by the UI
    notes TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    created_by_user_id TEXT,
    created_by_display_name TEXT,
    created_by_role TEXT,
    updated_by_user_id TEXT,
    updated_by_display_name TEXT,
    updated_by_role TEXT
);

CREATE TABLE IF NOT EXISTS licenses (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    serial_number TEXT NOT NULL,
    user_name TEXT NOT NULL,
    plan_type TEXT NOT NULL CHECK (plan_type IN ('monthly', 'yearly')),
    start_date TEXT NOT NULL,          -- YYYY-MM-DD
    expiry_date TEXT NOT NULL,         -- YYYY-MM-DD
    status TEXT NOT NULL CHECK (status IN ('active', 'expired', 'disabled')),
    notes TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_tenant_username ON users(tenant_id, username COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_user_tokens_user ON user_tokens(tenant_id, user_id);
CREATE INDEX IF NOT EXISTS idx_user_tokens_expiry ON user_tokens(expires_at);
CREATE UNIQUE INDEX IF NOT EXISTS idx_events_tenant_id ON events(tenant_id, id);
CREATE INDEX IF NOT EXISTS idx_events_tenant ON events(tenant_id, date, start_time);
CREATE UNIQUE INDEX IF NOT EXISTS idx_licenses_tenant_serial ON licenses(tenant_id, serial_number);
"#;
