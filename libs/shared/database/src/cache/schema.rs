//! SQLite schema for the local cache.

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Clinician accounts
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    user_ref TEXT PRIMARY KEY,
    doctor_id INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS credentials (
    user_ref TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT,
    expires_at TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Remote mirrors, keyed by remote ids
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id INTEGER PRIMARY KEY,
    doctor_id INTEGER NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    gender TEXT NOT NULL DEFAULT 'Other',
    social_security_number TEXT NOT NULL DEFAULT '',
    cell_phone TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS appointments (
    appointment_id TEXT PRIMARY KEY,
    patient_id INTEGER NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
    doctor_id INTEGER NOT NULL,
    scheduled_time TEXT,
    arrival_time TEXT,
    time_waited_us INTEGER,                      -- microseconds
    status TEXT NOT NULL DEFAULT '',
    status_text TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_appointments_doctor_status ON appointments(doctor_id, status);

-- ============================================================================
-- Arrival outbox
-- ============================================================================

CREATE TABLE IF NOT EXISTS arrivals (
    appointment_id TEXT PRIMARY KEY,
    doctor_id INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_arrivals_doctor ON arrivals(doctor_id);
"#;
