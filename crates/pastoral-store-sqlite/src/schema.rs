//! SQL schema for the Pastoral SQLite store.
//!
//! Executed once at connection startup. Specialization tables share their
//! base table's id as both primary key and foreign key; `users.kind` and
//! `cases.kind` are the subtype discriminators.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    credential  TEXT NOT NULL,
    document_id TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'ACTIVE',  -- 'ACTIVE' | 'INACTIVE'
    kind        TEXT NOT NULL                    -- 'STUDENT' | 'STAFF'
);

-- Specialization rows outlive logical deletion of their base row: users
-- are never physically removed, so neither are these.
CREATE TABLE IF NOT EXISTS students (
    id                 INTEGER PRIMARY KEY REFERENCES users(id),
    referral_reason    TEXT NOT NULL,
    program            TEXT NOT NULL,
    cohort             TEXT NOT NULL,
    phone              TEXT NOT NULL,
    street             TEXT NOT NULL,
    door_number        TEXT NOT NULL,
    birth_date         TEXT NOT NULL,            -- YYYY-MM-DD
    photo              TEXT,
    health_system      TEXT NOT NULL,
    general_comments   TEXT NOT NULL,
    health_status      TEXT NOT NULL,
    confidential_notes TEXT NOT NULL DEFAULT ''  -- comma-delimited list
);

CREATE TABLE IF NOT EXISTS roles (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS permissions (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS role_permissions (
    role_id       INTEGER NOT NULL REFERENCES roles(id),
    permission_id INTEGER NOT NULL REFERENCES permissions(id),
    PRIMARY KEY (role_id, permission_id)
);

CREATE TABLE IF NOT EXISTS staff (
    id      INTEGER PRIMARY KEY REFERENCES users(id),
    role_id INTEGER REFERENCES roles(id)
);

CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cases (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    title             TEXT NOT NULL,
    code              TEXT NOT NULL,             -- CASE-<year>-<4 digits>
    occurred_at       TEXT NOT NULL,             -- RFC 3339 UTC
    channel           TEXT NOT NULL,             -- 'IN_PERSON' | 'PHONE' | 'EMAIL' | 'OTHER'
    comment           TEXT NOT NULL,
    confidential      INTEGER NOT NULL,
    category_id       INTEGER NOT NULL REFERENCES categories(id),
    student_id        INTEGER NOT NULL REFERENCES users(id),
    creator_id        INTEGER NOT NULL REFERENCES users(id),
    kind              TEXT NOT NULL,             -- 'COMMON' | 'INCIDENT'
    calendar_event_id TEXT
);

-- Case deletion is physical, so the specialization rows cascade with the
-- base row (users, deleted logically, keep theirs).
CREATE TABLE IF NOT EXISTS common_cases (
    id         INTEGER PRIMARY KEY REFERENCES cases(id) ON DELETE CASCADE,
    motivation TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS incidents (
    id          INTEGER PRIMARY KEY REFERENCES cases(id) ON DELETE CASCADE,
    location    TEXT NOT NULL,
    involved    TEXT NOT NULL,                   -- comma-delimited list
    reporter_id INTEGER NOT NULL REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS staff_role_idx     ON staff(role_id);
CREATE INDEX IF NOT EXISTS cases_student_idx  ON cases(student_id);
CREATE INDEX IF NOT EXISTS cases_category_idx ON cases(category_id);

PRAGMA user_version = 1;
";
