//! SQL schema for the Quire SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

-- Only `status` is ever updated.
CREATE TABLE IF NOT EXISTS questions (
    question_id TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(project_id),
    text        TEXT NOT NULL,
    kind        TEXT NOT NULL,           -- 'single' | 'multi' | 'freeform'
    options     TEXT,                    -- JSON array, NULL for freeform
    tags        TEXT NOT NULL DEFAULT '[]',
    priority    INTEGER NOT NULL DEFAULT 0,
    spec_paths  TEXT NOT NULL DEFAULT '[]',
    status      TEXT NOT NULL DEFAULT 'unanswered',
    created_at  TEXT NOT NULL
);

-- The answer ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS answers (
    answer_id   TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(project_id),
    question_id TEXT NOT NULL REFERENCES questions(question_id),
    value_json  TEXT NOT NULL,
    version     INTEGER NOT NULL CHECK (version >= 1),
    supersedes  TEXT REFERENCES answers(answer_id),
    created_at  TEXT NOT NULL,
    UNIQUE (question_id, version),
    UNIQUE (supersedes)
);

-- Snapshots are append-only as well.
CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id       TEXT PRIMARY KEY,
    project_id        TEXT NOT NULL REFERENCES projects(project_id),
    spec_json         TEXT NOT NULL,
    trace_json        TEXT NOT NULL,
    derived_from_json TEXT NOT NULL,
    provider          TEXT NOT NULL,
    model             TEXT NOT NULL,
    prompt_version    TEXT NOT NULL,
    prompt_digest     TEXT NOT NULL,
    temperature       REAL NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issues (
    issue_id     TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(project_id),
    snapshot_id  TEXT NOT NULL REFERENCES snapshots(snapshot_id),
    kind         TEXT NOT NULL,
    severity     TEXT NOT NULL,
    message      TEXT NOT NULL,
    spec_paths   TEXT NOT NULL DEFAULT '[]',
    question_ids TEXT NOT NULL DEFAULT '[]',
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS questions_project_idx ON questions(project_id);
CREATE INDEX IF NOT EXISTS answers_question_idx  ON answers(question_id, version);
CREATE INDEX IF NOT EXISTS answers_project_idx   ON answers(project_id);
CREATE INDEX IF NOT EXISTS snapshots_project_idx ON snapshots(project_id, created_at);
CREATE INDEX IF NOT EXISTS issues_snapshot_idx   ON issues(snapshot_id);

PRAGMA user_version = 1;
";
