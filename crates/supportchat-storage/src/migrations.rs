//! Database schema migrations.
//!
//! Applies the initial schema: documents, chat_sessions, chat_messages,
//! and the schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use supportchat_core::error::SupportError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), SupportError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| SupportError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| SupportError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), SupportError> {
    conn.execute_batch(
        "
        -- Reference documents. Natural (rowid) order is insertion order.
        CREATE TABLE IF NOT EXISTS documents (
            id          TEXT PRIMARY KEY NOT NULL,
            title       TEXT NOT NULL CHECK (length(title) > 0),
            content     TEXT NOT NULL CHECK (length(content) > 0),
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_created_at
            ON documents (created_at DESC);

        -- One row per client session key.
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL UNIQUE,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        -- Append-only turns, ordered by position within a session.
        CREATE TABLE IF NOT EXISTS chat_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_pk  TEXT NOT NULL,
            position    INTEGER NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content     TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL,
            UNIQUE (session_pk, position),
            FOREIGN KEY (session_pk) REFERENCES chat_sessions(id) ON DELETE CASCADE
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| SupportError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
