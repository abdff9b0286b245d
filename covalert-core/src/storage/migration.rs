// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Schema Migrations
//!
//! Ordered, versioned schema steps. Applied versions are recorded in
//! `schema_version`; a run applies every pending step or none of them.

use rusqlite::{params, Connection, OptionalExtension};

use super::StorageError;

/// A single schema migration step.
pub struct Migration {
    /// Strictly increasing, starting at 1.
    pub version: u32,
    pub name: &'static str,
    /// SQL executed as one batch.
    pub sql: &'static str,
}

/// Applies [`Migration`]s to a connection.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Applies every migration newer than the current version in one
    /// transaction. On failure the schema stays at its previous version.
    pub fn run(conn: &Connection, migrations: &[Migration]) -> Result<(), StorageError> {
        if let Some(pair) = migrations
            .windows(2)
            .find(|w| w[0].version >= w[1].version)
        {
            return Err(StorageError::Migration(format!(
                "v{} is listed before v{}",
                pair[0].version, pair[1].version
            )));
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let current = Self::current_version(conn)?;
        let pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > current).collect();
        if pending.is_empty() {
            return Ok(());
        }

        let applied_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        // Dropping the transaction without commit rolls everything back
        let tx = conn.unchecked_transaction()?;
        for migration in pending {
            tx.execute_batch(migration.sql).map_err(|e| {
                StorageError::Migration(format!(
                    "v{} '{}' failed: {}",
                    migration.version, migration.name, e
                ))
            })?;
            tx.execute(
                "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, applied_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// The highest applied version, 0 for a fresh database.
    pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
        let has_table = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
                [],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !has_table {
            return Ok(0);
        }

        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })?;
        Ok(version.unwrap_or(0))
    }
}

/// Returns all registered migrations in version order.
///
/// New migrations are appended to the end of this list.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "baseline_schema",
            sql: MIGRATION_V1_BASELINE,
        },
        Migration {
            version: 2,
            name: "pending_contacts_index",
            sql: MIGRATION_V2_PENDING_INDEX,
        },
    ]
}

const MIGRATION_V1_BASELINE: &str = "
    -- Server-assigned identity (singleton)
    CREATE TABLE IF NOT EXISTS registration (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        device_id TEXT NOT NULL,
        server_public_key BLOB NOT NULL,
        protocol_version INTEGER NOT NULL,
        registered_at INTEGER NOT NULL
    );

    -- Contacts awaiting the next status report, one encrypted 32-byte record per row
    CREATE TABLE IF NOT EXISTS pending_contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_encrypted BLOB NOT NULL,
        added_at INTEGER NOT NULL
    );

    -- Last verdict received from the server (singleton)
    CREATE TABLE IF NOT EXISTS exposure_status (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        at_risk INTEGER NOT NULL,
        last_status_received_at INTEGER NOT NULL,
        last_exposure_at INTEGER
    );
";

const MIGRATION_V2_PENDING_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_pending_contacts_added_at
        ON pending_contacts (added_at);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 0);

        MigrationRunner::run(&conn, &all_migrations()).unwrap();

        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_rerun_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationRunner::run(&conn, &all_migrations()).unwrap();
        MigrationRunner::run(&conn, &all_migrations()).unwrap();

        let names: Vec<String> = conn
            .prepare("SELECT name FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, ["baseline_schema", "pending_contacts_index"]);
    }

    #[test]
    fn test_upgrade_from_v1_keeps_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = all_migrations();
        MigrationRunner::run(&conn, &migrations[..1]).unwrap();
        conn.execute(
            "INSERT INTO pending_contacts (record_encrypted, added_at) VALUES (x'00', 5)",
            [],
        )
        .unwrap();

        MigrationRunner::run(&conn, &migrations).unwrap();

        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 2);
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_contacts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = vec![
            Migration {
                version: 1,
                name: "ok",
                sql: "CREATE TABLE a (x INTEGER);",
            },
            Migration {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE b (;",
            },
        ];

        let result = MigrationRunner::run(&conn, &migrations);

        assert!(matches!(result, Err(StorageError::Migration(_))));
        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 0);
        let table_a: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_a, 0);
    }

    #[test]
    fn test_out_of_order_migrations_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = vec![
            Migration {
                version: 2,
                name: "second",
                sql: "SELECT 1;",
            },
            Migration {
                version: 1,
                name: "first",
                sql: "SELECT 1;",
            },
        ];

        assert!(matches!(
            MigrationRunner::run(&conn, &migrations),
            Err(StorageError::Migration(_))
        ));
    }
}
