use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        // Create schema_version table to track migrations
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        // Get current version
        let current_version: u32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        // Apply migrations up to current version
        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            // Execute migration in a transaction
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> {
    let mut migrations: HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: Initial schema
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    // Conversation stages table
    tx.execute(
        "CREATE TABLE stages (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            description TEXT NULL,
            sequence INTEGER NOT NULL DEFAULT 10,
            active INTEGER NOT NULL DEFAULT 1,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // Codes must be unique among active stages only; deactivated stages may
    // keep their old code so it can be reused.
    tx.execute(
        "CREATE UNIQUE INDEX ux_stages_code_active ON stages(code) WHERE active = 1",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_stages_sequence ON stages(sequence)",
        [],
    )?;

    // Product categories table (external CRM pipeline references)
    tx.execute(
        "CREATE TABLE categories (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            crm_ref TEXT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // Message templates table
    tx.execute(
        "CREATE TABLE templates (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            stage_id INTEGER NOT NULL REFERENCES stages(id),
            category_id INTEGER NULL REFERENCES categories(id),
            message TEXT NOT NULL,
            variables TEXT NOT NULL DEFAULT 'none',
            sequence INTEGER NOT NULL DEFAULT 10,
            active INTEGER NOT NULL DEFAULT 1,
            notes TEXT NULL,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;
    // Note: variables caches the comma-joined placeholder names extracted from
    // the message body ('none' when the body has no placeholders). It is
    // recomputed by the repository whenever the message changes.

    tx.execute(
        "CREATE INDEX idx_templates_stage_sequence ON templates(stage_id, sequence)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_templates_category ON templates(category_id)",
        [],
    )?;

    Ok(())
}

/// Migration v2: Add next_stage_id to stages
///
/// Stages gained an optional pointer to the stage the scripted flow moves to
/// next. NULL means the flow ends (or the automation decides).
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "ALTER TABLE stages ADD COLUMN next_stage_id INTEGER NULL REFERENCES stages(id)",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_migration_applies_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Apply migration twice
        MigrationManager::initialize(&conn).unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_foreign_key_constraints() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON").unwrap();
        MigrationManager::initialize(&conn).unwrap();

        // Try to insert a template with invalid stage_id
        let result = conn.execute(
            "INSERT INTO templates (name, stage_id, message, created_ts, modified_ts)
             VALUES ('Welcome', 999, 'Hola', 1000, 1000)",
            [],
        );

        // Should fail due to foreign key constraint
        assert!(result.is_err());
    }

    #[test]
    fn test_active_code_uniqueness() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        conn.execute(
            "INSERT INTO stages (name, code, created_ts, modified_ts)
             VALUES ('Bienvenida', 'bienvenida', 1000, 1000)",
            [],
        ).unwrap();

        // Second active stage with the same code violates the partial index
        let result = conn.execute(
            "INSERT INTO stages (name, code, created_ts, modified_ts)
             VALUES ('Bienvenida 2', 'bienvenida', 1000, 1000)",
            [],
        );
        assert!(result.is_err());

        // An inactive stage with the same code is allowed
        conn.execute(
            "INSERT INTO stages (name, code, active, created_ts, modified_ts)
             VALUES ('Bienvenida vieja', 'bienvenida', 0, 1000, 1000)",
            [],
        ).unwrap();
    }

    #[test]
    fn test_migration_v2_adds_next_stage() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        conn.execute(
            "INSERT INTO stages (name, code, created_ts, modified_ts)
             VALUES ('Cierre', 'cierre', 1000, 1000)",
            [],
        ).unwrap();
        let id: i64 = conn.last_insert_rowid();

        conn.execute(
            "UPDATE stages SET next_stage_id = ?1 WHERE id = ?1",
            [id],
        ).unwrap();

        let next: Option<i64> = conn.query_row(
            "SELECT next_stage_id FROM stages WHERE id = ?1",
            [id],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(next, Some(id));
    }
}
