use rusqlite::{Connection, OptionalExtension};
use crate::models::Stage;
use anyhow::{Context, Result};

/// Save-time validation failures for stage writes
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StageValidationError {
    #[error("A stage cannot be set as its own next stage")]
    SelfReference,
    #[error("Stage code '{0}' is already used by an active stage")]
    DuplicateCode(String),
}

/// Conversation stage repository for database operations
///
/// Stages are soft-deleted: `deactivate` flips the active flag and the
/// resolver only ever sees active stages. Codes are unique among active
/// stages, so a deactivated stage's code can be reused.
pub struct StageRepo;

impl StageRepo {
    /// Create a new stage with full field support
    pub fn create_full(
        conn: &Connection,
        name: &str,
        code: &str,
        description: Option<&str>,
        sequence: Option<i64>,
        next_stage_id: Option<i64>,
    ) -> Result<Stage> {
        if Self::get_active_by_code(conn, code)?.is_some() {
            return Err(StageValidationError::DuplicateCode(code.to_string()).into());
        }

        let mut stage = Stage::new(name.to_string(), code.to_string());
        stage.description = description.map(|s| s.to_string());
        if let Some(seq) = sequence {
            stage.sequence = seq;
        }
        stage.next_stage_id = next_stage_id;

        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO stages (name, code, description, sequence, next_stage_id, active, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
            rusqlite::params![
                stage.name,
                stage.code,
                stage.description,
                stage.sequence,
                stage.next_stage_id,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create stage: {}", code))?;

        let id = conn.last_insert_rowid();
        Ok(Stage {
            id: Some(id),
            ..stage
        })
    }

    /// Create a new stage (name and code only)
    pub fn create(conn: &Connection, name: &str, code: &str) -> Result<Stage> {
        Self::create_full(conn, name, code, None, None, None)
    }

    /// Get stage by ID (active or not)
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Stage>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, code, description, sequence, next_stage_id, active, created_ts, modified_ts
             FROM stages WHERE id = ?1"
        )?;

        let stage = stmt.query_row([id], |row| {
            Ok(Stage {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                code: row.get(2)?,
                description: row.get(3)?,
                sequence: row.get(4)?,
                next_stage_id: row.get(5)?,
                active: row.get::<_, i64>(6)? != 0,
                created_ts: row.get(7)?,
                modified_ts: row.get(8)?,
            })
        }).optional()?;

        Ok(stage)
    }

    /// Get the active stage for a lookup code
    pub fn get_active_by_code(conn: &Connection, code: &str) -> Result<Option<Stage>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, code, description, sequence, next_stage_id, active, created_ts, modified_ts
             FROM stages WHERE code = ?1 AND active = 1"
        )?;

        let stage = stmt.query_row([code], |row| {
            Ok(Stage {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                code: row.get(2)?,
                description: row.get(3)?,
                sequence: row.get(4)?,
                next_stage_id: row.get(5)?,
                active: row.get::<_, i64>(6)? != 0,
                created_ts: row.get(7)?,
                modified_ts: row.get(8)?,
            })
        }).optional()?;

        Ok(stage)
    }

    /// List stages ordered by sequence (optionally including inactive ones)
    pub fn list(conn: &Connection, include_inactive: bool) -> Result<Vec<Stage>> {
        let query = if include_inactive {
            "SELECT id, name, code, description, sequence, next_stage_id, active, created_ts, modified_ts
             FROM stages ORDER BY sequence, id"
        } else {
            "SELECT id, name, code, description, sequence, next_stage_id, active, created_ts, modified_ts
             FROM stages WHERE active = 1 ORDER BY sequence, id"
        };

        let mut stmt = conn.prepare(query)?;
        let rows = stmt.query_map([], |row| {
            Ok(Stage {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                code: row.get(2)?,
                description: row.get(3)?,
                sequence: row.get(4)?,
                next_stage_id: row.get(5)?,
                active: row.get::<_, i64>(6)? != 0,
                created_ts: row.get(7)?,
                modified_ts: row.get(8)?,
            })
        })?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    /// All active lookup codes (for typo suggestions)
    pub fn active_codes(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT code FROM stages WHERE active = 1 ORDER BY sequence, id"
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut codes = Vec::new();
        for row in rows {
            codes.push(row?);
        }
        Ok(codes)
    }

    /// Update a stage row
    ///
    /// `description` and `next_stage_id` use nested Options so callers can
    /// clear them (Some(None)) or leave them untouched (None).
    pub fn update(
        conn: &Connection,
        id: i64,
        name: Option<&str>,
        code: Option<&str>,
        description: Option<Option<&str>>,
        sequence: Option<i64>,
        next_stage_id: Option<Option<i64>>,
    ) -> Result<()> {
        if next_stage_id == Some(Some(id)) {
            return Err(StageValidationError::SelfReference.into());
        }

        if let Some(new_code) = code {
            if let Some(existing) = Self::get_active_by_code(conn, new_code)? {
                if existing.id != Some(id) {
                    return Err(StageValidationError::DuplicateCode(new_code.to_string()).into());
                }
            }
        }

        // Build dynamic update
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(n) = name {
            sets.push("name = ?");
            params.push(Box::new(n.to_string()));
        }
        if let Some(c) = code {
            sets.push("code = ?");
            params.push(Box::new(c.to_string()));
        }
        if let Some(d) = description {
            sets.push("description = ?");
            params.push(Box::new(d.map(|s| s.to_string())));
        }
        if let Some(seq) = sequence {
            sets.push("sequence = ?");
            params.push(Box::new(seq));
        }
        if let Some(next) = next_stage_id {
            sets.push("next_stage_id = ?");
            params.push(Box::new(next));
        }

        if sets.is_empty() {
            return Ok(());
        }

        sets.push("modified_ts = ?");
        params.push(Box::new(chrono::Utc::now().timestamp()));

        // Number the parameters
        let mut numbered_sets = Vec::new();
        for (i, set) in sets.iter().enumerate() {
            numbered_sets.push(set.replace('?', &format!("?{}", i + 1)));
        }
        let id_param = params.len() + 1;
        let sql = format!(
            "UPDATE stages SET {} WHERE id = ?{}",
            numbered_sets.join(", "),
            id_param
        );
        params.push(Box::new(id));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let updated = conn.execute(&sql, param_refs.as_slice())
            .with_context(|| format!("Failed to update stage id={}", id))?;

        if updated == 0 {
            anyhow::bail!("No stage found with id={}", id);
        }

        Ok(())
    }

    /// Deactivate (soft delete) an active stage
    pub fn deactivate(conn: &Connection, code: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let rows_affected = conn.execute(
            "UPDATE stages SET active = 0, modified_ts = ?1 WHERE code = ?2 AND active = 1",
            rusqlite::params![now, code],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("No active stage with code '{}'", code);
        }

        Ok(())
    }

    /// Reactivate the most recently deactivated stage for a code
    pub fn activate(conn: &Connection, code: &str) -> Result<()> {
        if Self::get_active_by_code(conn, code)?.is_some() {
            anyhow::bail!("Stage code '{}' is already active", code);
        }

        let now = chrono::Utc::now().timestamp();
        let rows_affected = conn.execute(
            "UPDATE stages SET active = 1, modified_ts = ?1
             WHERE id = (SELECT id FROM stages WHERE code = ?2 AND active = 0
                         ORDER BY modified_ts DESC, id DESC LIMIT 1)",
            rusqlite::params![now, code],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("No inactive stage with code '{}'", code);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_create_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stage = StageRepo::create(&conn, "Bienvenida Inicial", "bienvenida").unwrap();

        assert_eq!(stage.code, "bienvenida");
        assert_eq!(stage.sequence, 10);
        assert!(stage.active);
        assert!(stage.id.is_some());
    }

    #[test]
    fn test_duplicate_active_code_rejected() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create(&conn, "Bienvenida", "bienvenida").unwrap();

        let result = StageRepo::create(&conn, "Otra Bienvenida", "bienvenida");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<StageValidationError>(),
            Some(&StageValidationError::DuplicateCode("bienvenida".to_string()))
        );
    }

    #[test]
    fn test_code_reusable_after_deactivation() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create(&conn, "Bienvenida", "bienvenida").unwrap();
        StageRepo::deactivate(&conn, "bienvenida").unwrap();

        // The code is free again
        let stage = StageRepo::create(&conn, "Bienvenida v2", "bienvenida").unwrap();
        assert!(stage.active);
    }

    #[test]
    fn test_get_active_by_code_ignores_inactive() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create(&conn, "Precios", "precios").unwrap();
        StageRepo::deactivate(&conn, "precios").unwrap();

        let found = StageRepo::get_active_by_code(&conn, "precios").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_list_ordered_by_sequence() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create_full(&conn, "Cierre", "cierre", None, Some(30), None).unwrap();
        StageRepo::create_full(&conn, "Bienvenida", "bienvenida", None, Some(5), None).unwrap();
        StageRepo::create_full(&conn, "Precios", "precios", None, Some(20), None).unwrap();

        let stages = StageRepo::list(&conn, false).unwrap();
        let codes: Vec<&str> = stages.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["bienvenida", "precios", "cierre"]);
    }

    #[test]
    fn test_self_reference_rejected() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stage = StageRepo::create(&conn, "Bienvenida", "bienvenida").unwrap();
        let id = stage.id.unwrap();

        let result = StageRepo::update(&conn, id, None, None, None, None, Some(Some(id)));
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().downcast_ref::<StageValidationError>(),
            Some(&StageValidationError::SelfReference)
        );
    }

    #[test]
    fn test_next_stage_chain() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let first = StageRepo::create(&conn, "Bienvenida", "bienvenida").unwrap();
        let second = StageRepo::create(&conn, "Precios", "precios").unwrap();

        StageRepo::update(&conn, first.id.unwrap(), None, None, None, None, Some(second.id)).unwrap();

        let updated = StageRepo::get_by_id(&conn, first.id.unwrap()).unwrap().unwrap();
        assert_eq!(updated.next_stage_id, second.id);

        // Clearing works too
        StageRepo::update(&conn, first.id.unwrap(), None, None, None, None, Some(None)).unwrap();
        let cleared = StageRepo::get_by_id(&conn, first.id.unwrap()).unwrap().unwrap();
        assert_eq!(cleared.next_stage_id, None);
    }

    #[test]
    fn test_update_fields() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let stage = StageRepo::create(&conn, "Bienvenida", "bienvenida").unwrap();
        let id = stage.id.unwrap();

        StageRepo::update(
            &conn,
            id,
            Some("Bienvenida Inicial"),
            None,
            Some(Some("Primer contacto con el lead")),
            Some(1),
            None,
        ).unwrap();

        let updated = StageRepo::get_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(updated.name, "Bienvenida Inicial");
        assert_eq!(updated.description.as_deref(), Some("Primer contacto con el lead"));
        assert_eq!(updated.sequence, 1);
    }

    #[test]
    fn test_activate_restores_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create(&conn, "Precios", "precios").unwrap();
        StageRepo::deactivate(&conn, "precios").unwrap();
        StageRepo::activate(&conn, "precios").unwrap();

        let stage = StageRepo::get_active_by_code(&conn, "precios").unwrap();
        assert!(stage.is_some());
    }

    #[test]
    fn test_activate_conflict_rejected() {
        let conn = DbConnection::connect_in_memory().unwrap();
        StageRepo::create(&conn, "Precios", "precios").unwrap();
        StageRepo::deactivate(&conn, "precios").unwrap();
        StageRepo::create(&conn, "Precios v2", "precios").unwrap();

        // Reactivating the old stage would violate code uniqueness
        let result = StageRepo::activate(&conn, "precios");
        assert!(result.is_err());
    }
}
