use rusqlite::{Connection, OptionalExtension};
use crate::models::Template;
use crate::resolver::placeholder;
use anyhow::{Context, Result};

/// Message template repository for database operations
///
/// The cached `variables` column (comma-joined placeholder names) is
/// recomputed here on every insert and on every message change; nothing else
/// writes templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Create a new template with full field support
    pub fn create_full(
        conn: &Connection,
        name: &str,
        stage_id: i64,
        category_id: Option<i64>,
        message: &str,
        sequence: Option<i64>,
        notes: Option<&str>,
    ) -> Result<Template> {
        let now = chrono::Utc::now().timestamp();
        let variables = placeholder::variables_field(message);
        let sequence = sequence.unwrap_or(10);

        conn.execute(
            "INSERT INTO templates (name, stage_id, category_id, message, variables, sequence, active, notes, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9)",
            rusqlite::params![
                name,
                stage_id,
                category_id,
                message,
                variables,
                sequence,
                notes,
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create template: {}", name))?;

        let id = conn.last_insert_rowid();
        Ok(Template {
            id: Some(id),
            name: name.to_string(),
            stage_id,
            category_id,
            message: message.to_string(),
            variables,
            sequence,
            active: true,
            notes: notes.map(|s| s.to_string()),
            created_ts: now,
            modified_ts: now,
        })
    }

    /// Create a new template (required fields only)
    pub fn create(conn: &Connection, name: &str, stage_id: i64, message: &str) -> Result<Template> {
        Self::create_full(conn, name, stage_id, None, message, None, None)
    }

    /// Get template by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Template>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, stage_id, category_id, message, variables, sequence, active, notes, created_ts, modified_ts
             FROM templates WHERE id = ?1"
        )?;

        let template = stmt.query_row([id], |row| {
            Ok(Template {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                stage_id: row.get(2)?,
                category_id: row.get(3)?,
                message: row.get(4)?,
                variables: row.get(5)?,
                sequence: row.get(6)?,
                active: row.get::<_, i64>(7)? != 0,
                notes: row.get(8)?,
                created_ts: row.get(9)?,
                modified_ts: row.get(10)?,
            })
        }).optional()?;

        Ok(template)
    }

    /// List a stage's templates with their category names, ordered by
    /// sequence then category name (generic templates first within a
    /// sequence, NULL sorting first).
    pub fn list_for_stage(
        conn: &Connection,
        stage_id: i64,
        include_inactive: bool,
    ) -> Result<Vec<(Template, Option<String>)>> {
        let query = if include_inactive {
            "SELECT t.id, t.name, t.stage_id, t.category_id, t.message, t.variables, t.sequence,
                    t.active, t.notes, t.created_ts, t.modified_ts, c.name
             FROM templates t LEFT JOIN categories c ON c.id = t.category_id
             WHERE t.stage_id = ?1
             ORDER BY t.sequence, c.name, t.id"
        } else {
            "SELECT t.id, t.name, t.stage_id, t.category_id, t.message, t.variables, t.sequence,
                    t.active, t.notes, t.created_ts, t.modified_ts, c.name
             FROM templates t LEFT JOIN categories c ON c.id = t.category_id
             WHERE t.stage_id = ?1 AND t.active = 1
             ORDER BY t.sequence, c.name, t.id"
        };

        let mut stmt = conn.prepare(query)?;
        let rows = stmt.query_map([stage_id], |row| {
            Ok((
                Template {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    stage_id: row.get(2)?,
                    category_id: row.get(3)?,
                    message: row.get(4)?,
                    variables: row.get(5)?,
                    sequence: row.get(6)?,
                    active: row.get::<_, i64>(7)? != 0,
                    notes: row.get(8)?,
                    created_ts: row.get(9)?,
                    modified_ts: row.get(10)?,
                },
                row.get::<_, Option<String>>(11)?,
            ))
        })?;

        let mut templates = Vec::new();
        for row in rows {
            templates.push(row?);
        }
        Ok(templates)
    }

    /// Find the best active template for a stage: exact category match first,
    /// else the generic (category-less) template. Lowest sequence wins, row
    /// id breaks ties.
    pub fn find_best(
        conn: &Connection,
        stage_id: i64,
        category_id: Option<i64>,
    ) -> Result<Option<Template>> {
        if let Some(cat_id) = category_id {
            let mut stmt = conn.prepare(
                "SELECT id, name, stage_id, category_id, message, variables, sequence, active, notes, created_ts, modified_ts
                 FROM templates
                 WHERE stage_id = ?1 AND category_id = ?2 AND active = 1
                 ORDER BY sequence, id LIMIT 1"
            )?;
            let exact = stmt.query_row(rusqlite::params![stage_id, cat_id], |row| {
                Ok(Template {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    stage_id: row.get(2)?,
                    category_id: row.get(3)?,
                    message: row.get(4)?,
                    variables: row.get(5)?,
                    sequence: row.get(6)?,
                    active: row.get::<_, i64>(7)? != 0,
                    notes: row.get(8)?,
                    created_ts: row.get(9)?,
                    modified_ts: row.get(10)?,
                })
            }).optional()?;

            if exact.is_some() {
                return Ok(exact);
            }
        }

        let mut stmt = conn.prepare(
            "SELECT id, name, stage_id, category_id, message, variables, sequence, active, notes, created_ts, modified_ts
             FROM templates
             WHERE stage_id = ?1 AND category_id IS NULL AND active = 1
             ORDER BY sequence, id LIMIT 1"
        )?;
        let generic = stmt.query_row([stage_id], |row| {
            Ok(Template {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                stage_id: row.get(2)?,
                category_id: row.get(3)?,
                message: row.get(4)?,
                variables: row.get(5)?,
                sequence: row.get(6)?,
                active: row.get::<_, i64>(7)? != 0,
                notes: row.get(8)?,
                created_ts: row.get(9)?,
                modified_ts: row.get(10)?,
            })
        }).optional()?;

        Ok(generic)
    }

    /// Count active templates for a stage
    pub fn count_for_stage(conn: &Connection, stage_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM templates WHERE stage_id = ?1 AND active = 1",
            [stage_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Update a template row
    ///
    /// `category_id` and `notes` use nested Options so callers can clear
    /// them (Some(None)) or leave them untouched (None). A message change
    /// recomputes the cached variables field.
    pub fn update(
        conn: &Connection,
        id: i64,
        name: Option<&str>,
        message: Option<&str>,
        category_id: Option<Option<i64>>,
        sequence: Option<i64>,
        notes: Option<Option<&str>>,
    ) -> Result<()> {
        // Build dynamic update
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(n) = name {
            sets.push("name = ?");
            params.push(Box::new(n.to_string()));
        }
        if let Some(m) = message {
            sets.push("message = ?");
            params.push(Box::new(m.to_string()));
            sets.push("variables = ?");
            params.push(Box::new(placeholder::variables_field(m)));
        }
        if let Some(cat) = category_id {
            sets.push("category_id = ?");
            params.push(Box::new(cat));
        }
        if let Some(seq) = sequence {
            sets.push("sequence = ?");
            params.push(Box::new(seq));
        }
        if let Some(n) = notes {
            sets.push("notes = ?");
            params.push(Box::new(n.map(|s| s.to_string())));
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
            "UPDATE templates SET {} WHERE id = ?{}",
            numbered_sets.join(", "),
            id_param
        );
        params.push(Box::new(id));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let updated = conn.execute(&sql, param_refs.as_slice())
            .with_context(|| format!("Failed to update template id={}", id))?;

        if updated == 0 {
            anyhow::bail!("No template found with id={}", id);
        }

        Ok(())
    }

    /// Deactivate (soft delete) a template
    pub fn deactivate(conn: &Connection, id: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let rows_affected = conn.execute(
            "UPDATE templates SET active = 0, modified_ts = ?1 WHERE id = ?2 AND active = 1",
            rusqlite::params![now, id],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("No active template with id={}", id);
        }

        Ok(())
    }

    /// Reactivate a template
    pub fn activate(conn: &Connection, id: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let rows_affected = conn.execute(
            "UPDATE templates SET active = 1, modified_ts = ?1 WHERE id = ?2 AND active = 0",
            rusqlite::params![now, id],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("No inactive template with id={}", id);
        }

        Ok(())
    }
}
