use rusqlite::{Connection, OptionalExtension};
use crate::models::{Category, CategoryRef};
use anyhow::{Context, Result};

/// Product category repository for database operations
pub struct CategoryRepo;

impl CategoryRepo {
    /// Create a new category
    pub fn create(conn: &Connection, name: &str, crm_ref: Option<&str>) -> Result<Category> {
        let mut category = Category::new(name.to_string());
        category.crm_ref = crm_ref.map(|s| s.to_string());

        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO categories (name, crm_ref, active, created_ts, modified_ts)
             VALUES (?1, ?2, 1, ?3, ?4)",
            rusqlite::params![category.name, category.crm_ref, now, now],
        )
        .with_context(|| format!("Failed to create category: {}", name))?;

        let id = conn.last_insert_rowid();
        Ok(Category {
            id: Some(id),
            ..category
        })
    }

    /// Get category by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Category>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, crm_ref, active, created_ts, modified_ts
             FROM categories WHERE id = ?1"
        )?;

        let category = stmt.query_row([id], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                crm_ref: row.get(2)?,
                active: row.get::<_, i64>(3)? != 0,
                created_ts: row.get(4)?,
                modified_ts: row.get(5)?,
            })
        }).optional()?;

        Ok(category)
    }

    /// Get category by display name
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, crm_ref, active, created_ts, modified_ts
             FROM categories WHERE name = ?1"
        )?;

        let category = stmt.query_row([name], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                crm_ref: row.get(2)?,
                active: row.get::<_, i64>(3)? != 0,
                created_ts: row.get(4)?,
                modified_ts: row.get(5)?,
            })
        }).optional()?;

        Ok(category)
    }

    /// Resolve a caller-supplied reference (id or name) to an active category.
    /// Unknown or inactive references yield None; they are never an error.
    pub fn resolve_ref(conn: &Connection, reference: &CategoryRef) -> Result<Option<Category>> {
        let category = match reference {
            CategoryRef::Id(id) => Self::get_by_id(conn, *id)?,
            CategoryRef::Name(name) => Self::get_by_name(conn, name)?,
        };
        Ok(category.filter(|c| c.active))
    }

    /// List categories ordered by name (optionally including inactive ones)
    pub fn list(conn: &Connection, include_inactive: bool) -> Result<Vec<Category>> {
        let query = if include_inactive {
            "SELECT id, name, crm_ref, active, created_ts, modified_ts
             FROM categories ORDER BY name"
        } else {
            "SELECT id, name, crm_ref, active, created_ts, modified_ts
             FROM categories WHERE active = 1 ORDER BY name"
        };

        let mut stmt = conn.prepare(query)?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                crm_ref: row.get(2)?,
                active: row.get::<_, i64>(3)? != 0,
                created_ts: row.get(4)?,
                modified_ts: row.get(5)?,
            })
        })?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Deactivate (soft delete) a category
    pub fn deactivate(conn: &Connection, name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let rows_affected = conn.execute(
            "UPDATE categories SET active = 0, modified_ts = ?1 WHERE name = ?2 AND active = 1",
            rusqlite::params![now, name],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("No active category named '{}'", name);
        }

        Ok(())
    }

    /// Reactivate a category
    pub fn activate(conn: &Connection, name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let rows_affected = conn.execute(
            "UPDATE categories SET active = 1, modified_ts = ?1 WHERE name = ?2 AND active = 0",
            rusqlite::params![now, name],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("No inactive category named '{}'", name);
        }

        Ok(())
    }
}
