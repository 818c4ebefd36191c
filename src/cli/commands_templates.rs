// Template and resolve command handlers

use rusqlite::Connection;
use crate::models::CategoryRef;
use crate::repo::{CategoryRepo, TemplateRepo};
use crate::resolver;
use crate::resolver::TemplateListing;
use crate::cli::commands::find_stage_or_exit;
use crate::cli::error::{user_error, validate_non_empty, validate_template_id};
use crate::cli::output::{format_resolved, format_template_list_table, format_template_summary};
use crate::cli::parser::parse_var_args;
use anyhow::Result;

/// Resolve a --category argument to an existing active category id, exiting
/// on a miss. Save-time references must exist; only lookup-time references
/// fall back silently.
fn category_id_or_exit(conn: &Connection, raw: &str) -> i64 {
    let reference = CategoryRef::parse(raw);
    match CategoryRepo::resolve_ref(conn, &reference) {
        Ok(Some(category)) => category.id.expect("category row id"),
        Ok(None) => user_error(&format!("Unknown category '{}'", raw)),
        Err(e) => user_error(&format!("Failed to look up category '{}': {}", raw, e)),
    }
}

pub fn handle_template_add(
    conn: &Connection,
    name: &str,
    stage_code: &str,
    message: &str,
    category: Option<&str>,
    sequence: Option<i64>,
    notes: Option<&str>,
) -> Result<()> {
    if let Err(e) = validate_non_empty(name, "Template name") {
        user_error(&e);
    }
    if let Err(e) = validate_non_empty(message, "Message body") {
        user_error(&e);
    }

    let stage = find_stage_or_exit(conn, stage_code);
    let category_id = category.map(|raw| category_id_or_exit(conn, raw));

    let template = TemplateRepo::create_full(
        conn,
        name,
        stage.id.expect("stage row id"),
        category_id,
        message,
        sequence,
        notes,
    )?;
    println!(
        "Created template '{}' (id {}) for stage '{}', variables: {}",
        template.name,
        template.id.unwrap_or(0),
        stage.code,
        template.variables
    );
    Ok(())
}

pub fn handle_template_list(conn: &Connection, stage_code: &str, all: bool, json: bool) -> Result<()> {
    if all {
        // Admin view: includes deactivated templates
        let stage = find_stage_or_exit(conn, stage_code);
        let listed = TemplateRepo::list_for_stage(conn, stage.id.expect("stage row id"), true)?;
        let listings: Vec<TemplateListing> = listed
            .into_iter()
            .map(|(template, category_name)| TemplateListing {
                id: template.id.expect("template row id"),
                name: if template.active {
                    template.name
                } else {
                    format!("{} (inactive)", template.name)
                },
                message: template.message,
                category_name,
                sequence: template.sequence,
            })
            .collect();
        print!("{}", format_template_list_table(&listings));
        return Ok(());
    }

    // Automation view: active templates of an active stage, empty on a miss
    let listings = resolver::list_all(conn, stage_code)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    } else {
        print!("{}", format_template_list_table(&listings));
    }
    Ok(())
}

pub fn handle_template_show(conn: &Connection, id_str: &str) -> Result<()> {
    let id = match validate_template_id(id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    };

    match TemplateRepo::get_by_id(conn, id)? {
        Some(template) => {
            print!("{}", format_template_summary(conn, &template)?);
            Ok(())
        }
        None => user_error(&format!("No template with id {}", id)),
    }
}

pub fn handle_template_modify(
    conn: &Connection,
    id_str: &str,
    name: Option<&str>,
    message: Option<&str>,
    category: Option<&str>,
    clear_category: bool,
    sequence: Option<i64>,
    notes: Option<&str>,
) -> Result<()> {
    let id = match validate_template_id(id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    };
    if TemplateRepo::get_by_id(conn, id)?.is_none() {
        user_error(&format!("No template with id {}", id));
    }

    if let Some(m) = message {
        if let Err(e) = validate_non_empty(m, "Message body") {
            user_error(&e);
        }
    }

    let category_id = if clear_category {
        Some(None)
    } else {
        category.map(|raw| Some(category_id_or_exit(conn, raw)))
    };

    TemplateRepo::update(conn, id, name, message, category_id, sequence, notes.map(Some))?;
    println!("Modified template {}", id);
    Ok(())
}

pub fn handle_template_deactivate(conn: &Connection, id_str: &str) -> Result<()> {
    let id = match validate_template_id(id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    };
    TemplateRepo::deactivate(conn, id)?;
    println!("Deactivated template {}", id);
    Ok(())
}

pub fn handle_template_activate(conn: &Connection, id_str: &str) -> Result<()> {
    let id = match validate_template_id(id_str) {
        Ok(id) => id,
        Err(e) => user_error(&e),
    };
    TemplateRepo::activate(conn, id)?;
    println!("Activated template {}", id);
    Ok(())
}

pub fn handle_resolve(
    conn: &Connection,
    stage_code: &str,
    category: Option<&str>,
    var_tokens: &[String],
    json: bool,
) -> Result<()> {
    let vars = match parse_var_args(var_tokens) {
        Ok(vars) => vars,
        Err(e) => user_error(&e.to_string()),
    };
    let category_ref = category.map(CategoryRef::parse);

    match resolver::resolve(conn, stage_code, category_ref.as_ref(), &vars)? {
        Some(resolved) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                print!("{}", format_resolved(&resolved));
            }
            Ok(())
        }
        None => {
            if json {
                // Automation branches on the payload, so a miss is not an error
                println!("null");
                Ok(())
            } else {
                user_error(&format!("No message found for stage '{}'", stage_code));
            }
        }
    }
}
