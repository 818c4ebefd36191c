// Template resolution: the two operations exposed to external automation.
//
// Resolution never writes. Unknown stages, missing templates, and missing
// variables all fail open (None / empty / literal token) so the automation
// tool can branch on the payload instead of handling errors.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::CategoryRef;
use crate::repo::{CategoryRepo, StageRepo, TemplateRepo};
use crate::resolver::placeholder;
use crate::resolver::substitute;
use anyhow::Result;

/// Payload returned for a successful lookup
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMessage {
    pub message: String,
    pub template_id: i64,
    pub template_name: String,
    pub stage_code: String,
    pub stage_name: String,
    pub category_name: Option<String>,
    pub variables: Vec<String>,
}

/// One row of the full-stage listing payload
#[derive(Debug, Clone, Serialize)]
pub struct TemplateListing {
    pub id: i64,
    pub name: String,
    pub message: String,
    pub category_name: Option<String>,
    pub sequence: i64,
}

/// Resolve (stage code, optional category, variables) to a filled message.
///
/// Lookup: active stage by code, then the best active template (exact
/// category match first, generic fallback otherwise). Returns Ok(None) when
/// either lookup comes up empty.
pub fn resolve(
    conn: &Connection,
    stage_code: &str,
    category: Option<&CategoryRef>,
    vars: &HashMap<String, String>,
) -> Result<Option<ResolvedMessage>> {
    let stage = match StageRepo::get_active_by_code(conn, stage_code)? {
        Some(stage) => stage,
        None => {
            log::debug!("no active stage for code '{}'", stage_code);
            return Ok(None);
        }
    };

    let category = match category {
        Some(reference) => {
            let resolved = CategoryRepo::resolve_ref(conn, reference)?;
            if resolved.is_none() {
                log::debug!("category '{}' not found, falling back to generic", reference);
            }
            resolved
        }
        None => None,
    };

    let stage_id = stage.id.expect("stage row id");
    let template = match TemplateRepo::find_best(conn, stage_id, category.as_ref().and_then(|c| c.id))? {
        Some(template) => template,
        None => {
            log::debug!("no template for stage '{}'", stage_code);
            return Ok(None);
        }
    };

    // The matched template's own category, not the caller's request: a
    // generic fallback reports no category.
    let category_name = match template.category_id {
        Some(cat_id) => CategoryRepo::get_by_id(conn, cat_id)?.map(|c| c.name),
        None => None,
    };

    let variables = placeholder::extract(&template.message);
    let message = substitute::fill(&template.message, vars);

    Ok(Some(ResolvedMessage {
        message,
        template_id: template.id.expect("template row id"),
        template_name: template.name,
        stage_code: stage.code,
        stage_name: stage.name,
        category_name,
        variables,
    }))
}

/// List every active template for an active stage, ordered by sequence then
/// category name. Unknown or inactive stages yield an empty list.
pub fn list_all(conn: &Connection, stage_code: &str) -> Result<Vec<TemplateListing>> {
    let stage = match StageRepo::get_active_by_code(conn, stage_code)? {
        Some(stage) => stage,
        None => return Ok(Vec::new()),
    };

    let stage_id = stage.id.expect("stage row id");
    let listed = TemplateRepo::list_for_stage(conn, stage_id, false)?;

    Ok(listed
        .into_iter()
        .map(|(template, category_name)| TemplateListing {
            id: template.id.expect("template row id"),
            name: template.name,
            message: template.message,
            category_name,
            sequence: template.sequence,
        })
        .collect())
}
