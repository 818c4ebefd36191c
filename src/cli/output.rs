// Output formatting utilities

use crate::models::{Category, Stage, Template};
use crate::repo::{CategoryRepo, StageRepo, TemplateRepo};
use crate::resolver::{ResolvedMessage, TemplateListing};
use rusqlite::Connection;
use anyhow::Result;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    // Try terminal_size crate first (most reliable, works after resize)
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    // Fallback to COLUMNS environment variable (set by most shells)
    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 { // Sanity check
                return width;
            }
        }
    }

    // Default fallback - reasonable default for most terminals
    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Dim formatting for inactive rows if in TTY mode
fn dim_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_FG_BRIGHT_BLACK, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Truncate a string to a maximum display width, appending an ellipsis
fn truncate(text: &str, max_width: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_width {
        return text.to_string();
    }
    if max_width <= 1 {
        return "…".to_string();
    }
    let truncated: String = text.chars().take(max_width - 1).collect();
    format!("{}…", truncated)
}

/// Left-pad each cell to its column width and join with two spaces.
/// Rows flagged in `dim_rows` are dimmed after padding so ANSI codes never
/// skew the width calculation.
fn render_rows(header: &[&str], rows: &[Vec<String>], dim_rows: &[bool], tty: bool) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header_line: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    out.push_str(&bold_if_tty(header_line.join("  ").trim_end(), tty));
    out.push('\n');

    for (row_idx, row) in rows.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        let joined = line.join("  ");
        let trimmed = joined.trim_end();
        if dim_rows.get(row_idx).copied().unwrap_or(false) {
            out.push_str(&dim_if_tty(trimmed, tty));
        } else {
            out.push_str(trimmed);
        }
        out.push('\n');
    }
    out
}

/// Format the stage list as an aligned table
///
/// Shows template counts (active templates only) and the next stage's code
/// where a flow pointer is set. Inactive stages are dimmed when included.
pub fn format_stage_list_table(
    conn: &Connection,
    stages: &[Stage],
    show_active_column: bool,
) -> Result<String> {
    if stages.is_empty() {
        return Ok("No stages found.\n".to_string());
    }

    let tty = is_tty();
    let mut header = vec!["ID", "Seq", "Code", "Name", "Next", "Msgs"];
    if show_active_column {
        header.push("Active");
    }

    let mut rows = Vec::new();
    let mut dim_rows = Vec::new();
    for stage in stages {
        let id = stage.id.unwrap_or(0);
        let count = TemplateRepo::count_for_stage(conn, id)?;
        let next_code = match stage.next_stage_id {
            Some(next_id) => StageRepo::get_by_id(conn, next_id)?
                .map(|s| s.code)
                .unwrap_or_else(|| "?".to_string()),
            None => "-".to_string(),
        };

        let mut row = vec![
            id.to_string(),
            stage.sequence.to_string(),
            stage.code.clone(),
            truncate(&stage.name, 30),
            next_code,
            count.to_string(),
        ];
        if show_active_column {
            row.push(if stage.active { "yes" } else { "no" }.to_string());
        }
        rows.push(row);
        dim_rows.push(!stage.active);
    }

    Ok(render_rows(&header, &rows, &dim_rows, tty))
}

/// Format the category list as an aligned table
pub fn format_category_list_table(categories: &[Category], show_active_column: bool) -> String {
    if categories.is_empty() {
        return "No categories found.\n".to_string();
    }

    let tty = is_tty();
    let mut header = vec!["ID", "Name", "CRM ref"];
    if show_active_column {
        header.push("Active");
    }

    let mut rows = Vec::new();
    let mut dim_rows = Vec::new();
    for category in categories {
        let mut row = vec![
            category.id.unwrap_or(0).to_string(),
            truncate(&category.name, 30),
            category.crm_ref.clone().unwrap_or_else(|| "-".to_string()),
        ];
        if show_active_column {
            row.push(if category.active { "yes" } else { "no" }.to_string());
        }
        rows.push(row);
        dim_rows.push(!category.active);
    }

    render_rows(&header, &rows, &dim_rows, tty)
}

/// Format a stage's template listing as an aligned table
///
/// Message bodies are truncated to fit the terminal; `--json` carries the
/// full text for automation.
pub fn format_template_list_table(listings: &[TemplateListing]) -> String {
    if listings.is_empty() {
        return "No templates found.\n".to_string();
    }

    let tty = is_tty();
    let header = vec!["ID", "Seq", "Category", "Name", "Message"];

    // Leave the message column whatever width the fixed columns don't use
    let fixed: usize = listings
        .iter()
        .map(|l| {
            l.id.to_string().len()
                + l.sequence.to_string().len().max(3)
                + l.category_name.as_deref().unwrap_or("generic").chars().count()
                + l.name.chars().count()
        })
        .max()
        .unwrap_or(40);
    let message_width = get_terminal_width().saturating_sub(fixed + 10).clamp(20, 60);

    let rows: Vec<Vec<String>> = listings
        .iter()
        .map(|l| {
            vec![
                l.id.to_string(),
                l.sequence.to_string(),
                l.category_name.clone().unwrap_or_else(|| "generic".to_string()),
                truncate(&l.name, 30),
                truncate(&l.message.replace('\n', " "), message_width),
            ]
        })
        .collect();

    let dim_rows = vec![false; rows.len()];
    render_rows(&header, &rows, &dim_rows, tty)
}

/// Format a resolved message for human consumption: the filled message
/// followed by a metadata block.
pub fn format_resolved(resolved: &ResolvedMessage) -> String {
    let tty = is_tty();
    let mut out = String::new();
    out.push_str(&resolved.message);
    out.push('\n');
    out.push('\n');
    out.push_str(&bold_if_tty("Template:", tty));
    out.push_str(&format!(" {} (id {})\n", resolved.template_name, resolved.template_id));
    out.push_str(&bold_if_tty("Stage:", tty));
    out.push_str(&format!(" {} ({})\n", resolved.stage_name, resolved.stage_code));
    out.push_str(&bold_if_tty("Category:", tty));
    out.push_str(&format!(
        " {}\n",
        resolved.category_name.as_deref().unwrap_or("generic")
    ));
    out.push_str(&bold_if_tty("Variables:", tty));
    if resolved.variables.is_empty() {
        out.push_str(" none\n");
    } else {
        out.push_str(&format!(" {}\n", resolved.variables.join(", ")));
    }
    out
}

/// Format a single template's detail view
pub fn format_template_summary(conn: &Connection, template: &Template) -> Result<String> {
    let tty = is_tty();
    let stage = StageRepo::get_by_id(conn, template.stage_id)?;
    let category = match template.category_id {
        Some(cat_id) => CategoryRepo::get_by_id(conn, cat_id)?,
        None => None,
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{} {} (id {})\n",
        bold_if_tty("Template", tty),
        template.name,
        template.id.unwrap_or(0)
    ));
    out.push_str(&format!(
        "  Stage:     {}\n",
        stage.map(|s| format!("{} ({})", s.name, s.code)).unwrap_or_else(|| "?".to_string())
    ));
    out.push_str(&format!(
        "  Category:  {}\n",
        category.map(|c| c.name).unwrap_or_else(|| "generic".to_string())
    ));
    out.push_str(&format!("  Sequence:  {}\n", template.sequence));
    out.push_str(&format!("  Active:    {}\n", if template.active { "yes" } else { "no" }));
    out.push_str(&format!("  Variables: {}\n", template.variables));
    if let Some(notes) = &template.notes {
        out.push_str(&format!("  Notes:     {}\n", notes));
    }
    out.push('\n');
    out.push_str(&template.message);
    out.push('\n');
    Ok(out)
}
