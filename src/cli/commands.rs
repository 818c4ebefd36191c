use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::db::DbConnection;
use crate::models::Stage;
use crate::repo::{CategoryRepo, StageRepo};
use crate::cli::commands_templates::{
    handle_resolve, handle_template_activate, handle_template_add, handle_template_deactivate,
    handle_template_list, handle_template_modify, handle_template_show,
};
use crate::cli::output::{format_category_list_table, format_stage_list_table};
use crate::cli::error::{user_error, internal_error, validate_non_empty, validate_stage_code};
use crate::utils::fuzzy;
use anyhow::Result;

#[derive(Parser)]
#[command(name = "charla")]
#[command(about = "Charla - conversation stage and message template manager for CRM chatbot flows")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Conversation stage management commands
    Stages {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Product category management commands
    Categories {
        #[command(subcommand)]
        subcommand: CategoryCommands,
    },
    /// Message template management commands
    Templates {
        #[command(subcommand)]
        subcommand: TemplateCommands,
    },
    /// Resolve the message for a conversation stage
    Resolve {
        /// Stage lookup code (e.g. "bienvenida")
        stage_code: String,
        /// Product category, by id or display name
        #[arg(long)]
        category: Option<String>,
        /// Substitution variable as key=value (repeatable)
        #[arg(long = "var")]
        vars: Vec<String>,
        /// Output in JSON format (prints null when nothing matches)
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// Add a new conversation stage
    Add {
        /// Display name (e.g. "Bienvenida Inicial")
        name: String,
        /// Unique lookup code used by the automation tool
        #[arg(long)]
        code: String,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Ordering within the flow (lower sorts first, default 10)
        #[arg(long)]
        sequence: Option<i64>,
        /// Code of the stage the flow moves to next
        #[arg(long = "next")]
        next_code: Option<String>,
    },
    /// List stages
    List {
        /// Include deactivated stages
        #[arg(long)]
        all: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Modify a stage
    Modify {
        /// Lookup code of the stage to modify
        code: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New lookup code
        #[arg(long)]
        new_code: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New sequence
        #[arg(long)]
        sequence: Option<i64>,
        /// Code of the stage the flow moves to next
        #[arg(long = "next")]
        next_code: Option<String>,
        /// Remove the next-stage pointer
        #[arg(long, conflicts_with = "next_code")]
        clear_next: bool,
    },
    /// Deactivate a stage (soft delete)
    Deactivate {
        code: String,
    },
    /// Reactivate a previously deactivated stage
    Activate {
        code: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a new product category
    Add {
        /// Display name (e.g. "Cursos")
        name: String,
        /// External CRM pipeline reference
        #[arg(long = "crm-ref")]
        crm_ref: Option<String>,
    },
    /// List categories
    List {
        /// Include deactivated categories
        #[arg(long)]
        all: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Deactivate a category (soft delete)
    Deactivate {
        name: String,
    },
    /// Reactivate a category
    Activate {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Add a new message template
    Add {
        /// Template name
        name: String,
        /// Lookup code of the owning stage
        #[arg(long)]
        stage: String,
        /// Message body; placeholders as {nombre}, {email}, ...
        #[arg(long)]
        message: String,
        /// Target category, by id or display name (omit for the generic template)
        #[arg(long)]
        category: Option<String>,
        /// Ordering within the stage (lower wins, default 10)
        #[arg(long)]
        sequence: Option<i64>,
        /// Internal notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List a stage's templates
    List {
        /// Stage lookup code
        stage_code: String,
        /// Include deactivated templates
        #[arg(long, conflicts_with = "json")]
        all: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show one template in full
    Show {
        /// Template ID
        id: String,
    },
    /// Modify a template
    Modify {
        /// Template ID
        id: String,
        /// New template name
        #[arg(long)]
        name: Option<String>,
        /// New message body (recomputes the cached variables)
        #[arg(long)]
        message: Option<String>,
        /// New target category, by id or display name
        #[arg(long)]
        category: Option<String>,
        /// Make this the stage's generic template
        #[arg(long, conflicts_with = "category")]
        clear_category: bool,
        /// New sequence
        #[arg(long)]
        sequence: Option<i64>,
        /// New internal notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Deactivate a template (soft delete)
    Deactivate {
        /// Template ID
        id: String,
    },
    /// Reactivate a template
    Activate {
        /// Template ID
        id: String,
    },
}

/// Parse arguments and dispatch to the matching handler
pub fn run() -> Result<()> {
    // No-op outside Windows; enables ANSI escapes in legacy consoles
    let _ = enable_ansi_support::enable_ansi_support();

    // RUST_LOG-gated diagnostics, quiet by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let conn = DbConnection::connect()?;

    match cli.command {
        Commands::Stages { subcommand } => match subcommand {
            StageCommands::Add { name, code, description, sequence, next_code } => {
                handle_stage_add(&conn, &name, &code, description.as_deref(), sequence, next_code.as_deref())
            }
            StageCommands::List { all, json } => handle_stage_list(&conn, all, json),
            StageCommands::Modify { code, name, new_code, description, sequence, next_code, clear_next } => {
                handle_stage_modify(
                    &conn,
                    &code,
                    name.as_deref(),
                    new_code.as_deref(),
                    description.as_deref(),
                    sequence,
                    next_code.as_deref(),
                    clear_next,
                )
            }
            StageCommands::Deactivate { code } => handle_stage_deactivate(&conn, &code),
            StageCommands::Activate { code } => handle_stage_activate(&conn, &code),
        },
        Commands::Categories { subcommand } => match subcommand {
            CategoryCommands::Add { name, crm_ref } => {
                handle_category_add(&conn, &name, crm_ref.as_deref())
            }
            CategoryCommands::List { all, json } => handle_category_list(&conn, all, json),
            CategoryCommands::Deactivate { name } => handle_category_deactivate(&conn, &name),
            CategoryCommands::Activate { name } => handle_category_activate(&conn, &name),
        },
        Commands::Templates { subcommand } => match subcommand {
            TemplateCommands::Add { name, stage, message, category, sequence, notes } => {
                handle_template_add(
                    &conn,
                    &name,
                    &stage,
                    &message,
                    category.as_deref(),
                    sequence,
                    notes.as_deref(),
                )
            }
            TemplateCommands::List { stage_code, all, json } => {
                handle_template_list(&conn, &stage_code, all, json)
            }
            TemplateCommands::Show { id } => handle_template_show(&conn, &id),
            TemplateCommands::Modify { id, name, message, category, clear_category, sequence, notes } => {
                handle_template_modify(
                    &conn,
                    &id,
                    name.as_deref(),
                    message.as_deref(),
                    category.as_deref(),
                    clear_category,
                    sequence,
                    notes.as_deref(),
                )
            }
            TemplateCommands::Deactivate { id } => handle_template_deactivate(&conn, &id),
            TemplateCommands::Activate { id } => handle_template_activate(&conn, &id),
        },
        Commands::Resolve { stage_code, category, vars, json } => {
            handle_resolve(&conn, &stage_code, category.as_deref(), &vars, json)
        }
    }
}

/// Look up an active stage by code, exiting with a typo suggestion on a miss
pub fn find_stage_or_exit(conn: &Connection, code: &str) -> Stage {
    match StageRepo::get_active_by_code(conn, code) {
        Ok(Some(stage)) => stage,
        Ok(None) => {
            let codes = StageRepo::active_codes(conn).unwrap_or_default();
            let near = fuzzy::find_near_matches(code, &codes, 3);
            if let Some((suggestion, _)) = near.first() {
                user_error(&format!(
                    "No active stage with code '{}'. Did you mean '{}'?",
                    code, suggestion
                ));
            } else {
                user_error(&format!("No active stage with code '{}'", code));
            }
        }
        Err(e) => internal_error(&format!("Failed to look up stage '{}': {}", code, e)),
    }
}

fn handle_stage_add(
    conn: &Connection,
    name: &str,
    code: &str,
    description: Option<&str>,
    sequence: Option<i64>,
    next_code: Option<&str>,
) -> Result<()> {
    if let Err(e) = validate_non_empty(name, "Stage name") {
        user_error(&e);
    }
    if let Err(e) = validate_stage_code(code) {
        user_error(&e);
    }

    let next_stage_id = match next_code {
        Some(next) => find_stage_or_exit(conn, next).id,
        None => None,
    };

    let stage = StageRepo::create_full(conn, name, code, description, sequence, next_stage_id)?;
    println!("Created stage '{}' (id {})", stage.code, stage.id.unwrap_or(0));
    Ok(())
}

fn handle_stage_list(conn: &Connection, all: bool, json: bool) -> Result<()> {
    let stages = StageRepo::list(conn, all)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stages)?);
    } else {
        print!("{}", format_stage_list_table(conn, &stages, all)?);
    }
    Ok(())
}

fn handle_stage_modify(
    conn: &Connection,
    code: &str,
    name: Option<&str>,
    new_code: Option<&str>,
    description: Option<&str>,
    sequence: Option<i64>,
    next_code: Option<&str>,
    clear_next: bool,
) -> Result<()> {
    let stage = find_stage_or_exit(conn, code);
    let id = stage.id.expect("stage row id");

    if let Some(new_code) = new_code {
        if let Err(e) = validate_stage_code(new_code) {
            user_error(&e);
        }
    }

    let next_stage_id = if clear_next {
        Some(None)
    } else {
        match next_code {
            Some(next) => Some(find_stage_or_exit(conn, next).id),
            None => None,
        }
    };

    StageRepo::update(
        conn,
        id,
        name,
        new_code,
        description.map(Some),
        sequence,
        next_stage_id,
    )?;
    println!("Modified stage '{}'", new_code.unwrap_or(code));
    Ok(())
}

fn handle_stage_deactivate(conn: &Connection, code: &str) -> Result<()> {
    StageRepo::deactivate(conn, code)?;
    println!("Deactivated stage '{}'", code);
    Ok(())
}

fn handle_stage_activate(conn: &Connection, code: &str) -> Result<()> {
    StageRepo::activate(conn, code)?;
    println!("Activated stage '{}'", code);
    Ok(())
}

fn handle_category_add(conn: &Connection, name: &str, crm_ref: Option<&str>) -> Result<()> {
    if let Err(e) = validate_non_empty(name, "Category name") {
        user_error(&e);
    }

    let category = CategoryRepo::create(conn, name, crm_ref)?;
    println!("Created category '{}' (id {})", category.name, category.id.unwrap_or(0));
    Ok(())
}

fn handle_category_list(conn: &Connection, all: bool, json: bool) -> Result<()> {
    let categories = CategoryRepo::list(conn, all)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        print!("{}", format_category_list_table(&categories, all));
    }
    Ok(())
}

fn handle_category_deactivate(conn: &Connection, name: &str) -> Result<()> {
    CategoryRepo::deactivate(conn, name)?;
    println!("Deactivated category '{}'", name);
    Ok(())
}

fn handle_category_activate(conn: &Connection, name: &str) -> Result<()> {
    CategoryRepo::activate(conn, name)?;
    println!("Activated category '{}'", name);
    Ok(())
}
