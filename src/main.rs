//! # planboard - Event Planning Board CLI
//!
//! A file-backed task-planning tool: categorized tasks with subtasks, a
//! responsible party, a workflow status, a stage, and a date range, plus a
//! Gantt-like timeline that maps each task's dates onto a fixed 12-month ×
//! 5-week activity grid.
//!
//! ## Key Features
//!
//! - **Categorized tasks with subtasks**: one level of nesting, subtasks
//!   inherit and follow their parent's category
//! - **Yearly week-grid timeline**: every task rendered across 60 week
//!   slots, due dates labelled on the last active cell
//! - **Ad-hoc groups**: link unrelated tasks with a shared group tag
//! - **Spreadsheet export**: one styled `.xlsx` row per task, timeline
//!   columns matching the on-screen grid cell for cell
//! - **Local file storage**: a single versioned JSON snapshot, written
//!   atomically on every change
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! planboard add "Draft brief" --category Planejamento --start 2024-01-10 --due 2024-02-05
//!
//! # Add a subtask
//! planboard add "Collect assets" --parent 5
//!
//! # See the year at a glance
//! planboard timeline
//!
//! # Ship the spreadsheet
//! planboard export
//! ```
//!
//! Data is stored in `~/.planboard/planboard.json`; pass `--db` to use a
//! different snapshot file.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod export;
pub mod fields;
pub mod store;
pub mod task;
pub mod timeline;

use cli::Cli;
use cmd::Commands;
use store::{JsonFileBackend, TaskStore};

fn main() {
    let cli = Cli::parse();

    // Completions need no store.
    if let Commands::Completions { shell } = &cli.command {
        cmd::cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(home).join(".planboard");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Failed to create data directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
        dir.join("planboard.json")
    });

    let mut store = TaskStore::open(Box::new(JsonFileBackend::new(db_path)));

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Add {
            description,
            category,
            responsible,
            stage,
            status,
            start,
            due,
            parent,
        } => cmd::cmd_add(
            &mut store,
            description,
            category,
            responsible,
            stage,
            status,
            start,
            due,
            parent,
        ),

        Commands::List { category } => cmd::cmd_list(&store, category),

        Commands::Timeline => cmd::cmd_timeline(&store),

        Commands::Update {
            id,
            category,
            description,
            responsible,
            stage,
            status,
            start,
            due,
        } => cmd::cmd_update(
            &mut store,
            id,
            category,
            description,
            responsible,
            stage,
            status,
            start,
            due,
        ),

        Commands::Delete { id } => cmd::cmd_delete(&mut store, id),

        Commands::Category { action } => cmd::cmd_category(&mut store, action),

        Commands::Group { ids, group_id } => cmd::cmd_group(&mut store, ids, group_id),

        Commands::Ungroup { id } => cmd::cmd_ungroup(&mut store, id),

        Commands::Groups => cmd::cmd_groups(&store),

        Commands::Export { output } => cmd::cmd_export(&store, output),

        Commands::Reset { confirm_tasks } => cmd::cmd_reset(&mut store, confirm_tasks),
    }
}
