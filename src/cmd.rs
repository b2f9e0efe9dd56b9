//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers that implement the various
//! subcommands, from basic CRUD operations on tasks and categories to the
//! timeline grid rendering and the spreadsheet export.

use std::path::PathBuf;

use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::export::{default_file_name, export_xlsx, month_abbrev};
use crate::fields::{format_status, Status};
use crate::store::{NewTask, TaskPatch, TaskStore};
use crate::task::{Task, TaskWithTimeline};
use crate::timeline::WEEKS_PER_MONTH;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// What the task is about.
        description: String,
        /// Category name.
        #[arg(long, default_value = "")]
        category: String,
        /// Person responsible.
        #[arg(long, default_value = "")]
        responsible: String,
        /// Free-text stage label.
        #[arg(long, default_value = "")]
        stage: String,
        /// Workflow status.
        #[arg(long, value_enum, default_value_t = Status::NotStarted)]
        status: Status,
        /// Start date: YYYY-MM-DD, "today", "tomorrow", or "in Nd"/"in Nw".
        #[arg(long, default_value = "today")]
        start: String,
        /// Due date, same formats as --start.
        #[arg(long, default_value = "today")]
        due: String,
        /// Parent task ID; the new task becomes its subtask.
        #[arg(long)]
        parent: Option<u64>,
    },

    /// List tasks, subtasks indented under their parents.
    List {
        /// Only tasks in this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Render the yearly week-grid timeline for every task.
    Timeline,

    /// Update fields on a task.
    Update {
        /// Task ID to update.
        id: u64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },

    /// Delete a task by ID.
    Delete {
        /// Task ID to delete.
        id: u64,
    },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Put tasks into a shared ad-hoc group.
    Group {
        /// Task IDs to group together.
        ids: Vec<u64>,
        /// Reuse an existing group ID instead of minting a new one.
        #[arg(long)]
        group_id: Option<u64>,
    },

    /// Remove a task from its group.
    Ungroup {
        /// Task ID to ungroup.
        id: u64,
    },

    /// List grouped tasks by group ID.
    Groups,

    /// Export tasks to an xlsx spreadsheet.
    Export {
        /// Output file path (default: planejamento_eventos_<dd-MM-yyyy>.xlsx).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Delete every task and category.
    Reset {
        /// Current task count, as confirmation that you know what you are
        /// deleting.
        #[arg(long)]
        confirm_tasks: usize,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a category.
    Add {
        /// Category name.
        name: String,
    },
    /// Delete a category; its tasks are kept with an empty category.
    Delete {
        /// Category ID to delete.
        id: u64,
    },
    /// List categories.
    List,
    /// Select a category as the active one, or clear the selection.
    Select {
        /// Category ID; omit to clear.
        id: Option<u64>,
    },
}

/// Parse a date from ISO or the short natural forms the flags accept.
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn parse_date_or_exit(s: &str, flag: &str) -> NaiveDate {
    match parse_date_input(s) {
        Some(d) => d,
        None => {
            eprintln!("Invalid {flag} date: {s}");
            std::process::exit(1);
        }
    }
}

/// Add a task, top-level or under a parent.
pub fn cmd_add(
    store: &mut TaskStore,
    description: String,
    category: String,
    responsible: String,
    stage: String,
    status: Status,
    start: String,
    due: String,
    parent: Option<u64>,
) {
    let start_date = parse_date_or_exit(&start, "--start");
    let due_date = parse_date_or_exit(&due, "--due");
    if due_date < start_date {
        eprintln!("Due date {due_date} is before start date {start_date}");
        std::process::exit(1);
    }

    let fields = NewTask {
        category,
        description,
        responsible,
        status,
        stage,
        start_date,
        due_date,
    };
    match store.add_task(fields, parent) {
        Some(id) => println!("Added task {id}"),
        None => {
            eprintln!("Parent task {} not found", parent.unwrap_or_default());
            std::process::exit(1);
        }
    }
}

/// List tasks as a table, optionally filtered by category.
pub fn cmd_list(store: &TaskStore, category: Option<String>) {
    let tasks: Vec<&Task> = match category {
        Some(ref name) => store.tasks_by_category(name),
        None => store.tasks().iter().collect(),
    };
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    print_table(&tasks);
}

/// Print tasks in a formatted table, subtasks indented under parents.
pub fn print_table(tasks: &[&Task]) {
    println!(
        "{:<5} {:<14} {:<22} {:<12} {:<11} {:<11} {}",
        "ID", "Category", "Status", "Who", "Start", "Due", "Description"
    );
    for t in tasks {
        print_row(t, 0);
    }
}

fn print_row(t: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{:<5} {:<14} {:<22} {:<12} {:<11} {:<11} {}{}",
        t.id,
        truncate(&t.category, 14),
        format_status(t.status),
        truncate(&t.responsible, 12),
        t.start_date.format("%d/%m/%Y"),
        t.due_date.format("%d/%m/%Y"),
        indent,
        t.description
    );
    for sub in &t.subtasks {
        print_row(sub, depth + 1);
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

const CELL_WIDTH: usize = 6;

/// Render the 60-cell activity grid for every task and subtask.
///
/// The last cell of each contiguous active run carries the due date
/// (dd/MM); other active cells render as a filled block.
pub fn cmd_timeline(store: &TaskStore) {
    let annotated = store.tasks_with_timeline();
    if annotated.is_empty() {
        println!("No tasks.");
        return;
    }

    // Month header, one band of five week cells per month.
    let mut header = format!("{:<24}", "Task");
    for month in 1..=12 {
        header.push_str(&format!(
            "{:<width$}",
            month_abbrev(month),
            width = CELL_WIDTH * WEEKS_PER_MONTH as usize
        ));
    }
    println!("{header}");

    fn print_grid(entry: &TaskWithTimeline<'_>, depth: usize) {
        let label = format!(
            "{}{}",
            "  ".repeat(depth),
            truncate(&entry.task.description, 22 - 2 * depth.min(4))
        );
        let mut line = format!("{label:<24}");
        let cells = &entry.timeline;
        for (i, cell) in cells.iter().enumerate() {
            let last_of_run =
                cell.is_active && (i + 1 == cells.len() || !cells[i + 1].is_active);
            let rendered = if last_of_run {
                entry.task.due_date.format("%d/%m").to_string()
            } else if cell.is_active {
                "#####".to_string()
            } else {
                String::new()
            };
            line.push_str(&format!("{rendered:<width$}", width = CELL_WIDTH));
        }
        println!("{}", line.trim_end());
        for sub in &entry.subtasks {
            print_grid(sub, depth + 1);
        }
    }

    for entry in &annotated {
        print_grid(entry, 0);
    }
}

/// Update fields on a task; category and description cascade to subtasks.
pub fn cmd_update(
    store: &mut TaskStore,
    id: u64,
    category: Option<String>,
    description: Option<String>,
    responsible: Option<String>,
    stage: Option<String>,
    status: Option<Status>,
    start: Option<String>,
    due: Option<String>,
) {
    let patch = TaskPatch {
        category,
        description,
        responsible,
        status,
        stage,
        start_date: start.as_deref().map(|s| parse_date_or_exit(s, "--start")),
        due_date: due.as_deref().map(|s| parse_date_or_exit(s, "--due")),
    };
    if store.update_task(id, patch) {
        println!("Updated task {id}");
    } else {
        eprintln!("Task {id} not found");
        std::process::exit(1);
    }
}

/// Delete a task from the top level and from every parent's subtask list.
pub fn cmd_delete(store: &mut TaskStore, id: u64) {
    if store.delete_task(id) {
        println!("Deleted task {id}");
    } else {
        eprintln!("Task {id} not found");
        std::process::exit(1);
    }
}

/// Handle the category subcommands.
pub fn cmd_category(store: &mut TaskStore, action: CategoryAction) {
    match action {
        CategoryAction::Add { name } => {
            let id = store.add_category(name);
            println!("Added category {id}");
        }
        CategoryAction::Delete { id } => {
            if store.delete_category(id) {
                println!("Deleted category {id}; its tasks were kept");
            } else {
                eprintln!("Category {id} not found");
                std::process::exit(1);
            }
        }
        CategoryAction::List => {
            let selected = store.selected_category();
            println!("{:<5} {:<20} {}", "ID", "Name", "Flags");
            for c in store.categories() {
                let mut flags = Vec::new();
                if c.is_default {
                    flags.push("default");
                }
                if selected == Some(c.id) {
                    flags.push("selected");
                }
                println!("{:<5} {:<20} {}", c.id, c.name, flags.join(","));
            }
        }
        CategoryAction::Select { id } => {
            if let Some(cid) = id {
                if !store.categories().iter().any(|c| c.id == cid) {
                    eprintln!("Category {cid} not found");
                    std::process::exit(1);
                }
            }
            store.set_selected_category(id);
            match id {
                Some(cid) => println!("Selected category {cid}"),
                None => println!("Cleared category selection"),
            }
        }
    }
}

/// Group tasks under a shared group ID.
pub fn cmd_group(store: &mut TaskStore, ids: Vec<u64>, group_id: Option<u64>) {
    if ids.is_empty() {
        eprintln!("No task IDs given");
        std::process::exit(1);
    }
    let gid = store.group_tasks(&ids, group_id);
    println!("Grouped {} task(s) under group {gid}", ids.len());
}

/// Remove a task from its group.
pub fn cmd_ungroup(store: &mut TaskStore, id: u64) {
    if store.ungroup_task(id) {
        println!("Ungrouped task {id}");
    } else {
        eprintln!("Task {id} not found");
        std::process::exit(1);
    }
}

/// List grouped tasks by group ID.
pub fn cmd_groups(store: &TaskStore) {
    let grouped = store.grouped_tasks();
    if grouped.is_empty() {
        println!("No grouped tasks.");
        return;
    }
    for (gid, tasks) in grouped {
        println!("Group {gid}:");
        for t in tasks {
            println!("  {:<5} {}", t.id, t.description);
        }
    }
}

/// Export every top-level task to an xlsx workbook.
pub fn cmd_export(store: &TaskStore, output: Option<PathBuf>) {
    let path = output.unwrap_or_else(|| PathBuf::from(default_file_name()));
    let annotated = store.tasks_with_timeline();
    if let Err(e) = export_xlsx(&annotated, &path) {
        eprintln!("Export failed: {e}");
        std::process::exit(1);
    }
    println!("Exported {} task(s) to {}", annotated.len(), path.display());
}

/// Wipe the store, gated by a task-count confirmation.
pub fn cmd_reset(store: &mut TaskStore, confirm_tasks: usize) {
    let count = store.task_count();
    if confirm_tasks != count {
        eprintln!(
            "Confirmation mismatch: the store holds {count} task(s), you passed {confirm_tasks}. Nothing deleted."
        );
        std::process::exit(1);
    }
    store.reset_all();
    println!("Deleted all tasks and categories ({count} task(s) removed)");
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_input_accepts_iso_and_short_forms() {
        assert_eq!(
            parse_date_input("2024-01-10"),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        let today = Local::now().date_naive();
        assert_eq!(parse_date_input("today"), Some(today));
        assert_eq!(parse_date_input("tomorrow"), Some(today + Duration::days(1)));
        assert_eq!(parse_date_input("in 3d"), Some(today + Duration::days(3)));
        assert_eq!(parse_date_input("in 2w"), Some(today + Duration::weeks(2)));
        assert_eq!(parse_date_input("soon"), None);
    }

    #[test]
    fn truncate_keeps_short_strings_and_clips_long_ones() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long category", 8), "a very …");
    }
}
