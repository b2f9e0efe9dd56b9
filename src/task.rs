//! Task and category data structures.
//!
//! This module defines the core `Task` struct that represents a single
//! planning item with its schedule, ownership and workflow metadata, the
//! `Category` grouping bucket, and the derived `WeekCell` timeline slot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::Status;

/// A planning item with schedule, ownership and workflow metadata.
///
/// Tasks own their subtasks directly; the store's own API only ever creates
/// one level of nesting, though the structure allows more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    /// Name of the owning category; empty when that category was deleted.
    pub category: String,
    pub description: String,
    pub responsible: String,
    pub status: Status,
    pub stage: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Ad-hoc cross-cutting group tag, independent of category and parent.
    #[serde(default)]
    pub group_id: Option<u64>,
    /// Set only when the task was created through the subtask path.
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub subtasks: Vec<Task>,
}

/// A named grouping bucket for tasks, independent of the task tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    /// Marks categories seeded at first startup.
    #[serde(default)]
    pub is_default: bool,
}

/// One slot of the fixed 12-month × 5-week activity grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCell {
    pub month: u32,
    pub week: u32,
    pub is_active: bool,
}

/// A task annotated with its computed timeline, subtasks annotated
/// recursively. Derived read model, never persisted.
#[derive(Debug, Clone)]
pub struct TaskWithTimeline<'a> {
    pub task: &'a Task,
    pub timeline: Vec<WeekCell>,
    pub subtasks: Vec<TaskWithTimeline<'a>>,
}
