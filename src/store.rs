//! Task store and persistence backends.
//!
//! `TaskStore` is the single source of truth for tasks and categories. All
//! mutation goes through its operations; every mutation persists the whole
//! snapshot through the injected `StorageBackend`. Reads for rendering and
//! export are derived from the in-memory state and never mutate it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::rc::Rc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::Status;
use crate::task::{Category, Task, TaskWithTimeline};
use crate::timeline::calculate_timeline;

/// Snapshot schema understood by this binary.
pub const SCHEMA_VERSION: u32 = 1;

/// Categories seeded into an empty store.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Planejamento", "Marketing", "Conteúdo", "Logística"];

/// The full persisted state: tasks with nested subtasks, categories, and the
/// selected-category pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub selected_category: Option<u64>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for StoreState {
    fn default() -> Self {
        StoreState {
            schema_version: SCHEMA_VERSION,
            tasks: Vec::new(),
            categories: Vec::new(),
            selected_category: None,
        }
    }
}

/// Durable home for a `StoreState` snapshot.
///
/// `load` returns `None` when no usable snapshot exists, in which case the
/// store starts fresh with seeded categories.
pub trait StorageBackend {
    fn load(&self) -> Option<StoreState>;
    fn save(&self, state: &StoreState) -> std::io::Result<()>;
}

/// JSON file backend with atomic writes (temp file + rename).
///
/// Loading is lenient: a missing file or a parse failure starts a fresh
/// store with a note on stderr rather than aborting.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Option<StoreState> {
        if !self.path.exists() {
            return None;
        }
        let mut buf = String::new();
        match File::open(&self.path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str::<StoreState>(&buf) {
                Ok(state) => {
                    if state.schema_version > SCHEMA_VERSION {
                        eprintln!(
                            "Snapshot schema v{} is newer than supported v{}, starting fresh",
                            state.schema_version, SCHEMA_VERSION
                        );
                        None
                    } else {
                        Some(state)
                    }
                }
                Err(e) => {
                    eprintln!("Error parsing snapshot, starting fresh: {e}");
                    None
                }
            },
            Err(e) => {
                eprintln!("Error reading snapshot, starting fresh: {e}");
                None
            }
        }
    }

    fn save(&self, state: &StoreState) -> std::io::Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(state)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory backend; holds the last saved snapshot. Used by tests and
/// ephemeral runs. Clones share the same snapshot slot, so a caller can keep
/// a handle to observe what the store persisted.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    saved: Rc<RefCell<Option<StoreState>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// The most recently saved snapshot, if any.
    pub fn snapshot(&self) -> Option<StoreState> {
        self.saved.borrow().clone()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Option<StoreState> {
        self.saved.borrow().clone()
    }

    fn save(&self, state: &StoreState) -> std::io::Result<()> {
        *self.saved.borrow_mut() = Some(state.clone());
        Ok(())
    }
}

/// Fields of a new task; the store assigns the id and subtask list.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub category: String,
    pub description: String,
    pub responsible: String,
    pub status: Status,
    pub stage: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Partial update for `update_task`; `None` fields are left untouched on the
/// matched task itself (cascading to children follows its own rules, see
/// `update_task`).
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub category: Option<String>,
    pub description: Option<String>,
    pub responsible: Option<String>,
    pub status: Option<Status>,
    pub stage: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// In-memory, persisted store for tasks and categories.
pub struct TaskStore {
    state: StoreState,
    backend: Box<dyn StorageBackend>,
}

impl TaskStore {
    /// Open a store over a backend, rehydrating the last snapshot or seeding
    /// the default categories into a fresh one.
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        let state = backend.load().unwrap_or_else(|| {
            let mut state = StoreState::default();
            for (i, name) in DEFAULT_CATEGORIES.iter().enumerate() {
                state.categories.push(Category {
                    id: i as u64 + 1,
                    name: (*name).to_string(),
                    is_default: true,
                });
            }
            state
        });
        TaskStore { state, backend }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.state.categories
    }

    pub fn selected_category(&self) -> Option<u64> {
        self.state.selected_category
    }

    /// Count of all tasks in the tree, subtasks included.
    pub fn task_count(&self) -> usize {
        fn count(tasks: &[Task]) -> usize {
            tasks.iter().map(|t| 1 + count(&t.subtasks)).sum()
        }
        count(&self.state.tasks)
    }

    /// Next free id across the whole tree and the category list.
    fn next_id(&self) -> u64 {
        fn max_task_id(tasks: &[Task]) -> u64 {
            tasks
                .iter()
                .map(|t| t.id.max(t.group_id.unwrap_or(0)).max(max_task_id(&t.subtasks)))
                .max()
                .unwrap_or(0)
        }
        let max_cat = self.state.categories.iter().map(|c| c.id).max().unwrap_or(0);
        max_task_id(&self.state.tasks).max(max_cat) + 1
    }

    /// Write the snapshot through the backend. A failure costs durability of
    /// this one mutation, never the in-memory state.
    fn persist(&self) {
        if let Err(e) = self.backend.save(&self.state) {
            eprintln!("Failed to save snapshot: {e}");
        }
    }

    /// Add a task, top-level or as a subtask of `parent_id`.
    ///
    /// Returns the new id, or `None` when `parent_id` names no top-level
    /// task — in that case the store is left unchanged. A subtask's category
    /// is forced to its parent's at creation.
    pub fn add_task(&mut self, fields: NewTask, parent_id: Option<u64>) -> Option<u64> {
        let id = self.next_id();
        let mut task = Task {
            id,
            category: fields.category,
            description: fields.description,
            responsible: fields.responsible,
            status: fields.status,
            stage: fields.stage,
            start_date: fields.start_date,
            due_date: fields.due_date,
            group_id: None,
            parent_id,
            subtasks: Vec::new(),
        };

        match parent_id {
            Some(pid) => {
                let parent = self.state.tasks.iter_mut().find(|t| t.id == pid)?;
                task.category = parent.category.clone();
                parent.subtasks.push(task);
            }
            None => self.state.tasks.push(task),
        }
        self.persist();
        Some(id)
    }

    /// Merge `patch` into the task with this id and cascade to its children.
    ///
    /// Direct subtasks get `category` and `description` overwritten to the
    /// incoming values, keeping their own prior value when the patch omits
    /// the field. Top-level tasks whose `parent_id` matches instead default
    /// to the empty string when the patch omits the field; the two cascade
    /// paths deliberately disagree and callers rely on the first.
    pub fn update_task(&mut self, id: u64, patch: TaskPatch) -> bool {
        let mut matched = false;
        for task in &mut self.state.tasks {
            if task.id == id {
                matched = true;
                for sub in &mut task.subtasks {
                    sub.category = patch.category.clone().unwrap_or_else(|| sub.category.clone());
                    sub.description = patch
                        .description
                        .clone()
                        .unwrap_or_else(|| sub.description.clone());
                }
                if let Some(category) = patch.category.clone() {
                    task.category = category;
                }
                if let Some(description) = patch.description.clone() {
                    task.description = description;
                }
                if let Some(responsible) = patch.responsible.clone() {
                    task.responsible = responsible;
                }
                if let Some(status) = patch.status {
                    task.status = status;
                }
                if let Some(stage) = patch.stage.clone() {
                    task.stage = stage;
                }
                if let Some(start) = patch.start_date {
                    task.start_date = start;
                }
                if let Some(due) = patch.due_date {
                    task.due_date = due;
                }
            } else if task.parent_id == Some(id) {
                task.category = patch.category.clone().unwrap_or_default();
                task.description = patch.description.clone().unwrap_or_default();
            }
        }
        if matched {
            self.persist();
        }
        matched
    }

    /// Remove the task with this id from the top level and from every
    /// top-level task's subtask list.
    ///
    /// The cascade is one level deep: a task that exists only as a
    /// subtask-of-a-subtask is not reachable and survives. Known limitation,
    /// kept to match the behavior existing data may rely on.
    pub fn delete_task(&mut self, id: u64) -> bool {
        let before = self.task_count();
        self.state.tasks.retain(|t| t.id != id);
        for task in &mut self.state.tasks {
            task.subtasks.retain(|s| s.id != id);
        }
        let removed = self.task_count() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Add a category. Names are not deduplicated; two categories with the
    /// same name both match tasks filtered by that name.
    pub fn add_category(&mut self, name: impl Into<String>) -> u64 {
        let id = self.next_id();
        self.state.categories.push(Category {
            id,
            name: name.into(),
            is_default: false,
        });
        self.persist();
        id
    }

    /// Delete a category; tasks tagged with it (at any depth) keep existing
    /// with an empty category name.
    pub fn delete_category(&mut self, id: u64) -> bool {
        let Some(pos) = self.state.categories.iter().position(|c| c.id == id) else {
            return false;
        };
        let name = self.state.categories.remove(pos).name;

        fn clear(tasks: &mut [Task], name: &str) {
            for task in tasks {
                if task.category == name {
                    task.category.clear();
                }
                clear(&mut task.subtasks, name);
            }
        }
        clear(&mut self.state.tasks, &name);
        if self.state.selected_category == Some(id) {
            self.state.selected_category = None;
        }
        self.persist();
        true
    }

    /// Stamp a shared group id on the listed top-level tasks, minting a
    /// fresh one unless `group_id` is given. Returns the group id used.
    pub fn group_tasks(&mut self, ids: &[u64], group_id: Option<u64>) -> u64 {
        let gid = group_id.unwrap_or_else(|| self.next_id());
        for task in &mut self.state.tasks {
            if ids.contains(&task.id) {
                task.group_id = Some(gid);
            }
        }
        self.persist();
        gid
    }

    /// Clear a task's group tag.
    pub fn ungroup_task(&mut self, id: u64) -> bool {
        let mut matched = false;
        for task in &mut self.state.tasks {
            if task.id == id {
                task.group_id = None;
                matched = true;
            }
        }
        if matched {
            self.persist();
        }
        matched
    }

    /// Top-level tasks keyed by group id; ungrouped tasks are excluded.
    pub fn grouped_tasks(&self) -> BTreeMap<u64, Vec<&Task>> {
        let mut map: BTreeMap<u64, Vec<&Task>> = BTreeMap::new();
        for task in &self.state.tasks {
            if let Some(gid) = task.group_id {
                map.entry(gid).or_default().push(task);
            }
        }
        map
    }

    pub fn set_selected_category(&mut self, category_id: Option<u64>) {
        self.state.selected_category = category_id;
        self.persist();
    }

    /// Every top-level task, and recursively every subtask, annotated with
    /// its 60-cell timeline. Pure derived read.
    pub fn tasks_with_timeline(&self) -> Vec<TaskWithTimeline<'_>> {
        fn annotate(task: &Task) -> TaskWithTimeline<'_> {
            TaskWithTimeline {
                task,
                timeline: calculate_timeline(task.start_date, task.due_date),
                subtasks: task.subtasks.iter().map(annotate).collect(),
            }
        }
        self.state.tasks.iter().map(annotate).collect()
    }

    /// Top-level tasks (subtasks excluded) whose category name matches.
    pub fn tasks_by_category(&self, category_name: &str) -> Vec<&Task> {
        self.state
            .tasks
            .iter()
            .filter(|t| t.category == category_name)
            .collect()
    }

    /// Wipe tasks, categories and the selected pointer. The CLI gates this
    /// behind a task-count confirmation.
    pub fn reset_all(&mut self) {
        self.state.tasks.clear();
        self.state.categories.clear();
        self.state.selected_category = None;
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_task(category: &str, description: &str) -> NewTask {
        NewTask {
            category: category.to_string(),
            description: description.to_string(),
            responsible: "Ana".to_string(),
            status: Status::NotStarted,
            stage: "Briefing".to_string(),
            start_date: d(2024, 1, 10),
            due_date: d(2024, 2, 5),
        }
    }

    fn memory_store() -> TaskStore {
        TaskStore::open(Box::new(MemoryBackend::new()))
    }

    #[test]
    fn fresh_store_seeds_default_categories() {
        let store = memory_store();
        let names: Vec<_> = store.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, DEFAULT_CATEGORIES);
        assert!(store.categories().iter().all(|c| c.is_default));
    }

    #[test]
    fn add_task_assigns_unique_ids_across_the_tree() {
        let mut store = memory_store();
        let a = store.add_task(new_task("Marketing", "a"), None).unwrap();
        let b = store.add_task(new_task("Marketing", "b"), Some(a)).unwrap();
        let c = store.add_task(new_task("Marketing", "c"), None).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.tasks()[0].subtasks.len(), 1);
        assert_eq!(store.tasks()[0].subtasks[0].parent_id, Some(a));
    }

    #[test]
    fn subtask_inherits_parent_category_at_creation() {
        let mut store = memory_store();
        let parent = store.add_task(new_task("Marketing", "campaign"), None).unwrap();
        store.add_task(new_task("Logística", "sub"), Some(parent)).unwrap();
        assert_eq!(store.tasks()[0].subtasks[0].category, "Marketing");
    }

    #[test]
    fn add_task_with_unknown_parent_is_a_no_op() {
        let mut store = memory_store();
        store.add_task(new_task("Marketing", "a"), None).unwrap();
        let result = store.add_task(new_task("Marketing", "orphan"), Some(999));
        assert_eq!(result, None);
        assert_eq!(store.task_count(), 1);
    }

    #[test]
    fn update_propagates_category_to_direct_subtasks() {
        let mut store = memory_store();
        let parent = store.add_task(new_task("Marketing", "campaign"), None).unwrap();
        store.add_task(new_task("Marketing", "sub"), Some(parent)).unwrap();
        let matched = store.update_task(
            parent,
            TaskPatch {
                category: Some("Conteúdo".to_string()),
                ..TaskPatch::default()
            },
        );
        assert!(matched);
        assert_eq!(store.tasks()[0].category, "Conteúdo");
        assert_eq!(store.tasks()[0].subtasks[0].category, "Conteúdo");
        // Description was omitted, so the subtask keeps its own.
        assert_eq!(store.tasks()[0].subtasks[0].description, "sub");
    }

    #[test]
    fn update_cascade_asymmetry_for_parent_id_matches() {
        // A top-level task carrying parent_id is matched through the
        // alternate path, which defaults omitted fields to empty strings.
        let mut store = memory_store();
        let parent = store.add_task(new_task("Marketing", "campaign"), None).unwrap();
        let stray = Task {
            id: 999,
            category: "Marketing".to_string(),
            description: "stray".to_string(),
            responsible: String::new(),
            status: Status::NotStarted,
            stage: String::new(),
            start_date: d(2024, 1, 1),
            due_date: d(2024, 1, 2),
            group_id: None,
            parent_id: Some(parent),
            subtasks: Vec::new(),
        };
        store.state.tasks.push(stray);

        store.update_task(
            parent,
            TaskPatch {
                category: Some("Conteúdo".to_string()),
                ..TaskPatch::default()
            },
        );
        let stray = store.tasks().iter().find(|t| t.id == 999).unwrap();
        assert_eq!(stray.category, "Conteúdo");
        assert_eq!(stray.description, "");
    }

    #[test]
    fn update_unknown_id_reports_miss_and_changes_nothing() {
        let mut store = memory_store();
        store.add_task(new_task("Marketing", "a"), None).unwrap();
        let matched = store.update_task(
            42,
            TaskPatch {
                description: Some("x".to_string()),
                ..TaskPatch::default()
            },
        );
        assert!(!matched);
        assert_eq!(store.tasks()[0].description, "a");
    }

    #[test]
    fn delete_removes_top_level_and_subtask_occurrences() {
        let mut store = memory_store();
        let parent = store.add_task(new_task("Marketing", "campaign"), None).unwrap();
        let sub = store.add_task(new_task("Marketing", "sub"), Some(parent)).unwrap();
        assert!(store.delete_task(sub));
        assert!(store.tasks()[0].subtasks.is_empty());
        assert!(store.delete_task(parent));
        assert!(store.tasks().is_empty());
        assert!(!store.delete_task(parent));
    }

    #[test]
    fn delete_does_not_reach_two_levels_deep() {
        // The cascade is one level only; a grandchild survives deletion by
        // id. Pinned on purpose.
        let mut store = memory_store();
        let parent = store.add_task(new_task("Marketing", "campaign"), None).unwrap();
        store.add_task(new_task("Marketing", "child"), Some(parent)).unwrap();
        let grandchild = Task {
            id: 500,
            category: "Marketing".to_string(),
            description: "grandchild".to_string(),
            responsible: String::new(),
            status: Status::NotStarted,
            stage: String::new(),
            start_date: d(2024, 1, 1),
            due_date: d(2024, 1, 2),
            group_id: None,
            parent_id: None,
            subtasks: Vec::new(),
        };
        store.state.tasks[0].subtasks[0].subtasks.push(grandchild);

        assert!(!store.delete_task(500));
        assert_eq!(store.tasks()[0].subtasks[0].subtasks.len(), 1);
    }

    #[test]
    fn delete_category_orphans_tasks_without_deleting_them() {
        let mut store = memory_store();
        let cat = store.add_category("PLANNING");
        let parent = store.add_task(new_task("PLANNING", "a"), None).unwrap();
        store.add_task(new_task("PLANNING", "b"), Some(parent)).unwrap();

        assert!(store.delete_category(cat));
        assert!(store.categories().iter().all(|c| c.name != "PLANNING"));
        assert_eq!(store.task_count(), 2);
        assert_eq!(store.tasks()[0].category, "");
        assert_eq!(store.tasks()[0].subtasks[0].category, "");
    }

    #[test]
    fn duplicate_category_names_are_permitted() {
        let mut store = memory_store();
        let a = store.add_category("Social");
        let b = store.add_category("Social");
        assert_ne!(a, b);
        assert_eq!(
            store.categories().iter().filter(|c| c.name == "Social").count(),
            2
        );
    }

    #[test]
    fn tasks_by_category_matches_top_level_only() {
        let mut store = memory_store();
        store.add_category("PLANNING");
        let id = store.add_task(new_task("PLANNING", "Draft brief"), None).unwrap();
        store.add_task(new_task("PLANNING", "sub"), Some(id)).unwrap();

        let found = store.tasks_by_category("PLANNING");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "Draft brief");
    }

    #[test]
    fn timeline_read_annotates_every_node_with_sixty_cells() {
        let mut store = memory_store();
        let parent = store.add_task(new_task("PLANNING", "Draft brief"), None).unwrap();
        store.add_task(new_task("PLANNING", "sub"), Some(parent)).unwrap();

        let annotated = store.tasks_with_timeline();
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].timeline.len(), 60);
        assert_eq!(annotated[0].subtasks.len(), 1);
        assert_eq!(annotated[0].subtasks[0].timeline.len(), 60);

        // Jan 10 to Feb 5 2024 spans January into February.
        let active: Vec<_> = annotated[0]
            .timeline
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.month)
            .collect();
        assert!(active.contains(&1) && active.contains(&2));

        // Idempotent without intervening mutation.
        let again = store.tasks_with_timeline();
        assert_eq!(annotated[0].timeline, again[0].timeline);
    }

    #[test]
    fn grouping_stamps_and_clears_group_ids() {
        let mut store = memory_store();
        let a = store.add_task(new_task("Marketing", "a"), None).unwrap();
        let b = store.add_task(new_task("Conteúdo", "b"), None).unwrap();
        let c = store.add_task(new_task("Logística", "c"), None).unwrap();

        let gid = store.group_tasks(&[a, b], None);
        let grouped = store.grouped_tasks();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&gid].len(), 2);
        assert!(store.tasks().iter().find(|t| t.id == c).unwrap().group_id.is_none());

        assert!(store.ungroup_task(a));
        assert_eq!(store.grouped_tasks()[&gid].len(), 1);
    }

    #[test]
    fn reset_all_clears_everything() {
        let mut store = memory_store();
        store.add_task(new_task("Marketing", "a"), None).unwrap();
        store.set_selected_category(Some(1));
        store.reset_all();
        assert!(store.tasks().is_empty());
        assert!(store.categories().is_empty());
        assert_eq!(store.selected_category(), None);
    }

    #[test]
    fn mutations_persist_through_the_backend() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();
        let mut store = TaskStore::open(Box::new(backend));
        store.add_task(new_task("Marketing", "a"), None).unwrap();
        let saved = handle.snapshot().unwrap();
        assert_eq!(saved.tasks.len(), 1);
        assert_eq!(saved.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn file_backend_round_trips_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planboard.json");
        {
            let mut store = TaskStore::open(Box::new(JsonFileBackend::new(&path)));
            let parent = store.add_task(new_task("Marketing", "campaign"), None).unwrap();
            store.add_task(new_task("Marketing", "sub"), Some(parent)).unwrap();
        }
        let store = TaskStore::open(Box::new(JsonFileBackend::new(&path)));
        assert_eq!(store.task_count(), 2);
        assert_eq!(store.tasks()[0].subtasks[0].description, "sub");
    }

    #[test]
    fn file_backend_refuses_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planboard.json");
        let newer = StoreState {
            schema_version: SCHEMA_VERSION + 1,
            ..StoreState::default()
        };
        JsonFileBackend::new(&path).save(&newer).unwrap();
        assert!(JsonFileBackend::new(&path).load().is_none());
    }
}
