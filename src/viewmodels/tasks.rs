// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task list view-model.

use crate::db::{
    document_id_for_name, Collection, CollectionPath, DecodePolicy, DocumentStore,
};
use crate::error::{AppError, Result};
use crate::models::{NewTask, Section, Task, DEFAULT_SECTION};
use crate::services::IdentityProvider;
use crate::time_utils::local_day;
use crate::viewmodels::patch;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use validator::Validate;

/// Stable sort by due date ascending; undated tasks go last.
pub fn sort_by_due_date(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.due_date.unwrap_or(DateTime::<Utc>::MAX_UTC));
}

/// Section labels with the default section first and the rest alphabetical.
fn ordered_sections<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let rest: BTreeSet<&str> = names
        .into_iter()
        .filter(|n| *n != DEFAULT_SECTION)
        .collect();

    std::iter::once(DEFAULT_SECTION)
        .chain(rest)
        .map(str::to_string)
        .collect()
}

struct LoadedTasks {
    user_id: String,
    tasks: Collection<Task>,
    section_docs: Collection<Section>,
    incomplete: Vec<Task>,
    completed: Vec<Task>,
    /// Display order, always starting with the default section
    sections: Vec<String>,
    /// Sections that have a stored document
    stored_sections: HashSet<String>,
    skipped: Vec<AppError>,
}

impl LoadedTasks {
    async fn fetch(store: &Arc<dyn DocumentStore>, user_id: String) -> Result<Self> {
        let tasks = Collection::<Task>::new(store.clone(), CollectionPath::tasks(&user_id));
        let section_docs =
            Collection::<Section>::new(store.clone(), CollectionPath::sections(&user_id));

        let fetched = tasks.list_all(DecodePolicy::SkipInvalid).await?;
        let fetched_sections = section_docs.list_all(DecodePolicy::SkipInvalid).await?;

        let stored_sections: HashSet<String> = fetched_sections
            .items
            .into_iter()
            .map(|s| s.name)
            .collect();

        let (completed, incomplete): (Vec<Task>, Vec<Task>) =
            fetched.items.into_iter().partition(|t| t.is_complete);

        let sections = ordered_sections(
            incomplete
                .iter()
                .chain(completed.iter())
                .map(Task::section_name)
                .chain(stored_sections.iter().map(String::as_str)),
        );

        let mut skipped = fetched.skipped;
        skipped.extend(fetched_sections.skipped);

        tracing::debug!(
            user_id = %user_id,
            incomplete = incomplete.len(),
            completed = completed.len(),
            sections = sections.len(),
            skipped = skipped.len(),
            "Tasks loaded"
        );

        Ok(Self {
            user_id,
            tasks,
            section_docs,
            incomplete,
            completed,
            sections,
            stored_sections,
            skipped,
        })
    }

    fn remember_section(&mut self, name: &str) {
        if !self.sections.iter().any(|s| s == name) {
            self.sections = ordered_sections(
                self.sections
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(name)),
            );
        }
    }

    /// Recompute display sections from the cached tasks and stored sections.
    fn rebuild_sections(&mut self) {
        let sections = ordered_sections(
            self.incomplete
                .iter()
                .chain(self.completed.iter())
                .map(Task::section_name)
                .chain(self.stored_sections.iter().map(String::as_str)),
        );
        self.sections = sections;
    }

    /// Put a task back into the list matching its completion state.
    fn restore(&mut self, task: Task) {
        if task.is_complete {
            self.completed.push(task);
        } else {
            self.incomplete.push(task);
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.incomplete
            .iter_mut()
            .chain(self.completed.iter_mut())
            .find(|t| t.id == id)
    }

    /// Remove a task from whichever list holds it.
    fn take(&mut self, id: &str) -> Option<Task> {
        if let Some(index) = self.incomplete.iter().position(|t| t.id == id) {
            return Some(self.incomplete.remove(index));
        }
        self.completed
            .iter()
            .position(|t| t.id == id)
            .map(|index| self.completed.remove(index))
    }

    async fn write_section(&self, name: &str) -> Result<()> {
        self.section_docs
            .upsert(
                &document_id_for_name(name),
                &Section {
                    name: name.to_string(),
                },
            )
            .await
    }
}

enum TaskState {
    Unloaded,
    Loaded(Box<LoadedTasks>),
}

/// Holds the signed-in user's tasks split into incomplete and completed lists.
pub struct TaskViewModel {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    state: TaskState,
}

impl TaskViewModel {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            state: TaskState::Unloaded,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, TaskState::Loaded(_))
    }

    /// Incomplete tasks in display order.
    pub fn tasks(&self) -> &[Task] {
        match &self.state {
            TaskState::Loaded(loaded) => &loaded.incomplete,
            TaskState::Unloaded => &[],
        }
    }

    pub fn completed_tasks(&self) -> &[Task] {
        match &self.state {
            TaskState::Loaded(loaded) => &loaded.completed,
            TaskState::Unloaded => &[],
        }
    }

    pub fn sections(&self) -> &[String] {
        match &self.state {
            TaskState::Loaded(loaded) => &loaded.sections,
            TaskState::Unloaded => &[],
        }
    }

    /// Decoding errors for stored tasks that were left out of the last load.
    pub fn skipped_documents(&self) -> &[AppError] {
        match &self.state {
            TaskState::Loaded(loaded) => &loaded.skipped,
            TaskState::Unloaded => &[],
        }
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedTasks> {
        match &mut self.state {
            TaskState::Loaded(loaded) => Ok(&mut **loaded),
            TaskState::Unloaded => Err(AppError::NotLoaded),
        }
    }

    /// Resolve the signed-in user and load their tasks and sections.
    pub async fn load_for_user(&mut self) -> Result<()> {
        let identity = self.identity.current_user().await?;
        let loaded = LoadedTasks::fetch(&self.store, identity.user_id).await?;
        self.state = TaskState::Loaded(Box::new(loaded));
        Ok(())
    }

    /// Reload the current user's collections.
    pub async fn refresh(&mut self) -> Result<()> {
        let user_id = self.loaded_mut()?.user_id.clone();
        let loaded = LoadedTasks::fetch(&self.store, user_id).await?;
        self.state = TaskState::Loaded(Box::new(loaded));
        Ok(())
    }

    /// Reload after a failed write and return the original error.
    ///
    /// If the reload fails too, `undo` reverts the optimistic change.
    async fn reconcile<F>(&mut self, result: Result<()>, undo: F) -> Result<()>
    where
        F: FnOnce(&mut LoadedTasks),
    {
        if let Err(err) = result {
            tracing::warn!(error = %err, "Task write failed, reloading from backend");
            if let Err(reload_err) = self.refresh().await {
                tracing::warn!(error = %reload_err, "Reload after failed task write failed");
                if let TaskState::Loaded(loaded) = &mut self.state {
                    undo(&mut **loaded);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Create a task, creating the default section document and its own
    /// section document first if they are missing.
    pub async fn add_task(&mut self, input: NewTask) -> Result<Task> {
        input.validate()?;
        let loaded = self.loaded_mut()?;

        let task = Task::new(input);
        let section = task.section_name().to_string();
        let mut missing: Vec<String> = Vec::new();
        for name in [DEFAULT_SECTION, section.as_str()] {
            if !loaded.stored_sections.contains(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        loaded.remember_section(&section);
        loaded.incomplete.push(task.clone());

        let result = async {
            for name in &missing {
                loaded.write_section(name).await?;
                loaded.stored_sections.insert(name.clone());
            }
            loaded.tasks.upsert(&task.id, &task).await
        }
        .await;

        let task_id = task.id.clone();
        self.reconcile(result, move |loaded| {
            loaded.incomplete.retain(|t| t.id != task_id);
            loaded.rebuild_sections();
        })
        .await?;
        tracing::info!(task_id = %task.id, section = %section, "Task added");
        Ok(task)
    }

    /// Create an empty section.
    pub async fn add_section(&mut self, name: &str) -> Result<()> {
        let section = Section {
            name: name.trim().to_string(),
        };
        section.validate()?;

        let loaded = self.loaded_mut()?;
        if loaded.stored_sections.contains(&section.name) {
            return Ok(());
        }
        loaded.remember_section(&section.name);

        let result = loaded.write_section(&section.name).await;
        if result.is_ok() {
            loaded.stored_sections.insert(section.name.clone());
        }
        self.reconcile(result, LoadedTasks::rebuild_sections).await
    }

    /// Flip completion and move the task to the other list.
    pub async fn toggle_complete(&mut self, id: &str) -> Result<Task> {
        let loaded = self.loaded_mut()?;
        let task = loaded
            .take(id)
            .ok_or_else(|| AppError::NotFound(format!("Task {}", id)))?;

        let updated = if task.is_complete {
            task.reopened()
        } else {
            task.completed(Utc::now())
        };

        if updated.is_complete {
            loaded.completed.push(updated.clone());
        } else {
            loaded.incomplete.push(updated.clone());
        }

        let result = async {
            let fields = patch([
                ("is_complete", json!(updated.is_complete)),
                ("date_completed", json!(updated.date_completed)),
            ])?;
            loaded.tasks.update(id, fields).await
        }
        .await;

        self.reconcile(result, |loaded| {
            loaded.take(id);
            loaded.restore(task);
        })
        .await?;
        tracing::debug!(task_id = id, is_complete = updated.is_complete, "Task toggled");
        Ok(updated)
    }

    pub async fn delete_task(&mut self, id: &str) -> Result<()> {
        let loaded = self.loaded_mut()?;
        let task = loaded
            .take(id)
            .ok_or_else(|| AppError::NotFound(format!("Task {}", id)))?;

        let result = loaded.tasks.delete(id).await;
        self.reconcile(result, |loaded| loaded.restore(task)).await?;
        tracing::info!(task_id = id, "Task deleted");
        Ok(())
    }

    /// Set or clear a task's due date.
    pub async fn set_due_date(&mut self, id: &str, due: Option<DateTime<Utc>>) -> Result<()> {
        let loaded = self.loaded_mut()?;
        let task = loaded
            .find_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Task {}", id)))?;
        let previous = std::mem::replace(&mut task.due_date, due);

        let result = async {
            let fields = patch([("due_date", json!(due))])?;
            loaded.tasks.update(id, fields).await
        }
        .await;

        self.reconcile(result, |loaded| {
            if let Some(task) = loaded.find_mut(id) {
                task.due_date = previous;
            }
        })
        .await
    }

    /// Order incomplete tasks by due date, undated last.
    pub fn sort_tasks(&mut self) {
        if let TaskState::Loaded(loaded) = &mut self.state {
            sort_by_due_date(&mut loaded.incomplete);
        }
    }

    /// Incomplete tasks filed under `section`.
    pub fn tasks_in_section(&self, section: &str) -> Vec<&Task> {
        self.tasks()
            .iter()
            .filter(|t| t.section_name() == section)
            .collect()
    }

    /// Tasks (complete or not) due on the given local calendar day.
    pub fn tasks_due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks()
            .iter()
            .chain(self.completed_tasks())
            .filter(|t| t.due_date.is_some_and(|due| local_day(due) == date))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dated(title: &str, due: Option<DateTime<Utc>>) -> Task {
        Task::new(NewTask {
            due_date: due,
            ..NewTask::titled(title)
        })
    }

    #[test]
    fn test_sort_puts_undated_last_and_is_stable() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let mut tasks = vec![
            dated("undated-a", None),
            dated("late", Some(late)),
            dated("early-a", Some(early)),
            dated("undated-b", None),
            dated("early-b", Some(early)),
        ];

        sort_by_due_date(&mut tasks);

        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["early-a", "early-b", "late", "undated-a", "undated-b"]
        );
    }

    #[test]
    fn test_ordered_sections_default_first() {
        let sections = ordered_sections(["Work", "Inbox", "Errands", "Work"]);
        assert_eq!(sections, vec!["Inbox", "Errands", "Work"]);
        assert_eq!(ordered_sections([]), vec![DEFAULT_SECTION]);
    }
}
