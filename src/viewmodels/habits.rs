// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habit tracker view-model.

use crate::db::{Collection, CollectionPath, DecodePolicy, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::{Habit, HabitEdit, NewHabit};
use crate::services::IdentityProvider;
use crate::viewmodels::patch;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

struct LoadedHabits {
    user_id: String,
    collection: Collection<Habit>,
    habits: Vec<Habit>,
}

impl LoadedHabits {
    /// Any undecodable habit fails the whole load.
    async fn fetch(store: &Arc<dyn DocumentStore>, user_id: String) -> Result<Self> {
        let collection = Collection::<Habit>::new(store.clone(), CollectionPath::habits(&user_id));
        let habits = collection.list_all(DecodePolicy::Strict).await?.items;
        tracing::debug!(user_id = %user_id, count = habits.len(), "Habits loaded");
        Ok(Self {
            user_id,
            collection,
            habits,
        })
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Habit> {
        self.habits
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Habit {}", id)))
    }
}

pub struct HabitViewModel {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    state: Option<LoadedHabits>,
}

impl HabitViewModel {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            state: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    pub fn habits(&self) -> &[Habit] {
        self.state.as_ref().map(|s| s.habits.as_slice()).unwrap_or(&[])
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedHabits> {
        self.state.as_mut().ok_or(AppError::NotLoaded)
    }

    pub async fn load_for_user(&mut self) -> Result<()> {
        let identity = self.identity.current_user().await?;
        self.state = Some(LoadedHabits::fetch(&self.store, identity.user_id).await?);
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let user_id = self.loaded_mut()?.user_id.clone();
        self.state = Some(LoadedHabits::fetch(&self.store, user_id).await?);
        Ok(())
    }

    async fn reconcile(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = result {
            tracing::warn!(error = %err, "Habit write failed, reloading from backend");
            if let Err(reload_err) = self.refresh().await {
                tracing::warn!(error = %reload_err, "Reload after failed habit write failed");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Habits scheduled on `date`'s weekday.
    pub fn habits_due_on(&self, date: NaiveDate) -> Vec<&Habit> {
        self.habits().iter().filter(|h| h.is_due_on(date)).collect()
    }

    pub async fn add_habit(&mut self, input: NewHabit) -> Result<Habit> {
        input.validate()?;
        let loaded = self.loaded_mut()?;

        let habit = Habit::new(input, Utc::now());
        loaded.habits.push(habit.clone());

        let result = loaded.collection.upsert(&habit.id, &habit).await;
        self.reconcile(result).await?;
        tracing::info!(habit_id = %habit.id, "Habit added");
        Ok(habit)
    }

    /// Toggle completion for the calendar day containing `at`.
    ///
    /// Writes the whole completion list back. Returns whether that day is
    /// now completed.
    pub async fn complete_habit(&mut self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let loaded = self.loaded_mut()?;
        let habit = loaded.find_mut(id)?;
        let completed = habit.toggle_completion(at);
        let dates = habit.completed_dates.clone();

        let result = async {
            let fields = patch([("completed_dates", json!(dates))])?;
            loaded.collection.update(id, fields).await
        }
        .await;

        self.reconcile(result).await?;
        tracing::debug!(habit_id = id, completed, "Habit completion toggled");
        Ok(completed)
    }

    pub async fn edit_habit(&mut self, id: &str, edit: HabitEdit) -> Result<Habit> {
        edit.validate()?;
        let loaded = self.loaded_mut()?;
        let habit = loaded.find_mut(id)?;
        habit.apply(edit);
        let updated = habit.clone();

        let result = async {
            let fields = patch([
                ("title", json!(updated.title)),
                ("description", json!(updated.description)),
                ("interval", json!(updated.interval)),
            ])?;
            loaded.collection.update(id, fields).await
        }
        .await;

        self.reconcile(result).await?;
        Ok(updated)
    }

    pub async fn delete_habit(&mut self, id: &str) -> Result<()> {
        let loaded = self.loaded_mut()?;
        let index = loaded
            .habits
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Habit {}", id)))?;
        loaded.habits.remove(index);

        let result = loaded.collection.delete(id).await;
        self.reconcile(result).await?;
        tracing::info!(habit_id = id, "Habit deleted");
        Ok(())
    }
}
