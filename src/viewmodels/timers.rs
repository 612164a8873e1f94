// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stopwatch and saved-session log view-model.

use crate::db::{Collection, CollectionPath, DecodePolicy, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::timer::UNTITLED_DESCRIPTION;
use crate::models::TimerEntry;
use crate::services::IdentityProvider;
use crate::time_utils::format_elapsed;
use crate::viewmodels::stopwatch::{Stopwatch, StopwatchState};
use crate::viewmodels::patch;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const SAVED_AT_FIELD: &str = "saved_at";

struct LoadedTimers {
    user_id: String,
    collection: Collection<TimerEntry>,
    /// Newest first by `saved_at`
    entries: Vec<TimerEntry>,
    skipped: Vec<AppError>,
}

impl LoadedTimers {
    async fn fetch(store: &Arc<dyn DocumentStore>, user_id: String) -> Result<Self> {
        let collection =
            Collection::<TimerEntry>::new(store.clone(), CollectionPath::timers(&user_id));
        let fetched = collection.list_all(DecodePolicy::SkipInvalid).await?;

        let mut entries = fetched.items;
        entries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));

        tracing::debug!(user_id = %user_id, count = entries.len(), "Timers loaded");
        Ok(Self {
            user_id,
            collection,
            entries,
            skipped: fetched.skipped,
        })
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Timer {}", id)))
    }
}

pub struct TimerViewModel {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    stopwatch: Stopwatch,
    description: String,
    recent_descriptions: BTreeSet<String>,
    state: Option<LoadedTimers>,
}

impl TimerViewModel {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            stopwatch: Stopwatch::new(),
            description: String::new(),
            recent_descriptions: BTreeSet::new(),
            state: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Saved sessions, newest first.
    pub fn timers(&self) -> &[TimerEntry] {
        self.state
            .as_ref()
            .map(|s| s.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn skipped_documents(&self) -> &[AppError] {
        self.state
            .as_ref()
            .map(|s| s.skipped.as_slice())
            .unwrap_or(&[])
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedTimers> {
        self.state.as_mut().ok_or(AppError::NotLoaded)
    }

    pub async fn load_for_user(&mut self) -> Result<()> {
        let identity = self.identity.current_user().await?;
        self.install(LoadedTimers::fetch(&self.store, identity.user_id).await?);
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let user_id = self.loaded_mut()?.user_id.clone();
        self.install(LoadedTimers::fetch(&self.store, user_id).await?);
        Ok(())
    }

    fn install(&mut self, loaded: LoadedTimers) {
        self.recent_descriptions
            .extend(loaded.entries.iter().map(|e| e.description.clone()));
        self.state = Some(loaded);
    }

    async fn reconcile(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = result {
            tracing::warn!(error = %err, "Timer write failed, reloading from backend");
            if let Err(reload_err) = self.refresh().await {
                tracing::warn!(error = %reload_err, "Reload after failed timer write failed");
            }
            return Err(err);
        }
        Ok(())
    }

    // ─── Stopwatch ──────────────────────────────────────────────────

    pub fn stopwatch_state(&self) -> StopwatchState {
        self.stopwatch.state()
    }

    pub fn elapsed(&self) -> Duration {
        self.stopwatch.elapsed()
    }

    /// Elapsed time as `MM:SS.cc`.
    pub fn formatted_elapsed(&self) -> String {
        format_elapsed(self.stopwatch.elapsed())
    }

    pub fn start(&mut self) {
        self.stopwatch.start();
    }

    pub fn pause(&mut self) {
        self.stopwatch.pause();
    }

    /// Discard the current run and its description.
    pub fn reset(&mut self) {
        self.stopwatch.reset();
        self.description.clear();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Previously used descriptions, deduplicated and sorted.
    pub fn recent_descriptions(&self) -> Vec<&str> {
        self.recent_descriptions.iter().map(String::as_str).collect()
    }

    // ─── Saved sessions ─────────────────────────────────────────────

    /// Save the current run and reset the stopwatch.
    ///
    /// Pauses first if still running. On a failed write the stopwatch keeps
    /// its run so the save can be retried.
    pub async fn save(&mut self) -> Result<TimerEntry> {
        self.stopwatch.pause();
        let lap = self.stopwatch.lap().ok_or(AppError::TimerNotStarted)?;

        let description = match self.description.trim() {
            "" => UNTITLED_DESCRIPTION.to_string(),
            text => text.to_string(),
        };

        let entry = TimerEntry {
            id: uuid::Uuid::new_v4().to_string(),
            start_time: lap.started_at,
            end_time: lap.stopped_at,
            elapsed_seconds: lap.elapsed.as_secs_f64(),
            saved_at: Utc::now(),
            description,
        };

        let loaded = self.loaded_mut()?;
        loaded.entries.insert(0, entry.clone());

        let result = loaded
            .collection
            .create_with_server_time(&entry.id, &entry, SAVED_AT_FIELD)
            .await;

        if result.is_err() {
            loaded.entries.retain(|e| e.id != entry.id);
        }
        self.reconcile(result).await?;

        self.recent_descriptions.insert(entry.description.clone());
        self.reset();
        tracing::info!(timer_id = %entry.id, elapsed = %entry.formatted_elapsed(), "Timer saved");
        Ok(entry)
    }

    pub async fn delete_timer(&mut self, id: &str) -> Result<()> {
        let loaded = self.loaded_mut()?;
        let index = loaded.position(id)?;
        loaded.entries.remove(index);

        let result = loaded.collection.delete(id).await;
        self.reconcile(result).await?;
        tracing::info!(timer_id = id, "Timer deleted");
        Ok(())
    }

    /// Change a saved session's description and duration.
    ///
    /// The end time moves to `start_time + elapsed`.
    pub async fn update_timer(
        &mut self,
        id: &str,
        description: &str,
        elapsed: Duration,
    ) -> Result<TimerEntry> {
        let loaded = self.loaded_mut()?;
        let index = loaded.position(id)?;

        let span = ChronoDuration::from_std(elapsed)
            .map_err(|e| AppError::Validation(format!("Duration out of range: {}", e)))?;
        let end_time = loaded.entries[index]
            .start_time
            .checked_add_signed(span)
            .ok_or_else(|| AppError::Validation("Duration out of range".to_string()))?;

        let entry = &mut loaded.entries[index];
        entry.description = match description.trim() {
            "" => UNTITLED_DESCRIPTION.to_string(),
            text => text.to_string(),
        };
        entry.elapsed_seconds = elapsed.as_secs_f64();
        entry.end_time = end_time;
        let updated = entry.clone();

        let result = async {
            let fields = patch([
                ("description", json!(updated.description)),
                ("elapsed_seconds", json!(updated.elapsed_seconds)),
                ("end_time", json!(updated.end_time)),
            ])?;
            loaded.collection.update(id, fields).await
        }
        .await;

        self.reconcile(result).await?;
        self.recent_descriptions.insert(updated.description.clone());
        Ok(updated)
    }

    /// Saved sessions whose description contains `text`, ignoring case.
    pub fn filtered_timers(&self, text: &str) -> Vec<&TimerEntry> {
        let needle = text.trim().to_lowercase();
        self.timers()
            .iter()
            .filter(|e| needle.is_empty() || e.description.to_lowercase().contains(&needle))
            .collect()
    }
}
