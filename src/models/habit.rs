// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Habit model and day-based completion tracking.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::models::not_blank;
use crate::time_utils::{local_day, weekday_index};

/// A recurring habit stored at `users/{uid}/habits/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub title: String,
    /// Active weekdays, Sunday = 0 through Saturday = 6
    #[serde(default)]
    pub interval: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    /// One timestamp per completed calendar day
    #[serde(default)]
    pub completed_dates: Vec<DateTime<Utc>>,
}

impl Habit {
    /// Build a new habit starting at `now` with no completions.
    pub fn new(input: NewHabit, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            interval: normalize_days(input.interval),
            description: input.description.filter(|d| !d.trim().is_empty()),
            start_date: input.start_date.unwrap_or(now),
            completed_dates: Vec::new(),
        }
    }

    /// Whether the habit is scheduled on `date`.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.interval.contains(&weekday_index(date))
    }

    /// Whether a completion falls on the same local calendar day as `date`.
    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.completed_dates.iter().any(|c| local_day(*c) == date)
    }

    /// Toggle completion for the calendar day containing `at`.
    ///
    /// Removes the existing completion on that day if there is one, otherwise
    /// records `at`. Returns whether the day is now completed.
    pub fn toggle_completion(&mut self, at: DateTime<Utc>) -> bool {
        let day = local_day(at);
        match self
            .completed_dates
            .iter()
            .position(|c| local_day(*c) == day)
        {
            Some(index) => {
                self.completed_dates.remove(index);
                false
            }
            None => {
                self.completed_dates.push(at);
                true
            }
        }
    }

    /// Apply an edit in place.
    pub fn apply(&mut self, edit: HabitEdit) {
        if let Some(title) = edit.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = edit.description {
            self.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(interval) = edit.interval {
            self.interval = normalize_days(interval);
        }
    }
}

fn normalize_days(mut days: Vec<u8>) -> Vec<u8> {
    days.sort_unstable();
    days.dedup();
    days
}

fn valid_weekdays(days: &[u8]) -> Result<(), ValidationError> {
    if days.iter().any(|d| *d > 6) {
        return Err(ValidationError::new("weekday_range")
            .with_message(Cow::from("Weekdays must be between 0 (Sunday) and 6")));
    }
    Ok(())
}

/// Input for creating a habit.
#[derive(Debug, Clone, Default, Validate)]
pub struct NewHabit {
    #[validate(custom(function = "not_blank", message = "Habit title must not be empty"))]
    pub title: String,
    #[validate(custom(function = "valid_weekdays"))]
    pub interval: Vec<u8>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Partial update of a habit; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Validate)]
pub struct HabitEdit {
    #[validate(custom(function = "not_blank", message = "Habit title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "valid_weekdays"))]
    pub interval: Option<Vec<u8>>,
}
