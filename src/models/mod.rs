// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod habit;
pub mod task;
pub mod timer;
pub mod user;

pub use habit::{Habit, HabitEdit, NewHabit};
pub use task::{NewTask, Section, Task, DEFAULT_SECTION};
pub use timer::TimerEntry;
pub use user::UserProfile;

use std::borrow::Cow;
use validator::ValidationError;

/// Reject strings that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::from("must not be empty")));
    }
    Ok(())
}
