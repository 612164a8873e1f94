// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View-models: one stateful controller per feature.
//!
//! Every mutation is applied to the local cache first. A successful remote
//! write is not followed by a re-fetch; a failed one triggers a single
//! reload of the affected collection and the write error is returned.

pub mod habits;
pub mod profile;
pub mod session;
pub mod stopwatch;
pub mod tasks;
pub mod timers;

pub use habits::HabitViewModel;
pub use profile::ProfileViewModel;
pub use session::AuthViewModel;
pub use stopwatch::{Stopwatch, StopwatchState};
pub use tasks::{sort_by_due_date, TaskViewModel};
pub use timers::TimerViewModel;

use crate::db::Fields;
use crate::error::Result;
use serde::Serialize;

/// Build a patch from `(field, value)` pairs. `None` values become `null`.
pub(crate) fn patch<I, V>(pairs: I) -> Result<Fields>
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Serialize,
{
    let mut fields = Fields::new();
    for (key, value) in pairs {
        fields.insert(key.to_string(), serde_json::to_value(value)?);
    }
    Ok(fields)
}
