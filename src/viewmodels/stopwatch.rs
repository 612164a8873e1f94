// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stopwatch state machine driving the timer view.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Tick period for the elapsed-time display.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopwatchState {
    #[default]
    Idle,
    Running,
    Paused,
}

/// A finished run: wall-clock bounds plus measured elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lap {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Inner {
    state: StopwatchState,
    accumulated: Duration,
    /// Monotonic instant elapsed time was last folded in at, while running
    reference: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl Inner {
    fn advance(&mut self, now: Instant) {
        if let Some(reference) = self.reference {
            self.accumulated += now.saturating_duration_since(reference);
            self.reference = Some(now);
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        match self.reference {
            Some(reference) => self.accumulated + now.saturating_duration_since(reference),
            None => self.accumulated,
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Idle → running → paused stopwatch.
///
/// While running, a background tick folds elapsed time into the total every
/// [`TICK_INTERVAL`]. Must be started from within a Tokio runtime.
#[derive(Default)]
pub struct Stopwatch {
    inner: Arc<Mutex<Inner>>,
    ticker: Option<JoinHandle<()>>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StopwatchState {
        lock(&self.inner).state
    }

    pub fn elapsed(&self) -> Duration {
        lock(&self.inner).elapsed(Instant::now())
    }

    /// Start or resume. No-op while already running.
    pub fn start(&mut self) {
        {
            let mut inner = lock(&self.inner);
            if inner.state == StopwatchState::Running {
                return;
            }
            inner.state = StopwatchState::Running;
            inner.reference = Some(Instant::now());
            inner.started_at.get_or_insert_with(Utc::now);
            inner.stopped_at = None;
        }

        let inner = self.inner.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut guard = lock(&inner);
                if guard.state != StopwatchState::Running {
                    break;
                }
                guard.advance(Instant::now());
            }
        }));
    }

    /// Stop ticking and record the stop time. No-op unless running.
    pub fn pause(&mut self) {
        {
            let mut inner = lock(&self.inner);
            if inner.state != StopwatchState::Running {
                return;
            }
            inner.advance(Instant::now());
            inner.reference = None;
            inner.state = StopwatchState::Paused;
            inner.stopped_at = Some(Utc::now());
        }
        self.stop_ticker();
    }

    /// Back to idle with zero elapsed time.
    pub fn reset(&mut self) {
        self.stop_ticker();
        *lock(&self.inner) = Inner::default();
    }

    /// The recorded run, if both a start and a stop happened.
    pub fn lap(&self) -> Option<Lap> {
        let inner = lock(&self.inner);
        Some(Lap {
            started_at: inner.started_at?,
            stopped_at: inner.stopped_at?,
            elapsed: inner.accumulated,
        })
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
