// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Spark Tasks: data-sync layer for a task, habit and stopwatch tracker
//!
//! This crate keeps per-user tasks, habits and timer sessions in a Firestore
//! document store behind Firebase Authentication, and exposes them through
//! one view-model per feature.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
pub mod viewmodels;

use config::Config;
use db::{DocumentStore, FirestoreDb, MemoryStore, ProfileStore};
use services::{FirebaseIdentity, IdentityProvider, LocalIdentity, NetworkMonitor};
use std::sync::Arc;
use viewmodels::{AuthViewModel, HabitViewModel, ProfileViewModel, TaskViewModel, TimerViewModel};

/// Shared services handed to every view-model.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub network: NetworkMonitor,
}

impl Services {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        network: NetworkMonitor,
    ) -> Self {
        Self {
            store,
            identity,
            network,
        }
    }

    /// Connect to Firestore and Firebase Authentication.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let db = FirestoreDb::new(&config.gcp_project_id).await?;
        let identity = FirebaseIdentity::new(config)?;
        Ok(Self::new(
            Arc::new(db),
            Arc::new(identity),
            NetworkMonitor::default(),
        ))
    }

    /// In-process store and identity provider.
    pub fn local() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LocalIdentity::new()),
            NetworkMonitor::default(),
        )
    }

    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(self.store.clone())
    }

    pub fn auth_view_model(&self) -> AuthViewModel {
        AuthViewModel::new(self.identity.clone(), self.profiles())
    }

    pub fn profile_view_model(&self) -> ProfileViewModel {
        ProfileViewModel::new(self.identity.clone(), self.profiles())
    }

    pub fn task_view_model(&self) -> TaskViewModel {
        TaskViewModel::new(self.store.clone(), self.identity.clone())
    }

    pub fn habit_view_model(&self) -> HabitViewModel {
        HabitViewModel::new(self.store.clone(), self.identity.clone())
    }

    pub fn timer_view_model(&self) -> TimerViewModel {
        TimerViewModel::new(self.store.clone(), self.identity.clone())
    }
}
