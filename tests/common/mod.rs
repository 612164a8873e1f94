// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use spark_tasks::db::{FirestoreDb, MemoryStore};
use spark_tasks::services::{IdentityProvider, LocalIdentity, NetworkMonitor};
use spark_tasks::Services;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// In-memory backends with handles kept for fault injection.
#[allow(dead_code)]
pub struct TestApp {
    pub store: MemoryStore,
    pub identity: Arc<LocalIdentity>,
    pub services: Services,
}

/// Create services backed by an in-memory store and local identity provider.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = MemoryStore::new();
    let identity = Arc::new(LocalIdentity::new());
    let services = Services::new(
        Arc::new(store.clone()),
        identity.clone(),
        NetworkMonitor::default(),
    );
    TestApp {
        store,
        identity,
        services,
    }
}

/// Create a test app with a signed-in password account, returning its user ID.
#[allow(dead_code)]
pub async fn signed_in_app() -> (TestApp, String) {
    let app = create_test_app();
    let user = app
        .identity
        .create_account("tester@example.com", "password123")
        .await
        .expect("Failed to create test account");
    (app, user.user_id)
}

/// Generate a unique user ID for emulator test isolation.
#[allow(dead_code)]
pub fn unique_user_id() -> String {
    format!("test-user-{}", uuid::Uuid::new_v4())
}
