// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process [`DocumentStore`] for tests and offline development.
//!
//! Documents are kept per collection path in ID order, matching how
//! Firestore returns a full collection read.

use crate::db::{CollectionPath, DocumentStore, Fields, RawDocument};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory document store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, BTreeMap<String, Fields>>>,
    offline: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    list_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make writes fail while reads keep working.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of full collection reads served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored in a collection.
    pub fn count(&self, path: &CollectionPath) -> usize {
        self.collections
            .get(&path.to_string())
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Store raw fields directly, bypassing typed encoding.
    pub fn insert_raw(&self, path: &CollectionPath, id: &str, fields: Fields) {
        self.collections
            .entry(path.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Backend(AppError::OFFLINE.to_string()));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check_online()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Backend("Write rejected by backend".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, path: &CollectionPath) -> Result<Vec<RawDocument>> {
        self.check_online()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .collections
            .get(&path.to_string())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| RawDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<RawDocument>> {
        self.check_online()?;

        Ok(self.collections.get(&path.to_string()).and_then(|docs| {
            docs.get(id).map(|fields| RawDocument::new(id, fields.clone()))
        }))
    }

    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()> {
        self.check_writable()?;
        self.insert_raw(path, id, fields);
        Ok(())
    }

    async fn create_with_server_time(
        &self,
        path: &CollectionPath,
        id: &str,
        mut fields: Fields,
        timestamp_field: &str,
    ) -> Result<()> {
        self.check_writable()?;
        fields.insert(
            timestamp_field.to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        self.insert_raw(path, id, fields);
        Ok(())
    }

    async fn update(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<()> {
        self.check_writable()?;

        let mut docs = self.collections.entry(path.to_string()).or_default();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", path, id)))?;

        for (key, value) in fields {
            if value.is_null() {
                doc.remove(&key);
            } else {
                doc.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        self.check_writable()?;

        if let Some(mut docs) = self.collections.get_mut(&path.to_string()) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_collections_are_user_scoped() {
        let store = MemoryStore::new();
        store
            .set(&CollectionPath::tasks("alice"), "t1", fields(json!({ "title": "A" })))
            .await
            .unwrap();

        assert_eq!(store.list(&CollectionPath::tasks("alice")).await.unwrap().len(), 1);
        assert!(store.list(&CollectionPath::tasks("bob")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_patches_and_clears_fields() {
        let store = MemoryStore::new();
        let path = CollectionPath::tasks("alice");
        store
            .set(&path, "t1", fields(json!({ "title": "A", "due_date": "2025-01-01T00:00:00Z" })))
            .await
            .unwrap();

        store
            .update(&path, "t1", fields(json!({ "due_date": null, "is_complete": true })))
            .await
            .unwrap();

        let doc = store.get(&path, "t1").await.unwrap().unwrap();
        assert_eq!(doc.fields.get("title"), Some(&json!("A")));
        assert_eq!(doc.fields.get("is_complete"), Some(&json!(true)));
        assert!(!doc.fields.contains_key("due_date"));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(&CollectionPath::tasks("alice"), "nope", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fail_writes_keeps_reads() {
        let store = MemoryStore::new();
        let path = CollectionPath::habits("alice");
        store.set_fail_writes(true);

        assert!(store.set(&path, "h1", Fields::new()).await.is_err());
        assert!(store.list(&path).await.is_ok());

        store.set_offline(true);
        assert!(store.list(&path).await.unwrap_err().is_retryable());
    }
}
