// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed view over a single collection.

use crate::db::{CollectionPath, DocumentStore, Fields, RawDocument};
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// How [`Collection::list_all`] treats documents that fail to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Drop undecodable documents and report them in [`Fetched::skipped`].
    SkipInvalid,
    /// Fail the whole fetch on the first undecodable document.
    Strict,
}

/// Result of a full collection read.
#[derive(Debug)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    /// Decoding errors for documents that were dropped
    pub skipped: Vec<AppError>,
}

/// Typed access to one collection of a [`DocumentStore`].
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    path: CollectionPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, path: CollectionPath) -> Self {
        Self {
            store,
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Read and decode every document in the collection.
    pub async fn list_all(&self, policy: DecodePolicy) -> Result<Fetched<T>> {
        let docs = self.store.list(&self.path).await?;
        let mut items = Vec::with_capacity(docs.len());
        let mut skipped = Vec::new();

        for doc in docs {
            match decode_document::<T>(doc) {
                Ok(item) => items.push(item),
                Err(err) if policy == DecodePolicy::SkipInvalid => {
                    tracing::warn!(collection = %self.path, error = %err, "Skipping undecodable document");
                    skipped.push(err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Fetched { items, skipped })
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        self.store
            .get(&self.path, id)
            .await?
            .map(decode_document)
            .transpose()
    }

    /// Create or replace the document `id` with `value`.
    pub async fn upsert(&self, id: &str, value: &T) -> Result<()> {
        self.store.set(&self.path, id, encode_document(value)?).await
    }

    /// Create the document, letting the backend fill `timestamp_field`.
    pub async fn create_with_server_time(
        &self,
        id: &str,
        value: &T,
        timestamp_field: &str,
    ) -> Result<()> {
        let mut fields = encode_document(value)?;
        fields.remove(timestamp_field);
        self.store
            .create_with_server_time(&self.path, id, fields, timestamp_field)
            .await
    }

    /// Patch individual fields of the document `id`.
    pub async fn update(&self, id: &str, fields: Fields) -> Result<()> {
        self.store.update(&self.path, id, fields).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(&self.path, id).await
    }
}

/// Decode a raw document, filling a missing `id` field from the document ID.
pub fn decode_document<T: DeserializeOwned>(raw: RawDocument) -> Result<T> {
    let RawDocument {
        id,
        mut fields,
        unreadable,
    } = raw;
    if let Some(message) = unreadable {
        return Err(AppError::Decoding { id, message });
    }

    let has_id = matches!(fields.get("id"), Some(Value::String(s)) if !s.is_empty());
    if !has_id {
        fields.insert("id".to_string(), Value::String(id.clone()));
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| AppError::Decoding {
        id,
        message: e.to_string(),
    })
}

/// Encode a value into a flat field map.
pub fn encode_document<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(AppError::Internal(anyhow::anyhow!(
            "Document must encode to an object, got {}",
            other
        ))),
    }
}
