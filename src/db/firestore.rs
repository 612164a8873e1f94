// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore implementation of [`DocumentStore`].
//!
//! Per-user collections live under the profile document, so every call
//! resolves a parent path (`users/{uid}`) before touching the collection.

use crate::db::{collections, CollectionPath, DocumentStore, Fields, RawDocument};
use crate::error::AppError;
use async_trait::async_trait;
use gcloud_sdk::google::firestore::v1::Document;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Backend(AppError::OFFLINE.to_string()))
    }

    /// Resolve the parent document path for a collection.
    fn parent_for(
        client: &firestore::FirestoreDb,
        path: &CollectionPath,
    ) -> Result<String, AppError> {
        match path.user_id() {
            Some(uid) => client
                .parent_path(collections::USERS, uid)
                .map(|p| p.to_string())
                .map_err(db_err),
            None => Ok(client.get_documents_path().clone()),
        }
    }
}

fn db_err(e: firestore::errors::FirestoreError) -> AppError {
    AppError::Backend(e.to_string())
}

/// Convert a Firestore document into its ID and flat field map.
fn to_raw(doc: &Document) -> Result<RawDocument, AppError> {
    let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
    let fields = firestore::FirestoreDb::deserialize_doc_to::<Fields>(doc).map_err(|e| {
        AppError::Decoding {
            id: id.clone(),
            message: e.to_string(),
        }
    })?;
    Ok(RawDocument::new(id, fields))
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn list(&self, path: &CollectionPath) -> Result<Vec<RawDocument>, AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_for(client, path)?;

        let docs: Vec<Document> = client
            .fluent()
            .select()
            .from(path.name())
            .parent(parent.as_str())
            .query()
            .await
            .map_err(db_err)?;

        tracing::debug!(collection = %path, count = docs.len(), "Listed collection");

        // Undecodable documents surface as per-document errors in the typed layer
        let mut out = Vec::with_capacity(docs.len());
        for doc in &docs {
            match to_raw(doc) {
                Ok(raw) => out.push(raw),
                Err(AppError::Decoding { id, message }) => {
                    tracing::warn!(collection = %path, doc_id = %id, error = %message, "Unreadable Firestore document");
                    out.push(RawDocument::unreadable(id, message));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> Result<Option<RawDocument>, AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_for(client, path)?;

        let doc: Option<Document> = client
            .fluent()
            .select()
            .by_id_in(path.name())
            .parent(parent.as_str())
            .one(id)
            .await
            .map_err(db_err)?;

        doc.as_ref().map(to_raw).transpose()
    }

    async fn set(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_for(client, path)?;

        let _: () = client
            .fluent()
            .update()
            .in_col(path.name())
            .document_id(id)
            .parent(parent.as_str())
            .object(&fields)
            .execute()
            .await
            .map_err(db_err)?;

        tracing::debug!(collection = %path, doc_id = id, "Document written");
        Ok(())
    }

    async fn create_with_server_time(
        &self,
        path: &CollectionPath,
        id: &str,
        fields: Fields,
        timestamp_field: &str,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_for(client, path)?;

        let _: () = client
            .fluent()
            .update()
            .in_col(path.name())
            .document_id(id)
            .parent(parent.as_str())
            .object(&fields)
            .transforms(|t| {
                t.fields([t
                    .field(timestamp_field)
                    .server_value(firestore::FirestoreTransformServerValue::RequestTime)])
            })
            .execute()
            .await
            .map_err(db_err)?;

        tracing::debug!(collection = %path, doc_id = id, "Document created with server timestamp");
        Ok(())
    }

    async fn update(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_for(client, path)?;
        let mask: Vec<String> = fields.keys().cloned().collect();

        let _: () = client
            .fluent()
            .update()
            .fields(mask)
            .in_col(path.name())
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .parent(parent.as_str())
            .object(&fields)
            .execute()
            .await
            .map_err(db_err)?;

        tracing::debug!(collection = %path, doc_id = id, "Document patched");
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_for(client, path)?;

        client
            .fluent()
            .delete()
            .from(path.name())
            .document_id(id)
            .parent(parent.as_str())
            .execute()
            .await
            .map_err(db_err)?;

        tracing::debug!(collection = %path, doc_id = id, "Document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client_reports_offline() {
        let db = FirestoreDb::new_mock();
        let err = db.list(&CollectionPath::tasks("u1")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("offline"));
    }
}
