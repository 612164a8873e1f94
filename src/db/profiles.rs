// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile documents and account-wide data removal.

use crate::db::{collections, Collection, CollectionPath, DocumentStore};
use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::services::identity::Identity;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Access to `users/{uid}` profile documents.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn DocumentStore>,
    profiles: Collection<UserProfile>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let profiles = Collection::new(store.clone(), CollectionPath::users());
        Self { store, profiles }
    }

    /// Get a profile by user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.profiles.get(user_id).await
    }

    /// Get a profile that must exist.
    pub async fn require_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn profile_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.store.get(&CollectionPath::users(), user_id).await?.is_some())
    }

    /// Write a new profile document.
    pub async fn create_profile(&self, profile: &UserProfile) -> Result<()> {
        self.profiles.upsert(&profile.user_id, profile).await?;
        tracing::info!(user_id = %profile.user_id, "User profile created");
        Ok(())
    }

    /// Return the profile for `identity`, creating it on first sign-in.
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<UserProfile> {
        if let Some(existing) = self.get_profile(&identity.user_id).await? {
            return Ok(existing);
        }

        let profile = UserProfile::new(
            identity.user_id.clone(),
            identity.email.clone(),
            identity.photo_url.clone(),
            chrono::Utc::now(),
        );
        self.create_profile(&profile).await?;
        Ok(profile)
    }

    /// Delete every document owned by a user, then the profile itself.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize> {
        let mut deleted_count = 0;

        for name in collections::USER_SCOPED {
            let path = CollectionPath::user_scoped(user_id, name);
            let ids: Vec<String> = self
                .store
                .list(&path)
                .await?
                .into_iter()
                .map(|doc| doc.id)
                .collect();
            let count = ids.len();

            let store = &self.store;
            let path_ref = &path;
            stream::iter(ids)
                .map(|id| async move { store.delete(path_ref, &id).await })
                .buffer_unordered(MAX_CONCURRENT_DB_OPS)
                .collect::<Vec<Result<()>>>()
                .await
                .into_iter()
                .collect::<Result<Vec<()>>>()?;

            deleted_count += count;
            tracing::debug!(user_id, collection = name, count, "Deleted user collection");
        }

        self.profiles.delete(user_id).await?;
        deleted_count += 1;
        tracing::debug!(user_id, "Deleted user profile");

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}
