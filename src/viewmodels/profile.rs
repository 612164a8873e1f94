// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account settings view-model.

use crate::db::ProfileStore;
use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::services::{IdentityProvider, ProviderKind};
use std::sync::Arc;
use validator::ValidateEmail;

const MIN_PASSWORD_LEN: usize = 6;

pub struct ProfileViewModel {
    identity: Arc<dyn IdentityProvider>,
    profiles: ProfileStore,
    user: Option<UserProfile>,
    providers: Vec<ProviderKind>,
}

impl ProfileViewModel {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: ProfileStore) -> Self {
        Self {
            identity,
            profiles,
            user: None,
            providers: Vec::new(),
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn providers(&self) -> &[ProviderKind] {
        &self.providers
    }

    /// Load the signed-in user's profile, creating it if it is missing.
    pub async fn load_current_user(&mut self) -> Result<&UserProfile> {
        let identity = self.identity.current_user().await?;
        let profile = self.profiles.ensure_profile(&identity).await?;
        Ok(&*self.user.insert(profile))
    }

    pub async fn load_auth_providers(&mut self) -> Result<&[ProviderKind]> {
        self.providers = self.identity.linked_providers().await?;
        Ok(self.providers.as_slice())
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        self.identity.sign_out().await?;
        self.user = None;
        self.providers.clear();
        Ok(())
    }

    /// Send a password reset mail to the signed-in user's address.
    pub async fn reset_password(&self) -> Result<()> {
        let email = self
            .identity
            .current_user()
            .await?
            .email
            .ok_or_else(|| AppError::Validation("This account has no email address".to_string()))?;
        self.identity.send_password_reset(&email).await
    }

    /// Request an email change; takes effect once the new address is verified.
    pub async fn update_email(&self, new_email: &str) -> Result<()> {
        let new_email = new_email.trim();
        if !new_email.validate_email() {
            return Err(AppError::Validation(
                "Enter a valid email address".to_string(),
            ));
        }
        self.identity.update_email(new_email).await
    }

    pub async fn update_password(&self, new_password: &str) -> Result<()> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        self.identity.update_password(new_password).await
    }

    /// Delete all of the user's data, then the account itself.
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_account(&mut self) -> Result<usize> {
        let identity = self.identity.current_user().await?;
        let deleted = self.profiles.delete_user_data(&identity.user_id).await?;
        self.identity.delete_account().await?;

        self.user = None;
        self.providers.clear();
        tracing::info!(user_id = %identity.user_id, deleted, "Account deleted");
        Ok(deleted)
    }
}
