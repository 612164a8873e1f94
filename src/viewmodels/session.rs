// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in and sign-up flows.

use crate::db::ProfileStore;
use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::services::{Credentials, FederatedCredential, Identity, IdentityProvider};
use std::sync::Arc;
use validator::Validate;

/// Drives the sign-in screen. Every successful sign-in guarantees the user's
/// profile document exists.
pub struct AuthViewModel {
    identity: Arc<dyn IdentityProvider>,
    profiles: ProfileStore,
}

impl AuthViewModel {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: ProfileStore) -> Self {
        Self { identity, profiles }
    }

    /// Profile for an existing session, if the provider still has one.
    pub async fn restore_session(&self) -> Result<Option<UserProfile>> {
        match self.identity.current_user().await {
            Ok(identity) => Ok(Some(self.profiles.ensure_profile(&identity).await?)),
            Err(AppError::NotAuthenticated) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn sign_in_email(&self, email: &str, password: &str) -> Result<UserProfile> {
        let credentials = Credentials::new(email, password);
        credentials.validate()?;

        let identity = self
            .identity
            .sign_in(&credentials.email, &credentials.password)
            .await?;
        self.finish(identity).await
    }

    pub async fn sign_up_email(&self, email: &str, password: &str) -> Result<UserProfile> {
        let credentials = Credentials::new(email, password);
        credentials.validate()?;

        let identity = self
            .identity
            .create_account(&credentials.email, &credentials.password)
            .await?;
        self.finish(identity).await
    }

    pub async fn sign_in_google(
        &self,
        id_token: &str,
        access_token: Option<&str>,
    ) -> Result<UserProfile> {
        self.sign_in_federated(FederatedCredential::Google {
            id_token: id_token.to_string(),
            access_token: access_token.map(str::to_string),
        })
        .await
    }

    /// `raw_nonce` is the unhashed nonce sent with the Apple request.
    pub async fn sign_in_apple(&self, id_token: &str, raw_nonce: &str) -> Result<UserProfile> {
        self.sign_in_federated(FederatedCredential::Apple {
            id_token: id_token.to_string(),
            raw_nonce: raw_nonce.to_string(),
        })
        .await
    }

    async fn sign_in_federated(&self, credential: FederatedCredential) -> Result<UserProfile> {
        if credential.id_token().trim().is_empty() {
            return Err(AppError::InvalidCredential(format!(
                "missing {} token",
                credential.provider()
            )));
        }
        let identity = self.identity.sign_in_with_federated_token(credential).await?;
        self.finish(identity).await
    }

    async fn finish(&self, identity: Identity) -> Result<UserProfile> {
        let profile = self.profiles.ensure_profile(&identity).await?;
        tracing::info!(user_id = %profile.user_id, "Session started");
        Ok(profile)
    }
}
