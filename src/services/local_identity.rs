// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process identity provider for tests and offline development.

use crate::error::{AppError, Result};
use crate::services::identity::{FederatedCredential, Identity, IdentityProvider, ProviderKind};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct LocalAccount {
    identity: Identity,
    password: Option<String>,
    providers: Vec<ProviderKind>,
    /// Address waiting for verification after `update_email`
    pending_email: Option<String>,
}

/// Identity provider that keeps accounts in memory.
///
/// Federated tokens are trusted as-is: the token string itself becomes the
/// stable subject for that provider.
#[derive(Default)]
pub struct LocalIdentity {
    accounts: DashMap<String, LocalAccount>,
    current: RwLock<Option<String>>,
    password_resets: DashMap<String, u32>,
    offline: AtomicBool,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of password reset mails sent to `email`.
    pub fn password_resets_sent(&self, email: &str) -> u32 {
        self.password_resets.get(email).map(|n| *n).unwrap_or(0)
    }

    /// Email address awaiting verification for a user, if any.
    pub fn pending_email(&self, user_id: &str) -> Option<String> {
        self.accounts
            .get(user_id)
            .and_then(|a| a.pending_email.clone())
    }

    pub fn account_exists(&self, user_id: &str) -> bool {
        self.accounts.contains_key(user_id)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Backend(AppError::OFFLINE.to_string()));
        }
        Ok(())
    }

    fn find_by_email(&self, email: &str) -> Option<LocalAccount> {
        self.accounts
            .iter()
            .find(|entry| entry.identity.email.as_deref() == Some(email))
            .map(|entry| entry.value().clone())
    }

    async fn current_id(&self) -> Result<String> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(AppError::NotAuthenticated)
    }

    async fn activate(&self, identity: Identity) -> Identity {
        *self.current.write().await = Some(identity.user_id.clone());
        identity
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn current_user(&self) -> Result<Identity> {
        let user_id = self.current_id().await?;
        self.accounts
            .get(&user_id)
            .map(|a| a.identity.clone())
            .ok_or(AppError::NotAuthenticated)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        self.check_online()?;
        let account = self
            .find_by_email(email)
            .filter(|a| a.password.as_deref() == Some(password))
            .ok_or_else(|| AppError::InvalidCredential("INVALID_LOGIN_CREDENTIALS".to_string()))?;

        Ok(self.activate(account.identity).await)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity> {
        self.check_online()?;
        if self.find_by_email(email).is_some() {
            return Err(AppError::AccountConflict("EMAIL_EXISTS".to_string()));
        }

        let identity = Identity {
            user_id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            photo_url: None,
        };
        self.accounts.insert(
            identity.user_id.clone(),
            LocalAccount {
                identity: identity.clone(),
                password: Some(password.to_string()),
                providers: vec![ProviderKind::Password],
                pending_email: None,
            },
        );

        tracing::info!(user_id = %identity.user_id, "Local account created");
        Ok(self.activate(identity).await)
    }

    async fn sign_in_with_federated_token(
        &self,
        credential: FederatedCredential,
    ) -> Result<Identity> {
        self.check_online()?;
        if credential.id_token().is_empty() {
            return Err(AppError::InvalidCredential("INVALID_IDP_RESPONSE".to_string()));
        }

        let provider = credential.provider();
        let user_id = format!("{}:{}", provider.provider_id(), credential.id_token());

        let identity = self
            .accounts
            .entry(user_id.clone())
            .or_insert_with(|| LocalAccount {
                identity: Identity {
                    user_id,
                    email: None,
                    photo_url: None,
                },
                password: None,
                providers: vec![provider],
                pending_email: None,
            })
            .identity
            .clone();

        Ok(self.activate(identity).await)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.current.write().await = None;
        Ok(())
    }

    async fn delete_account(&self) -> Result<()> {
        self.check_online()?;
        let user_id = self.current_id().await?;
        self.accounts.remove(&user_id);
        *self.current.write().await = None;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.check_online()?;
        if self.find_by_email(email).is_none() {
            return Err(AppError::InvalidCredential("EMAIL_NOT_FOUND".to_string()));
        }
        *self.password_resets.entry(email.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn linked_providers(&self) -> Result<Vec<ProviderKind>> {
        self.check_online()?;
        let user_id = self.current_id().await?;
        self.accounts
            .get(&user_id)
            .map(|a| a.providers.clone())
            .ok_or(AppError::NotAuthenticated)
    }

    async fn update_password(&self, new_password: &str) -> Result<()> {
        self.check_online()?;
        let user_id = self.current_id().await?;
        let mut account = self
            .accounts
            .get_mut(&user_id)
            .ok_or(AppError::NotAuthenticated)?;

        account.password = Some(new_password.to_string());
        if !account.providers.contains(&ProviderKind::Password) {
            account.providers.push(ProviderKind::Password);
        }
        Ok(())
    }

    async fn update_email(&self, new_email: &str) -> Result<()> {
        self.check_online()?;
        if self.find_by_email(new_email).is_some() {
            return Err(AppError::AccountConflict("EMAIL_EXISTS".to_string()));
        }
        let user_id = self.current_id().await?;
        let mut account = self
            .accounts
            .get_mut(&user_id)
            .ok_or(AppError::NotAuthenticated)?;
        account.pending_email = Some(new_email.to_string());
        Ok(())
    }
}
