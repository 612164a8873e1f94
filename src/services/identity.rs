// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider contract shared by the Firebase and local adapters.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque subject ID, also the profile document ID
    pub user_id: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

/// Sign-in methods that can be linked to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    Password,
    Google,
    Apple,
}

impl ProviderKind {
    /// Provider ID string used by the identity backend.
    pub fn provider_id(self) -> &'static str {
        match self {
            ProviderKind::Password => "password",
            ProviderKind::Google => "google.com",
            ProviderKind::Apple => "apple.com",
        }
    }

    pub fn from_provider_id(id: &str) -> Option<Self> {
        match id {
            "password" => Some(ProviderKind::Password),
            "google.com" => Some(ProviderKind::Google),
            "apple.com" => Some(ProviderKind::Apple),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_id())
    }
}

/// Token obtained from a third-party sign-in flow.
#[derive(Clone)]
pub enum FederatedCredential {
    Google {
        id_token: String,
        access_token: Option<String>,
    },
    Apple {
        id_token: String,
        raw_nonce: String,
    },
}

impl FederatedCredential {
    pub fn provider(&self) -> ProviderKind {
        match self {
            FederatedCredential::Google { .. } => ProviderKind::Google,
            FederatedCredential::Apple { .. } => ProviderKind::Apple,
        }
    }

    pub fn id_token(&self) -> &str {
        match self {
            FederatedCredential::Google { id_token, .. }
            | FederatedCredential::Apple { id_token, .. } => id_token,
        }
    }
}

impl fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider", &self.provider())
            .finish_non_exhaustive()
    }
}

/// Email/password pair, checked before any provider call.
#[derive(Clone, Validate)]
pub struct Credentials {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Federated authentication backend.
///
/// Implementations hold the signed-in session themselves; callers never
/// cache identities beyond a single operation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `NotAuthenticated`.
    async fn current_user(&self) -> Result<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_in_with_federated_token(&self, credential: FederatedCredential)
        -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// Delete the signed-in account and end the session.
    async fn delete_account(&self) -> Result<()>;

    async fn send_password_reset(&self, email: &str) -> Result<()>;

    /// Providers linked to the signed-in account.
    async fn linked_providers(&self) -> Result<Vec<ProviderKind>>;

    async fn update_password(&self, new_password: &str) -> Result<()>;

    /// Send a verification mail; the address changes once it is confirmed.
    async fn update_email(&self, new_email: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_round_trip() {
        for kind in [ProviderKind::Password, ProviderKind::Google, ProviderKind::Apple] {
            assert_eq!(ProviderKind::from_provider_id(kind.provider_id()), Some(kind));
        }
        assert_eq!(ProviderKind::from_provider_id("github.com"), None);
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("a@example.com", "hunter22").validate().is_ok());
        assert!(Credentials::new("not-an-email", "hunter22").validate().is_err());
        assert!(Credentials::new("a@example.com", "123").validate().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new("a@example.com", "supersecret");
        assert!(!format!("{creds:?}").contains("supersecret"));

        let token = FederatedCredential::Apple {
            id_token: "tok-123".to_string(),
            raw_nonce: "nonce".to_string(),
        };
        assert!(!format!("{token:?}").contains("tok-123"));
    }
}
