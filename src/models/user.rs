//! User profile model for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored at `users/{user_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity provider subject ID (also used as document ID)
    pub user_id: String,
    /// When the profile was first created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    /// Email address (absent for some federated sign-ins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Profile picture URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    pub fn new(
        user_id: impl Into<String>,
        email: Option<String>,
        photo_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            date_created: Some(now),
            email,
            photo_url,
        }
    }
}
