// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error type shared by every layer.
//!
//! View-models return these unchanged to the presentation boundary, which
//! renders them through [`AppError::user_message`].

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Account conflict: {0}")]
    AccountConflict(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Failed to decode document {id}: {message}")]
    Decoding { id: String, message: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Data not loaded for the current user")]
    NotLoaded,

    #[error("Timer has not been started")]
    TimerNotStarted,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker used by the backend layers when a call never reached the service.
    pub const OFFLINE: &'static str = "Backend unavailable (offline mode)";

    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Backend(_))
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotAuthenticated => "Please sign in again.".to_string(),
            AppError::InvalidCredential(_) => "The email or password is incorrect.".to_string(),
            AppError::AccountConflict(_) => {
                "An account already exists for this email address.".to_string()
            }
            AppError::Backend(msg) if msg == Self::OFFLINE => {
                "You appear to be offline. Try again when connected.".to_string()
            }
            AppError::Backend(_) => "Something went wrong. Please try again.".to_string(),
            AppError::Decoding { .. } => "Some saved items could not be read.".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(_) => "That item no longer exists.".to_string(),
            AppError::NotLoaded => "Still loading, please wait.".to_string(),
            AppError::TimerNotStarted => "Start the timer before saving.".to_string(),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error surfaced to user");
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err).context("JSON conversion failed"))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
