// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use spark_tasks::error::AppError;
use spark_tasks::models::{NewHabit, NewTask};
use validator::Validate;

#[test]
fn test_is_retryable_matches_backend_only() {
    assert!(AppError::Backend("timeout".to_string()).is_retryable());
    assert!(AppError::Backend(AppError::OFFLINE.to_string()).is_retryable());

    assert!(!AppError::NotAuthenticated.is_retryable());
    assert!(!AppError::Validation("bad".to_string()).is_retryable());
    assert!(!AppError::Decoding {
        id: "t1".to_string(),
        message: "missing field".to_string(),
    }
    .is_retryable());
}

#[test]
fn test_user_message_distinguishes_offline() {
    let offline = AppError::Backend(AppError::OFFLINE.to_string());
    let other = AppError::Backend("HTTP 500".to_string());
    assert_ne!(offline.user_message(), other.user_message());
    assert!(!other.user_message().contains("500"));
}

#[test]
fn test_validation_errors_convert_with_messages() {
    let err: AppError = NewTask::titled("").validate().unwrap_err().into();
    match err {
        AppError::Validation(msg) => assert_eq!(msg, "Task title must not be empty"),
        other => panic!("unexpected error: {other:?}"),
    }

    let err: AppError = NewHabit {
        title: " ".to_string(),
        interval: vec![8],
        ..Default::default()
    }
    .validate()
    .unwrap_err()
    .into();
    match err {
        AppError::Validation(msg) => {
            assert!(msg.contains("Habit title must not be empty"));
            assert!(msg.contains("Weekdays must be between"));
            // Validation text is shown as-is
            assert_eq!(AppError::Validation(msg.clone()).user_message(), msg);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_internal_error_hides_details() {
    let err = AppError::from(anyhow::anyhow!("secret stack detail"));
    assert!(!err.user_message().contains("secret"));
    assert!(err.to_string().contains("secret stack detail"));
}
