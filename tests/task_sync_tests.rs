// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task view-model behavior against the in-memory store.

mod common;

use chrono::{Local, TimeZone, Utc};
use serde_json::json;
use spark_tasks::db::{document_id_for_name, CollectionPath, DocumentStore};
use spark_tasks::error::AppError;
use spark_tasks::models::{NewTask, DEFAULT_SECTION};

fn fields(value: serde_json::Value) -> spark_tasks::db::Fields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_load_requires_sign_in() {
    let app = common::create_test_app();
    let mut tasks = app.services.task_view_model();

    let err = tasks.load_for_user().await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthenticated));
    assert!(!tasks.is_loaded());

    let err = tasks.add_task(NewTask::titled("Nope")).await.unwrap_err();
    assert!(matches!(err, AppError::NotLoaded));
    println!("✓ Unauthenticated load rejected");
}

#[tokio::test]
async fn test_load_partitions_and_skips_bad_documents() {
    let (app, uid) = common::signed_in_app().await;
    let path = CollectionPath::tasks(&uid);

    app.store.insert_raw(
        &path,
        "a",
        fields(json!({ "title": "Open", "is_complete": false, "section": "Work" })),
    );
    app.store.insert_raw(
        &path,
        "b",
        fields(json!({
            "title": "Done",
            "is_complete": true,
            "date_completed": "2025-01-06T10:00:00Z"
        })),
    );
    app.store
        .insert_raw(&path, "c", fields(json!({ "title": 42 })));

    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    assert_eq!(tasks.tasks().len(), 1);
    assert_eq!(tasks.tasks()[0].id, "a");
    assert_eq!(tasks.completed_tasks().len(), 1);
    assert_eq!(tasks.skipped_documents().len(), 1);
    assert_eq!(tasks.sections(), &[DEFAULT_SECTION.to_string(), "Work".to_string()]);
    println!("✓ Undecodable task skipped, others loaded");
}

#[tokio::test]
async fn test_other_users_tasks_are_invisible() {
    let (app, _uid) = common::signed_in_app().await;
    app.store.insert_raw(
        &CollectionPath::tasks("someone-else"),
        "x",
        fields(json!({ "title": "Secret", "is_complete": false })),
    );

    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();
    assert!(tasks.tasks().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Mutations
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_buy_milk_scenario() {
    let (app, uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    let due = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    tasks
        .add_task(NewTask {
            due_date: Some(due),
            ..NewTask::titled("Pay rent")
        })
        .await
        .unwrap();
    let milk = tasks.add_task(NewTask::titled("Buy milk")).await.unwrap();

    tasks.sort_tasks();
    assert_eq!(tasks.tasks().last().unwrap().title, "Buy milk");

    let done = tasks.toggle_complete(&milk.id).await.unwrap();
    assert!(done.is_complete);
    assert!(done.date_completed.is_some());
    assert!(tasks.completed_tasks().iter().any(|t| t.id == milk.id));
    assert!(!tasks.tasks().iter().any(|t| t.id == milk.id));

    let reopened = tasks.toggle_complete(&milk.id).await.unwrap();
    assert!(!reopened.is_complete);
    assert!(reopened.date_completed.is_none());
    assert!(tasks.tasks().iter().any(|t| t.id == milk.id));

    // Remote mirrors the local cache
    let stored = app
        .store
        .get(&CollectionPath::tasks(&uid), &milk.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.fields.get("is_complete"), Some(&json!(false)));
    assert!(!stored.fields.contains_key("date_completed"));
    println!("✓ Toggle complete round trip preserved task");
}

#[tokio::test]
async fn test_add_task_creates_section_document_once() {
    let (app, uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    tasks.add_task(NewTask::titled("One")).await.unwrap();
    tasks.add_task(NewTask::titled("Two")).await.unwrap();
    tasks
        .add_task(NewTask {
            section: Some("Home/Garden".to_string()),
            ..NewTask::titled("Weed")
        })
        .await
        .unwrap();

    assert_eq!(app.store.count(&CollectionPath::sections(&uid)), 2);
    assert_eq!(app.store.count(&CollectionPath::tasks(&uid)), 3);
    assert_eq!(tasks.sections()[0], DEFAULT_SECTION);
    assert_eq!(tasks.tasks_in_section("Home/Garden").len(), 1);

    // Sections survive a reload even with no tasks in them
    tasks.add_section("Someday").await.unwrap();
    tasks.refresh().await.unwrap();
    assert!(tasks.sections().iter().any(|s| s == "Someday"));
}

#[tokio::test]
async fn test_first_task_in_other_section_creates_inbox() {
    let (app, uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    tasks
        .add_task(NewTask {
            section: Some("Work".to_string()),
            ..NewTask::titled("Report")
        })
        .await
        .unwrap();

    let sections = CollectionPath::sections(&uid);
    assert_eq!(app.store.count(&sections), 2);
    for name in [DEFAULT_SECTION, "Work"] {
        let doc = app
            .store
            .get(&sections, &document_id_for_name(name))
            .await
            .unwrap();
        assert!(doc.is_some(), "missing section document {}", name);
    }
    println!("✓ Default section stored alongside the first named section");
}

#[tokio::test]
async fn test_blank_title_rejected_before_write() {
    let (app, uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    let err = tasks.add_task(NewTask::titled("   ")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(app.store.count(&CollectionPath::tasks(&uid)), 0);
}

#[tokio::test]
async fn test_delete_removes_from_one_list_only() {
    let (app, _uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    let keep = tasks.add_task(NewTask::titled("Keep")).await.unwrap();
    let gone = tasks.add_task(NewTask::titled("Gone")).await.unwrap();
    let done = tasks.add_task(NewTask::titled("Done")).await.unwrap();
    tasks.toggle_complete(&done.id).await.unwrap();

    tasks.delete_task(&gone.id).await.unwrap();
    assert_eq!(tasks.tasks().len(), 1);
    assert_eq!(tasks.tasks()[0].id, keep.id);
    assert_eq!(tasks.completed_tasks().len(), 1);

    tasks.delete_task(&done.id).await.unwrap();
    assert!(tasks.completed_tasks().is_empty());
    assert_eq!(tasks.tasks().len(), 1);

    assert!(matches!(
        tasks.delete_task(&gone.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_set_due_date_and_calendar_lookup() {
    let (app, uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    let task = tasks.add_task(NewTask::titled("Dentist")).await.unwrap();
    let due = Local
        .with_ymd_and_hms(2025, 4, 2, 15, 0, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc);

    tasks.set_due_date(&task.id, Some(due)).await.unwrap();
    let day = due.with_timezone(&Local).date_naive();
    assert_eq!(tasks.tasks_due_on(day).len(), 1);
    assert!(tasks.tasks_due_on(day.succ_opt().unwrap()).is_empty());

    tasks.set_due_date(&task.id, None).await.unwrap();
    assert!(tasks.tasks_due_on(day).is_empty());
    let stored = app
        .store
        .get(&CollectionPath::tasks(&uid), &task.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.fields.contains_key("due_date"));
}

// ═══════════════════════════════════════════════════════════════════════════
// Failure handling
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_failed_write_reloads_from_backend() {
    let (app, _uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();
    let existing = tasks.add_task(NewTask::titled("Existing")).await.unwrap();
    let reads_before = app.store.list_calls();

    app.store.set_fail_writes(true);
    let err = tasks.add_task(NewTask::titled("Lost")).await.unwrap_err();
    assert!(matches!(err, AppError::Backend(_)));

    // Optimistic insert rolled back by the reload
    assert!(app.store.list_calls() > reads_before);
    assert_eq!(tasks.tasks().len(), 1);
    assert_eq!(tasks.tasks()[0].id, existing.id);
    println!("✓ Failed write reconciled with backend");
}

#[tokio::test]
async fn test_successful_write_does_not_refetch() {
    let (app, _uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();
    let reads_before = app.store.list_calls();

    let task = tasks.add_task(NewTask::titled("Quick")).await.unwrap();
    tasks.toggle_complete(&task.id).await.unwrap();

    assert_eq!(app.store.list_calls(), reads_before);
}

#[tokio::test]
async fn test_offline_write_keeps_error() {
    let (app, _uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();
    let task = tasks.add_task(NewTask::titled("Stay")).await.unwrap();

    app.store.set_offline(true);
    let err = tasks.toggle_complete(&task.id).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.user_message().contains("offline"));

    // Reload failed too, so the toggle is undone locally
    assert_eq!(tasks.tasks().len(), 1);
    assert_eq!(tasks.tasks()[0].id, task.id);
    assert!(tasks.completed_tasks().is_empty());
}

#[tokio::test]
async fn test_offline_add_task_leaves_no_phantom_state() {
    let (app, uid) = common::signed_in_app().await;
    let mut tasks = app.services.task_view_model();
    tasks.load_for_user().await.unwrap();

    app.store.set_offline(true);
    let err = tasks.add_task(NewTask::titled("Never stored")).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(tasks.tasks().is_empty());

    app.store.set_offline(false);
    let kept = tasks.add_task(NewTask::titled("Stored")).await.unwrap();

    assert_eq!(app.store.count(&CollectionPath::sections(&uid)), 1);
    assert_eq!(app.store.count(&CollectionPath::tasks(&uid)), 1);
    assert_eq!(tasks.tasks().len(), 1);
    assert_eq!(tasks.tasks()[0].id, kept.id);
    println!("✓ Offline add rolled back and section written on retry");
}
