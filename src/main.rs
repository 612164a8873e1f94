// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spark agenda
//!
//! Signs in with `SPARK_EMAIL` / `SPARK_PASSWORD` and logs today's open
//! tasks and scheduled habits.

use chrono::{Local, Utc};
use spark_tasks::{config::Config, Services};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(project = %config.gcp_project_id, "Starting Spark agenda");

    let services = Services::connect(&config)
        .await
        .expect("Failed to initialize backend services");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let reachability = services.network.spawn_reachability_check(
        http,
        config.reachability_url.clone(),
        config.reachability_interval,
    );

    let email = std::env::var("SPARK_EMAIL").map_err(|_| "SPARK_EMAIL is not set")?;
    let password = std::env::var("SPARK_PASSWORD").map_err(|_| "SPARK_PASSWORD is not set")?;

    let profile = match services
        .auth_view_model()
        .sign_in_email(&email, &password)
        .await
    {
        Ok(profile) => profile,
        Err(err) => {
            tracing::error!(error = %err, "Sign-in failed");
            return Err(err.user_message().into());
        }
    };
    tracing::info!(user_id = %profile.user_id, "Signed in");

    let today = Local::now().date_naive();

    let mut tasks = services.task_view_model();
    tasks.load_for_user().await?;
    tasks.sort_tasks();
    for skipped in tasks.skipped_documents() {
        tracing::warn!(error = %skipped, "Task could not be read");
    }
    for task in tasks.tasks() {
        let overdue = task.due_date.is_some_and(|due| due < Utc::now());
        tracing::info!(
            title = %task.title,
            section = task.section_name(),
            due = ?task.due_date,
            overdue,
            "Open task"
        );
    }
    tracing::info!(
        due_today = tasks.tasks_due_on(today).len(),
        open = tasks.tasks().len(),
        "Task summary"
    );

    let mut habits = services.habit_view_model();
    habits.load_for_user().await?;
    for habit in habits.habits_due_on(today) {
        tracing::info!(
            title = %habit.title,
            done = habit.is_completed_on(today),
            "Habit due today"
        );
    }

    reachability.abort();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spark_tasks=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
