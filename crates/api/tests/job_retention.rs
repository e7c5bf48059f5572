//! Tests for the background job retention task.

mod common;

use std::time::Duration;

use common::{placeholder_app, poll_until_done, submit};
use flux_api::background::job_retention;
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn finished_jobs_are_evicted_and_task_stops_on_cancel() {
    let app = placeholder_app().await;
    let id = submit(&app.router, json!({"prompt": "short-lived"})).await;
    poll_until_done(&app.router, &id).await;
    assert_eq!(app.jobs.job_count().await, 1);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(job_retention::run(
        app.jobs.clone(),
        0,
        Duration::from_millis(10),
        cancel.clone(),
    ));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while app.jobs.job_count().await > 0 {
        assert!(tokio::time::Instant::now() < deadline, "job was never evicted");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = common::get(&app.router, &format!("/status/{id}")).await;
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("retention task should stop after cancel")
        .unwrap();
}

#[tokio::test]
async fn unrepresentable_period_skips_the_sweep_without_panicking() {
    let app = placeholder_app().await;
    let id = submit(&app.router, json!({"prompt": "kept"})).await;
    poll_until_done(&app.router, &id).await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(job_retention::run(
        app.jobs.clone(),
        i64::MAX,
        Duration::from_millis(10),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "retention task exited early");
    assert_eq!(app.jobs.job_count().await, 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("retention task should stop after cancel")
        .unwrap();
}
