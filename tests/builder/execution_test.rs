// tests/builder/execution_test.rs
#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{failed_dry_run, MockCubeApi};
use cubeq::builder::{BuilderError, ExecutionStatus, QueryBuilder, ValidationStatus};
use cubeq::config::BuilderSettings;

async fn validated(api: &std::sync::Arc<MockCubeApi>, settings: &BuilderSettings) -> QueryBuilder {
    let builder = QueryBuilder::with_settings(api.clone(), settings);
    builder.add_measure("Orders.count");
    assert_eq!(builder.validate_now().await, ValidationStatus::Valid);
    builder
}

#[tokio::test(start_paused = true)]
async fn test_execute_refused_before_validation() {
    let api = MockCubeApi::new().with_rows(10).into_arc();
    let builder = QueryBuilder::new(api.clone());
    builder.add_measure("Orders.count");

    let result = builder.execute().await;

    assert!(matches!(result, Err(BuilderError::NotReady(ValidationStatus::Idle))));
    assert_eq!(api.loads(), 0);
    assert_eq!(builder.state().execution_status, ExecutionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_execute_refused_for_invalid_query() {
    let api = MockCubeApi::new()
        .with_dry_run(|_| failed_dry_run("bad member"))
        .into_arc();
    let builder = QueryBuilder::new(api.clone());
    builder.add_measure("Orders.nope");
    assert_eq!(builder.validate_now().await, ValidationStatus::Invalid);

    let result = builder.execute().await;

    assert!(matches!(result, Err(BuilderError::NotReady(ValidationStatus::Invalid))));
    assert_eq!(api.loads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_execute_loads_page_and_total() {
    let api = MockCubeApi::new().with_rows(250).into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;

    builder.execute().await.unwrap();

    let state = builder.state();
    assert_eq!(state.execution_status, ExecutionStatus::Success);
    assert_eq!(state.execution_results.as_ref().unwrap().row_count(), 100);
    assert_eq!(state.total_row_count, Some(250));
    assert!(state.is_truncated());

    let mut limits = api.load_limits();
    limits.sort();
    assert_eq!(limits, vec![None, Some(100)]);
}

#[tokio::test(start_paused = true)]
async fn test_query_limit_below_display_limit_wins() {
    let api = MockCubeApi::new().with_rows(250).into_arc();
    let builder = QueryBuilder::new(api.clone());
    builder.update_query(|q| cubeq::CubeQuery {
        measures: vec!["Orders.count".to_string()],
        limit: Some(20),
        ..q.clone()
    });
    builder.validate_now().await;

    builder.execute().await.unwrap();

    let state = builder.state();
    assert_eq!(state.execution_results.as_ref().unwrap().row_count(), 20);
    assert_eq!(state.total_row_count, Some(250));
    assert!(state.is_truncated());

    let mut limits = api.load_limits();
    limits.sort();
    assert_eq!(limits, vec![None, Some(20)]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_count_discards_page_for_limited_query() {
    let api = MockCubeApi::new()
        .with_rows(250)
        .failing_unlimited_load()
        .into_arc();
    let builder = QueryBuilder::new(api.clone());
    builder.update_query(|q| cubeq::CubeQuery {
        measures: vec!["Orders.count".to_string()],
        limit: Some(20),
        ..q.clone()
    });
    builder.validate_now().await;

    builder.execute().await.unwrap();

    let state = builder.state();
    assert_eq!(api.loads(), 2);
    assert_eq!(state.execution_status, ExecutionStatus::Error);
    assert!(state.execution_results.is_none());
    assert!(state.total_row_count.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_count_discards_page() {
    let api = MockCubeApi::new()
        .with_rows(250)
        .failing_unlimited_load()
        .into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;

    builder.execute().await.unwrap();

    let state = builder.state();
    assert_eq!(state.execution_status, ExecutionStatus::Error);
    assert!(state.execution_results.is_none());
    assert!(state.total_row_count.is_none());
    assert_eq!(
        state.execution_error.as_deref(),
        Some("failed to run query: count query timed out")
    );
}

#[tokio::test(start_paused = true)]
async fn test_execute_while_loading_is_refused() {
    let api = MockCubeApi::new()
        .with_rows(5)
        .with_load_delay(Duration::from_secs(1))
        .into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;

    let running = tokio::spawn({
        let builder = builder.clone();
        async move { builder.execute().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(builder.state().execution_status, ExecutionStatus::Loading);
    assert!(!builder.can_execute());

    let second = builder.execute().await;
    assert!(matches!(second, Err(BuilderError::AlreadyRunning)));

    running.await.unwrap().unwrap();
    assert_eq!(builder.state().execution_status, ExecutionStatus::Success);
    assert_eq!(api.loads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_execution_discards_results() {
    let api = MockCubeApi::new()
        .with_rows(5)
        .with_load_delay(Duration::from_secs(1))
        .into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;

    let running = tokio::spawn({
        let builder = builder.clone();
        async move { builder.execute().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    builder.add_dimension("Orders.status");

    running.await.unwrap().unwrap();

    let state = builder.state();
    assert_eq!(state.execution_status, ExecutionStatus::Idle);
    assert!(state.execution_results.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_display_limit_change_reruns_successful_query() {
    let api = MockCubeApi::new().with_rows(250).into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;
    builder.execute().await.unwrap();
    assert_eq!(api.loads(), 2);

    builder.set_display_limit(10).await.unwrap();

    let state = builder.state();
    assert_eq!(api.loads(), 4);
    assert_eq!(state.display_limit, 10);
    assert_eq!(state.execution_results.as_ref().unwrap().row_count(), 10);
    assert_eq!(state.total_row_count, Some(250));
}

#[tokio::test(start_paused = true)]
async fn test_display_limit_change_without_results_does_not_run() {
    let api = MockCubeApi::new().with_rows(250).into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;

    builder.set_display_limit(10).await.unwrap();

    assert_eq!(api.loads(), 0);
    assert_eq!(builder.state().display_limit, 10);
}

#[tokio::test(start_paused = true)]
async fn test_query_change_resets_execution() {
    let api = MockCubeApi::new().with_rows(3).into_arc();
    let builder = validated(&api, &BuilderSettings::default()).await;
    builder.execute().await.unwrap();
    assert_eq!(builder.state().execution_status, ExecutionStatus::Success);

    builder.toggle_order("Orders.count");

    let state = builder.state();
    assert_eq!(state.validation_status, ValidationStatus::Idle);
    assert_eq!(state.execution_status, ExecutionStatus::Idle);
    assert!(state.execution_results.is_none());
    assert!(state.total_row_count.is_none());
}
