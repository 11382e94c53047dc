use promptwright::adapters::sqlite::{create_migrated_test_pool, SqlitePromptRepository};
use promptwright::domain::models::RunStatus;
use promptwright::domain::ports::{NewRun, PromptRepository};
use promptwright::domain::scoring::ScoreComponents;
use serde_json::json;

async fn setup_test_repo() -> SqlitePromptRepository {
    let pool = create_migrated_test_pool()
        .await
        .expect("failed to create test database");
    SqlitePromptRepository::new(pool)
}

fn completed_run(version: &str, improvement: f64) -> NewRun {
    NewRun {
        prompt_version: version.to_string(),
        status: RunStatus::Completed,
        alert_id: None,
        model: "test-model".to_string(),
        previous_version: None,
        new_version: Some(version.to_string()),
        improvement: Some(improvement),
        duration_seconds: Some(0.5),
        notes: Some("test run".to_string()),
        score_components: None,
        conversion_snapshot: None,
    }
}

#[tokio::test]
async fn test_sequential_creates_keep_exactly_one_active() {
    let repo = setup_test_repo().await;

    for i in 1..=5 {
        repo.create_prompt(&format!("v{i}"), &format!("content {i}"), None)
            .await
            .expect("failed to create prompt");
    }

    let prompts = repo.list_prompts(50).await.expect("failed to list prompts");
    assert_eq!(prompts.len(), 5);
    assert_eq!(prompts.iter().filter(|p| p.is_active).count(), 1);

    let active = repo
        .get_active_prompt()
        .await
        .expect("failed to get active prompt")
        .expect("no active prompt");
    assert_eq!(active.version, "v5");
    assert_eq!(prompts[0].version, "v5");
}

#[tokio::test]
async fn test_list_prompts_honors_limit_newest_first() {
    let repo = setup_test_repo().await;
    for i in 1..=4 {
        repo.create_prompt(&format!("v{i}"), "content", None)
            .await
            .unwrap();
    }

    let prompts = repo.list_prompts(2).await.unwrap();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].version, "v4");
    assert_eq!(prompts[1].version, "v3");
}

#[tokio::test]
async fn test_recent_runs_newest_first() {
    let repo = setup_test_repo().await;
    repo.create_prompt("v1", "content", None).await.unwrap();

    let first = repo.log_run(completed_run("v1", 0.1)).await.unwrap();
    let second = repo.log_run(completed_run("v1", 0.2)).await.unwrap();

    let runs = repo.recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, second.id);
    assert_eq!(runs[1].id, first.id);
    assert_eq!(runs[0].prompt_version, "v1");
}

#[tokio::test]
async fn test_metrics_average_and_latest_snapshot() {
    let repo = setup_test_repo().await;
    repo.create_prompt("v1", "content", None).await.unwrap();

    repo.log_run(NewRun {
        score_components: Some(ScoreComponents {
            base: 0.08,
            failure_mix: 0.05,
            total: 0.2,
            ..ScoreComponents::default()
        }),
        conversion_snapshot: Some(json!({"conversion_rate": 0.4})),
        ..completed_run("v1", 0.2)
    })
    .await
    .unwrap();
    repo.log_run(NewRun {
        score_components: Some(ScoreComponents {
            base: 0.08,
            failure_mix: 0.07,
            total: 0.4,
            ..ScoreComponents::default()
        }),
        conversion_snapshot: Some(json!({"conversion_rate": 0.5})),
        ..completed_run("v1", 0.4)
    })
    .await
    .unwrap();
    // A run with no improvement and no components contributes to totals
    // but not to the averages.
    repo.log_run(NewRun {
        improvement: None,
        status: RunStatus::Pending,
        ..completed_run("v1", 0.0)
    })
    .await
    .unwrap();

    let metrics = repo.metrics().await.unwrap();
    assert_eq!(metrics.total_runs, 3);
    assert!((metrics.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((metrics.average_improvement - 0.3).abs() < 1e-9);
    assert!((metrics.score_breakdown.base - 0.08).abs() < 1e-9);
    assert!((metrics.score_breakdown.failure_mix - 0.06).abs() < 1e-9);
    assert!((metrics.score_breakdown.total - 0.3).abs() < 1e-9);
    // Snapshot comes from the newest run even though it carries none.
    assert_eq!(metrics.latest_conversion_snapshot, None);
}

#[tokio::test]
async fn test_cascade_delete_removes_runs() {
    let pool = create_migrated_test_pool().await.unwrap();
    let repo = SqlitePromptRepository::new(pool.clone());
    repo.create_prompt("v1", "content", None).await.unwrap();
    repo.log_run(completed_run("v1", 0.1)).await.unwrap();

    sqlx::query("DELETE FROM prompts WHERE version = 'v1'")
        .execute(&pool)
        .await
        .unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM optimization_runs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
