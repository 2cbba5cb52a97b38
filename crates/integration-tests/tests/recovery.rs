//! Crash recovery against an on-disk registry

use lexcompare_core::application::constants::INTERRUPTED_JOB_DETAILS;
use lexcompare_core::application::RecoveryService;
use lexcompare_core::domain::{DocumentRef, Job, JobState, Report};
use lexcompare_core::port::time_provider::SystemTimeProvider;
use lexcompare_core::port::{JobRepository, ResultStore};
use lexcompare_infra_fs::FsResultStore;
use lexcompare_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};
use std::sync::Arc;
use tempfile::TempDir;

fn job(id: &str) -> Job {
    Job::new(
        id,
        1_000,
        DocumentRef::new(format!("/data/{}_primary_p.pdf", id)),
        vec![DocumentRef::new(format!("/data/{}_cmp_c.pdf", id))],
    )
}

#[tokio::test]
async fn test_interrupted_jobs_survive_restart_as_failures() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("meta.db");
    let db_url = db_path.to_string_lossy().into_owned();

    // First daemon run: one job mid-comparison, one finished
    {
        let pool = create_pool(&db_url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = SqliteJobRepository::new(pool.clone());

        let mut running = job("running");
        running.begin_extraction(2_000).unwrap();
        running.begin_upload().unwrap();
        running.begin_comparison().unwrap();
        repo.insert(&running).await.unwrap();

        let mut finished = job("finished");
        finished.begin_extraction(2_000).unwrap();
        finished.begin_upload().unwrap();
        finished.begin_comparison().unwrap();
        finished.complete(3_000).unwrap();
        repo.insert(&finished).await.unwrap();

        pool.close().await;
    }

    // Restart
    let pool = create_pool(&db_url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let repo = Arc::new(SqliteJobRepository::new(pool));
    let results = Arc::new(FsResultStore::new(dir.path()));
    let recovery = RecoveryService::new(
        repo.clone(),
        results.clone(),
        Arc::new(SystemTimeProvider),
    );

    let recovered = recovery.recover_interrupted_jobs().await.unwrap();
    assert_eq!(recovered, 1);

    let running = repo.find_by_id(&"running".to_string()).await.unwrap().unwrap();
    assert_eq!(running.state, JobState::CriticalFailure);
    assert_eq!(running.error.as_deref(), Some(INTERRUPTED_JOB_DETAILS));
    assert!(running.finished_at.is_some());

    match results.read(&"running".to_string()).await.unwrap() {
        Some(Report::Failed(failure)) => {
            assert_eq!(failure.error_details, INTERRUPTED_JOB_DETAILS)
        }
        other => panic!("expected failure report, got {:?}", other),
    }

    let finished = repo.find_by_id(&"finished".to_string()).await.unwrap().unwrap();
    assert_eq!(finished.state, JobState::Done);
    assert!(results.read(&"finished".to_string()).await.unwrap().is_none());

    // A second pass finds nothing left to recover
    assert_eq!(recovery.recover_interrupted_jobs().await.unwrap(), 0);
}
