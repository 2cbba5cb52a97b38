//! End-to-end pipeline scenarios
//!
//! Real filesystem adapters, in-memory registry, scripted generation service.

mod common;

use common::{about_article, against, extracting, extraction_answer, Pipeline};
use lexcompare_core::application::JobProgress;
use lexcompare_core::domain::report::FailureStatus;
use lexcompare_core::domain::{CellStatus, JobState, Report, TEXT_UNAVAILABLE};
use lexcompare_core::error::AppError;
use lexcompare_core::port::generation_service::mocks::ScriptedGenerationService;
use lexcompare_core::port::{JobRepository, ProviderError};
use serde_json::json;
use std::time::Duration;

async fn state_of(pipeline: &Pipeline, job_id: &String) -> JobState {
    pipeline.jobs.find_by_id(job_id).await.unwrap().unwrap().state
}

/// Primary with 2 articles, 1 comparison document; article 1 matches Art.3, article 2 matches nothing
#[tokio::test]
async fn test_end_to_end_scenario() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        if about_article(req, "1") {
            return Ok(r#"[{"id":"Art.3","title":"X","reason":"same purpose"}]"#.to_string());
        }
        Ok("[]".to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("egypt.pdf", &["tunisia.pdf"]).await;

    assert_eq!(state_of(&pipeline, &job_id).await, JobState::Done);

    let report = pipeline.report(&job_id).await;
    let rows = report.rows();
    assert_eq!(rows.len(), 2);

    let first = &rows[0].country_comparisons;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].country_name, "tunisia");
    assert_eq!(first[0].status, CellStatus::Completed);
    assert_eq!(first[0].similar_articles.len(), 1);
    let matched = &first[0].similar_articles[0];
    assert_eq!(matched.matched_article_identifier, "Art.3");
    assert_eq!(matched.matched_article_title.as_deref(), Some("X"));
    assert_eq!(matched.reason_for_similarity, "same purpose");
    assert_eq!(
        matched.matched_article_full_text,
        "The family is the basis of society."
    );

    // Empty match is a legitimate completed result
    let second = &rows[1].country_comparisons;
    assert_eq!(second[0].status, CellStatus::Completed);
    assert!(second[0].similar_articles.is_empty());

    // Extraction artifacts sit beside the staged sources
    assert!(pipeline.data.join(format!("{}_primary_egypt.json", job_id)).exists());
    assert!(pipeline.data.join(format!("{}_cmp1_tunisia.json", job_id)).exists());
    assert!(pipeline.data.join(format!("results_{}.json", job_id)).exists());
}

#[tokio::test]
async fn test_unknown_identifier_gets_sentinel_text() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok(r#"[{"id":"Art.99","title":null,"reason":"similar scope"}]"#.to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c.pdf"]).await;

    let report = pipeline.report(&job_id).await;
    let cell = &report.rows()[0].country_comparisons[0];
    assert_eq!(cell.similar_articles[0].matched_article_full_text, TEXT_UNAVAILABLE);
}

/// Comparison document #2's upload fails; #1 and #3 are unaffected
#[tokio::test]
async fn test_document_upload_failure_is_isolated() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok("[]".to_string())
    });
    generation.fail_register(
        "job0001_cmp2_c2.json",
        ProviderError::Transient("503 Service Unavailable".into()),
    );
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c1.pdf", "c2.pdf", "c3.pdf"]).await;

    assert_eq!(job_id, "job0001");
    assert_eq!(state_of(&pipeline, &job_id).await, JobState::Done);

    let report = pipeline.report(&job_id).await;
    for row in report.rows() {
        let statuses: Vec<CellStatus> = row.country_comparisons.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![CellStatus::Completed, CellStatus::Failed, CellStatus::Completed]
        );
        let failed = &row.country_comparisons[1];
        assert!(!failed.error.clone().unwrap_or_default().is_empty());
    }

    // No comparison call was ever made against the excluded document
    assert!(!pipeline
        .generation
        .requests()
        .iter()
        .any(|r| against(r, "c2")));
}

/// Transient on all 3 attempts: failed cell, backoff of 5s then 10s
#[tokio::test]
async fn test_retry_exhaustion() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        if about_article(req, "1") {
            return Err(ProviderError::Transient("503 Service Unavailable".into()));
        }
        Ok("[]".to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c.pdf"]).await;

    let report = pipeline.report(&job_id).await;
    let cell = &report.rows()[0].country_comparisons[0];
    assert_eq!(cell.status, CellStatus::Failed);
    assert!(cell
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("Max retries reached"));
    assert_eq!(report.rows()[1].country_comparisons[0].status, CellStatus::Completed);

    assert_eq!(
        pipeline.sleeper.delays(),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
    // 3 attempts for article 1, one for article 2
    assert_eq!(pipeline.comparison_calls(), 4);
}

#[tokio::test]
async fn test_fatal_error_is_not_retried() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Err(ProviderError::Fatal("400 Bad Request".into()))
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c.pdf"]).await;

    let report = pipeline.report(&job_id).await;
    for row in report.rows() {
        assert_eq!(row.country_comparisons[0].status, CellStatus::Failed);
    }
    assert_eq!(pipeline.comparison_calls(), 2);
    assert!(pipeline.sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_malformed_output_fails_cell() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok("I could not find any similar articles, sorry.".to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c.pdf"]).await;

    assert_eq!(state_of(&pipeline, &job_id).await, JobState::Done);
    let report = pipeline.report(&job_id).await;
    for row in report.rows() {
        let cell = &row.country_comparisons[0];
        assert_eq!(cell.status, CellStatus::Failed);
        assert!(cell.error.as_deref().unwrap_or_default().contains("ParseError"));
    }
    // Parse failures are not retried
    assert_eq!(pipeline.comparison_calls(), 2);
}

/// P rows of C cells on every write; cells only ever move pending -> settled
#[tokio::test]
async fn test_cell_count_and_monotonic_status() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        if against(req, "b") && about_article(req, "2") {
            return Ok("not json".to_string());
        }
        Ok("[]".to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["a.pdf", "b.pdf"]).await;

    let history = pipeline.results.memory.history(&job_id);
    // scaffold + one write per cell
    assert_eq!(history.len(), 1 + 2 * 2);

    for snapshot in &history {
        assert_eq!(snapshot.rows().len(), 2);
        for row in snapshot.rows() {
            assert_eq!(row.country_comparisons.len(), 2);
        }
    }

    for row in 0..2 {
        for column in 0..2 {
            let mut settled: Option<CellStatus> = None;
            for snapshot in &history {
                let status = snapshot.rows()[row].country_comparisons[column].status;
                match settled {
                    Some(previous) => assert_eq!(status, previous),
                    None if status != CellStatus::Pending => settled = Some(status),
                    None => {}
                }
            }
            assert!(settled.is_some(), "cell ({}, {}) never settled", row, column);
        }
    }

    let last = history.last().unwrap();
    assert_eq!(
        last.cell_statuses(),
        vec![
            vec![CellStatus::Completed, CellStatus::Completed],
            vec![CellStatus::Completed, CellStatus::Failed],
        ]
    );
}

#[tokio::test]
async fn test_primary_extraction_failure_is_terminal() {
    let generation = ScriptedGenerationService::new(|req| {
        if extracting(req, "primary_p.pdf") {
            return Ok("The document could not be read.".to_string());
        }
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok("[]".to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c.pdf"]).await;

    assert_eq!(state_of(&pipeline, &job_id).await, JobState::CriticalFailure);
    match pipeline.report(&job_id).await {
        Report::Failed(failure) => {
            assert_eq!(failure.status, FailureStatus::Failed);
            assert!(failure.error_details.contains("Extraction failed for"));
        }
        other => panic!("expected failure report, got {:?}", other),
    }
    assert!(pipeline
        .data
        .join(format!("{}_primary_p.error.json", job_id))
        .exists());

    // Only the source handle used for extraction was ever acquired
    assert_eq!(
        pipeline.released(),
        vec![format!("files/{}_primary_p.pdf", job_id)]
    );

    match pipeline.status.results(&job_id).await.unwrap() {
        JobProgress::Failed(failure) => assert!(!failure.error_message.is_empty()),
        other => panic!("expected failed progress, got {:?}", other),
    }
}

#[tokio::test]
async fn test_comparison_extraction_failure_fails_column() {
    let generation = ScriptedGenerationService::new(|req| {
        if extracting(req, "_cmp2_broken.pdf") {
            return Ok("no articles here".to_string());
        }
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok("[]".to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["good.pdf", "broken.pdf"]).await;

    assert_eq!(state_of(&pipeline, &job_id).await, JobState::Done);
    assert!(pipeline
        .data
        .join(format!("{}_cmp2_broken.error.json", job_id))
        .exists());

    let report = pipeline.report(&job_id).await;
    for row in report.cell_statuses() {
        assert_eq!(row, vec![CellStatus::Completed, CellStatus::Failed]);
    }
}

#[tokio::test]
async fn test_cleanup_releases_each_uploaded_handle_once() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok("[]".to_string())
    });
    // Release errors are swallowed
    generation.fail_release(ProviderError::Fatal("404 Not Found".into()));
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["c1.pdf", "c2.pdf"]).await;

    assert_eq!(state_of(&pipeline, &job_id).await, JobState::Done);

    let mut artifact_releases: Vec<String> = pipeline
        .released()
        .into_iter()
        .filter(|name| name.ends_with(".json"))
        .collect();
    artifact_releases.sort();
    assert_eq!(
        artifact_releases,
        vec![
            format!("files/{}_cmp1_c1.json", job_id),
            format!("files/{}_cmp2_c2.json", job_id),
            format!("files/{}_primary_p.json", job_id),
        ]
    );
}

/// Two comparison sources named `law.pdf` from different folders
#[tokio::test]
async fn test_same_named_comparison_documents_stay_separate() {
    let generation = ScriptedGenerationService::new(|req| {
        if extracting(req, "_cmp2_law.pdf") {
            return Ok(json!([
                {"article_number": "Art.3", "article_text": "Inheritance follows the civil code."}
            ])
            .to_string());
        }
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok(r#"[{"id":"Art.3","title":null,"reason":"same subject"}]"#.to_string())
    });
    let pipeline = Pipeline::new(generation);
    let primary = pipeline.source("p.pdf");
    let mut laws = Vec::new();
    for folder in ["a", "b"] {
        let dir = pipeline.sources.join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("law.pdf");
        std::fs::write(&path, folder.as_bytes()).unwrap();
        laws.push(path);
    }

    let job_id = pipeline.submission.submit(&primary, &laws).await.unwrap();
    assert!(pipeline.runner.drain(Duration::from_secs(10)).await);

    assert_eq!(state_of(&pipeline, &job_id).await, JobState::Done);
    let report = pipeline.report(&job_id).await;
    for row in report.rows() {
        let cells = &row.country_comparisons;
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.country_name == "law"));
        assert!(cells.iter().all(|c| c.status == CellStatus::Completed));
        assert_eq!(
            cells[0].similar_articles[0].matched_article_full_text,
            "The family is the basis of society."
        );
        assert_eq!(
            cells[1].similar_articles[0].matched_article_full_text,
            "Inheritance follows the civil code."
        );
    }

    // One distinct artifact per document, and every handle given back
    let mut artifacts: Vec<String> = pipeline
        .released()
        .into_iter()
        .filter(|name| name.ends_with(".json"))
        .collect();
    artifacts.sort();
    assert_eq!(
        artifacts,
        vec![
            format!("files/{}_cmp1_law.json", job_id),
            format!("files/{}_cmp2_law.json", job_id),
            format!("files/{}_primary_p.json", job_id),
        ]
    );
    assert_eq!(
        pipeline.generation.registered().len(),
        pipeline.released().len()
    );
}

#[tokio::test]
async fn test_missing_comparison_documents_are_skipped() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok("[]".to_string())
    });
    let pipeline = Pipeline::new(generation);
    let primary = pipeline.source("p.pdf");
    let present = pipeline.source("c.pdf");
    let missing = pipeline.sources.join("missing.pdf");

    let job_id = pipeline
        .submission
        .submit(&primary, &[missing.clone(), present])
        .await
        .unwrap();
    assert!(pipeline.runner.drain(Duration::from_secs(10)).await);

    let report = pipeline.report(&job_id).await;
    assert_eq!(report.rows()[0].country_comparisons.len(), 1);

    // Nothing usable to compare against
    let err = pipeline
        .submission
        .submit(&primary, &[missing])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_status_queries_after_completion() {
    let generation = ScriptedGenerationService::new(|req| {
        if req.response_mime_type.is_none() {
            return Ok(extraction_answer(req));
        }
        Ok(r#"[{"id":"Art.4","title":null,"reason":"education"}]"#.to_string())
    });
    let pipeline = Pipeline::new(generation);

    let job_id = pipeline.run("p.pdf", &["a.pdf", "b.pdf"]).await;

    match pipeline.status.results(&job_id).await.unwrap() {
        JobProgress::Live { state, report } => {
            assert_eq!(state, Some(JobState::Done));
            assert!(report.is_settled());
        }
        other => panic!("expected live progress, got {:?}", other),
    }

    let row = pipeline.status.row(&job_id, 1).await.unwrap();
    assert_eq!(row.base_article.article_number, "2");
    // one match per completed cell
    assert_eq!(row.similar_articles.len(), 2);
    assert_eq!(
        row.similar_articles[0].matched_article_full_text,
        "Schooling is compulsory."
    );

    assert!(matches!(
        pipeline.status.row(&job_id, 2).await,
        Err(AppError::ArticleIndexOutOfRange { index: 2, len: 2 })
    ));
    assert!(matches!(
        pipeline.status.results(&"nope".to_string()).await,
        Err(AppError::JobNotFound(_))
    ));
}
