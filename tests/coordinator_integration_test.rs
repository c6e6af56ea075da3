//! End-to-end pipeline tests: real `ForkManager` + `Coordinator` against a
//! temp-file-backed libsql database, exercising spec §8 scenarios.

mod common;

use fitscore_core::coordinator::Coordinator;
use fitscore_core::storage::ResultStore;
use fitscore_core::types::{JobId, ResumeId};
use fitscore_core::workers::ScoringCatalog;
use std::time::Duration;

#[tokio::test]
async fn perfect_senior_match_scores_high_and_completes_all_agents() {
    let fixture = common::seeded_fixture(10).await;
    let embedding = common::unit_embedding(1.0, 7);

    let resume = common::senior_python_resume("r-perfect", 6, embedding.clone());
    let job = common::senior_python_job("j-senior", 5, embedding);
    fixture.store.put_resume(&resume).await.unwrap();
    fixture.store.put_job(&job).await.unwrap();

    let coordinator = Coordinator::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.fork_manager.clone(),
        Duration::from_secs(5),
        ScoringCatalog::default(),
    );

    let response = coordinator.score(ResumeId("r-perfect".into()), JobId("j-senior".into())).await.unwrap();

    assert_eq!(response.agents_completed, 5);
    assert!(response.scores.composite > 0.8, "composite was {}", response.scores.composite);
    assert_eq!(response.weights.profile_tag, "Senior/Leadership");
    for dim in ["skill", "semantic", "experience", "education", "certification"] {
        let entry = response.breakdown.get(dim).unwrap_or_else(|| panic!("missing {dim} in breakdown"));
        assert_eq!(entry.status, "completed");
    }
}

#[tokio::test]
async fn unknown_resume_returns_not_found() {
    let fixture = common::seeded_fixture(10).await;
    let embedding = common::unit_embedding(1.0, 7);
    let job = common::senior_python_job("j-senior", 5, embedding);
    fixture.store.put_job(&job).await.unwrap();

    let coordinator = Coordinator::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.fork_manager.clone(),
        Duration::from_secs(5),
        ScoringCatalog::default(),
    );

    let err = coordinator.score(ResumeId("does-not-exist".into()), JobId("j-senior".into())).await.unwrap_err();
    assert!(matches!(err, fitscore_core::error::FitscoreError::NotFound(_)));
}

#[tokio::test]
async fn mismatched_candidate_scores_low_but_still_completes() {
    let fixture = common::seeded_fixture(10).await;

    let resume = fitscore_core::types::Resume {
        resume_id: ResumeId("r-junior".into()),
        body: "Recent graduate with a high school diploma, no professional experience.".into(),
        skills: vec![],
        years_experience: 0,
        education: vec!["high school diploma".into()],
        certifications: vec![],
        embedding: common::unit_embedding(-1.0, 7),
    };
    let job = common::senior_python_job("j-senior-2", 8, common::unit_embedding(1.0, 7));
    fixture.store.put_resume(&resume).await.unwrap();
    fixture.store.put_job(&job).await.unwrap();

    let coordinator = Coordinator::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.fork_manager.clone(),
        Duration::from_secs(5),
        ScoringCatalog::default(),
    );

    let response = coordinator.score(ResumeId("r-junior".into()), JobId("j-senior-2".into())).await.unwrap();
    assert_eq!(response.agents_completed, 5);
    assert!(response.scores.composite < 0.4, "composite was {}", response.scores.composite);
}

#[tokio::test]
async fn repeated_scoring_upserts_rather_than_duplicates_composite() {
    let fixture = common::seeded_fixture(10).await;
    let embedding = common::unit_embedding(1.0, 7);
    let resume = common::senior_python_resume("r-repeat", 6, embedding.clone());
    let job = common::senior_python_job("j-repeat", 5, embedding);
    fixture.store.put_resume(&resume).await.unwrap();
    fixture.store.put_job(&job).await.unwrap();

    let coordinator = Coordinator::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.fork_manager.clone(),
        Duration::from_secs(5),
        ScoringCatalog::default(),
    );

    let first = coordinator.score(ResumeId("r-repeat".into()), JobId("j-repeat".into())).await.unwrap();
    let second = coordinator.score(ResumeId("r-repeat".into()), JobId("j-repeat".into())).await.unwrap();
    assert_eq!(first.scores.composite, second.scores.composite);

    let stored = fixture.store.get_composite(&ResumeId("r-repeat".into()), &JobId("j-repeat".into())).await.unwrap();
    assert!(stored.is_some());
}
