//! End-to-end compilation tests against in-process fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reel_media::{MixPlan, MixedAudio};
use reel_models::{CompilationJob, EngagingInterval, JobState, QualityProfile, VolumeSpec};
use reel_worker::{Compiler, Stage, WorkerConfig};

use common::{seeded_store, source_key, FakeEngine, FakeRecommender, MemoryStore};

struct Harness {
    engine: Arc<FakeEngine>,
    store: Arc<MemoryStore>,
    recommender: Arc<FakeRecommender>,
    work_dir: tempfile::TempDir,
    compiler: Compiler,
}

fn harness(
    engine: FakeEngine,
    store: Arc<MemoryStore>,
    recommender: FakeRecommender,
    configure: impl FnOnce(&mut WorkerConfig),
) -> Harness {
    let work_dir = tempfile::tempdir().unwrap();
    let mut config = WorkerConfig {
        work_dir: work_dir.path().to_string_lossy().into_owned(),
        ..Default::default()
    };
    configure(&mut config);

    let engine = Arc::new(engine);
    let recommender = Arc::new(recommender);
    let compiler = Compiler::new(config, engine.clone(), store.clone(), recommender.clone()).unwrap();

    Harness {
        engine,
        store,
        recommender,
        work_dir,
        compiler,
    }
}

fn job(sources: Vec<String>) -> CompilationJob {
    CompilationJob::new("user-1", sources)
        .with_quality(QualityProfile::Fast)
        .with_volumes(VolumeSpec::new(0.7, 0.3))
        .with_audio_track("rock_anthem")
}

fn sources(n: usize) -> Vec<String> {
    (0..n).map(source_key).collect()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

const FULL_RUN: [JobState; 5] = [
    JobState::Created,
    JobState::ExtractingClips,
    JobState::MixingAudio,
    JobState::Assembling,
    JobState::Uploaded,
];

#[tokio::test]
async fn test_three_clip_reel_with_background_music() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(3),
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    let outcome = h.compiler.compile_with_states(&job(sources(3))).await;
    let artifact = outcome.result.unwrap();

    assert_eq!(outcome.states, FULL_RUN);
    assert_eq!(artifact.clip_count, 3);
    assert!(approx(artifact.duration, 21.0));
    assert!(artifact.storage_key.starts_with("completeHighlights/user-1/"));
    assert!(artifact.storage_key.ends_with(".mp4"));
    assert!(h.store.contains(&artifact.storage_key));

    let plans = h.engine.plans();
    assert_eq!(plans.len(), 1);
    assert!(matches!(plans[0], MixPlan::Blend { .. }));
    assert!(h.engine.trims().iter().all(|t| t.keep_audio));
}

#[tokio::test]
async fn test_empty_source_list_fails_validation_without_side_effects() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(0),
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    let outcome = h.compiler.compile_with_states(&job(Vec::new())).await;
    let err = outcome.result.unwrap_err();

    assert_eq!(err.stage, Stage::Validation);
    assert_eq!(err.clip_index, None);
    assert_eq!(outcome.states, [JobState::Created, JobState::Failed]);
    assert_eq!(h.engine.call_count(), 0);
    assert!(h.recommender.seen().is_empty());
    assert!(h.store.puts().is_empty());
}

#[tokio::test]
async fn test_unreachable_source_fails_job_with_its_index() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(3),
        FakeRecommender::answering("5,12"),
        |_| {},
    );
    let job = job(vec![
        source_key(0),
        "videos/missing.mp4".to_string(),
        source_key(2),
    ]);

    let outcome = h.compiler.compile_with_states(&job).await;
    let err = outcome.result.unwrap_err();

    assert_eq!(err.stage, Stage::ExtractingClips);
    assert_eq!(err.clip_index, Some(1));
    assert_eq!(
        outcome.states,
        [JobState::Created, JobState::ExtractingClips, JobState::Failed]
    );
    assert!(h.engine.assembled().is_empty());
    assert!(h.store.keys_with_prefix("completeHighlights/").is_empty());
}

#[tokio::test]
async fn test_clips_are_assembled_in_request_order() {
    // Earlier sources get slower recommendations so they finish last.
    let recommender = FakeRecommender::answering("5,12")
        .with_delay(&source_key(0), Duration::from_millis(200))
        .with_delay(&source_key(1), Duration::from_millis(100));
    let h = harness(FakeEngine::new(), seeded_store(4), recommender, |_| {});

    h.compiler.compile(&job(sources(4))).await.unwrap();

    assert_eq!(
        h.engine.assembled(),
        vec![vec![
            "clip:source-0".to_string(),
            "clip:source-1".to_string(),
            "clip:source-2".to_string(),
            "clip:source-3".to_string(),
        ]]
    );
}

#[tokio::test]
async fn test_recommender_failure_uses_default_interval() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(3),
        FakeRecommender::failing(),
        |_| {},
    );

    let artifact = h.compiler.compile(&job(sources(3))).await.unwrap();

    assert!(approx(artifact.duration, 30.0));
    let trims = h.engine.trims();
    assert_eq!(trims.len(), 3);
    assert!(trims.iter().all(|t| t.interval == EngagingInterval::FALLBACK));
}

#[tokio::test]
async fn test_invalid_recommendation_uses_default_interval() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(2),
        FakeRecommender::answering("start at 5 seconds"),
        |_| {},
    );

    let artifact = h.compiler.compile(&job(sources(2))).await.unwrap();
    assert!(approx(artifact.duration, 20.0));
}

#[tokio::test]
async fn test_trim_failure_retries_with_short_interval() {
    let h = harness(
        FakeEngine::new().failing_first_trim_of("source-1"),
        seeded_store(3),
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    let artifact = h.compiler.compile(&job(sources(3))).await.unwrap();

    assert!(approx(artifact.duration, 7.0 + 3.0 + 7.0));
    let retried: Vec<_> = h
        .engine
        .trims()
        .into_iter()
        .filter(|t| t.source == "source-1")
        .collect();
    assert_eq!(retried.len(), 2);
    assert_eq!(retried[1].interval, EngagingInterval::RETRY);
}

#[tokio::test]
async fn test_missing_background_track_falls_back_to_original_audio() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(2),
        FakeRecommender::answering("5,12"),
        |_| {},
    );
    let job = job(sources(2)).with_audio_track("custom_missing.mp3");

    let outcome = h.compiler.compile_with_states(&job).await;

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.states, FULL_RUN);
    let plans = h.engine.plans();
    assert_eq!(plans.len(), 1);
    assert!(matches!(plans[0], MixPlan::OriginalOnly { .. }));
}

#[tokio::test]
async fn test_failed_background_mix_retries_without_music() {
    let h = harness(
        FakeEngine::new().failing_background_render(),
        seeded_store(2),
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    h.compiler.compile(&job(sources(2))).await.unwrap();

    let plans = h.engine.plans();
    assert_eq!(plans.len(), 2);
    assert!(matches!(plans[0], MixPlan::Blend { .. }));
    assert!(matches!(plans[1], MixPlan::OriginalOnly { .. }));
    assert!(matches!(h.engine.assembled_audio()[0], MixedAudio::Track(_)));
}

#[tokio::test]
async fn test_muted_original_without_music_is_silent() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(2),
        FakeRecommender::answering("5,12"),
        |_| {},
    );
    let mut job = job(sources(2)).with_volumes(VolumeSpec::new(0.0, 0.5));
    job.audio_track = None;

    h.compiler.compile(&job).await.unwrap();

    assert!(h.engine.trims().iter().all(|t| !t.keep_audio));
    assert_eq!(h.engine.plans(), vec![MixPlan::Silence]);
    assert_eq!(h.engine.assembled_audio(), vec![MixedAudio::Silence]);
}

#[tokio::test]
async fn test_muted_original_with_music_uses_background_only() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(2),
        FakeRecommender::answering("5,12"),
        |_| {},
    );
    let job = job(sources(2)).with_volumes(VolumeSpec::new(0.0, 0.5));

    h.compiler.compile(&job).await.unwrap();

    assert!(h.engine.trims().iter().all(|t| !t.keep_audio));
    assert!(matches!(
        h.engine.plans()[0],
        MixPlan::BackgroundOnly { .. }
    ));
}

#[tokio::test]
async fn test_staged_sources_are_removed_after_job() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(3),
        FakeRecommender::answering("5,12"),
        |config| config.stage_sources = true,
    );

    h.compiler.compile(&job(sources(3))).await.unwrap();

    let staged: Vec<String> = h
        .store
        .puts()
        .into_iter()
        .filter(|k| k.starts_with("staging/"))
        .collect();
    assert_eq!(staged.len(), 3);
    assert!(h
        .recommender
        .seen()
        .iter()
        .all(|url| url.starts_with("https://signed.example.com/staging/")));
    assert!(h.store.keys_with_prefix("staging/").is_empty());
    for key in staged {
        assert!(h.store.deletes().contains(&key));
    }
}

#[tokio::test]
async fn test_staged_sources_are_removed_after_failure() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(2),
        FakeRecommender::answering("5,12"),
        |config| config.stage_sources = true,
    );
    let job = job(vec![source_key(0), source_key(1), "videos/missing.mp4".to_string()]);

    assert!(h.compiler.compile(&job).await.is_err());
    assert!(h.store.keys_with_prefix("staging/").is_empty());
}

#[tokio::test]
async fn test_rerun_produces_same_structure() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(3),
        FakeRecommender::answering("5,12"),
        |_| {},
    );
    let job = job(sources(3));

    let first = h.compiler.compile_with_states(&job).await;
    let second = h.compiler.compile_with_states(&job).await;

    assert_eq!(first.states, second.states);
    let (first, second) = (first.result.unwrap(), second.result.unwrap());
    assert_eq!(first.clip_count, second.clip_count);
    assert!(approx(first.duration, second.duration));
    let assembled = h.engine.assembled();
    assert_eq!(assembled[0], assembled[1]);
}

#[tokio::test]
async fn test_public_base_url_reference() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(1),
        FakeRecommender::answering("5,12"),
        |config| config.public_base_url = Some("https://cdn.example.com".to_string()),
    );

    let artifact = h.compiler.compile(&job(sources(1))).await.unwrap();
    assert_eq!(
        artifact.public_reference,
        format!("https://cdn.example.com/{}", artifact.storage_key)
    );
}

#[tokio::test]
async fn test_signed_url_reference_without_public_base() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(1),
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    let artifact = h.compiler.compile(&job(sources(1))).await.unwrap();
    assert_eq!(
        artifact.public_reference,
        format!(
            "https://signed.example.com/{}?ttl=604800",
            artifact.storage_key
        )
    );
}

#[tokio::test]
async fn test_upload_failure_removes_partial_output() {
    let store = seeded_store(2);
    store.fail_puts_under("completeHighlights/");
    let h = harness(
        FakeEngine::new(),
        store,
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    let outcome = h.compiler.compile_with_states(&job(sources(2))).await;
    let err = outcome.result.unwrap_err();

    assert_eq!(err.stage, Stage::Uploading);
    assert_eq!(outcome.states.last(), Some(&JobState::Failed));
    assert!(h
        .store
        .deletes()
        .iter()
        .any(|k| k.starts_with("completeHighlights/user-1/")));
}

#[tokio::test]
async fn test_timeout_during_upload_leaves_no_output() {
    let store = seeded_store(2);
    store.delay_signed_urls(Duration::from_secs(5));
    let h = harness(
        FakeEngine::new(),
        store,
        FakeRecommender::answering("5,12"),
        |config| config.job_timeout = Duration::from_millis(500),
    );

    let outcome = h.compiler.compile_with_states(&job(sources(2))).await;
    let err = outcome.result.unwrap_err();

    assert_eq!(err.stage, Stage::Assembling);
    assert!(err.message.contains("timed out after 0.5s"));
    assert_eq!(outcome.states.last(), Some(&JobState::Failed));
    // The reel was written before the timeout hit.
    assert!(h
        .store
        .puts()
        .iter()
        .any(|k| k.starts_with("completeHighlights/user-1/")));
    assert!(h.store.keys_with_prefix("completeHighlights/").is_empty());
}

#[tokio::test]
async fn test_successful_upload_is_kept() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(1),
        FakeRecommender::answering("5,12"),
        |_| {},
    );
    let job = job(sources(1));

    let artifact = h.compiler.compile(&job).await.unwrap();

    assert!(artifact
        .storage_key
        .ends_with(&format!("-{}.mp4", job.id.as_str())));
    assert!(h.store.contains(&artifact.storage_key));
    assert!(!h.store.deletes().contains(&artifact.storage_key));
}

#[tokio::test]
async fn test_job_timeout_fails_in_current_stage() {
    let recommender = FakeRecommender::answering("5,12")
        .with_delay(&source_key(0), Duration::from_secs(5));
    let h = harness(FakeEngine::new(), seeded_store(2), recommender, |config| {
        config.job_timeout = Duration::from_millis(300)
    });

    let outcome = h.compiler.compile_with_states(&job(sources(2))).await;
    let err = outcome.result.unwrap_err();

    assert_eq!(err.stage, Stage::ExtractingClips);
    assert!(err.message.contains("timed out"));
    assert_eq!(outcome.states.last(), Some(&JobState::Failed));
}

#[tokio::test]
async fn test_work_dir_is_emptied_after_success_and_failure() {
    let h = harness(
        FakeEngine::new(),
        seeded_store(2),
        FakeRecommender::answering("5,12"),
        |_| {},
    );

    h.compiler.compile(&job(sources(2))).await.unwrap();
    assert_eq!(std::fs::read_dir(h.work_dir.path()).unwrap().count(), 0);

    let failing = job(vec![source_key(0), "videos/missing.mp4".to_string()]);
    assert!(h.compiler.compile(&failing).await.is_err());
    assert_eq!(std::fs::read_dir(h.work_dir.path()).unwrap().count(), 0);
}
