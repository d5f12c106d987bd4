//! Compilation orchestrator.
//!
//! Drives one job through
//! `Created -> ExtractingClips -> MixingAudio -> Assembling -> Uploaded | Failed`
//! and guarantees that the job's temporary directory and staged storage
//! objects are gone once it reaches a terminal state.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tempfile::TempDir;
use tracing::Instrument;

use reel_media::MediaEngine;
use reel_models::{CompilationJob, JobState, OutputArtifact};
use reel_storage::ObjectStore;

use crate::assembler::{PublishSettings, ReelAssembler};
use crate::config::WorkerConfig;
use crate::dispatch::dispatch_all;
use crate::error::{CompilationError, Stage, WorkerError, WorkerResult};
use crate::extract::{ClipExtractor, ExtractionSettings};
use crate::interval::{IntervalRecommender, IntervalSelector};
use crate::logging::JobLogger;
use crate::metrics;
use crate::mixer::AudioMixer;
use crate::source::SourceFetcher;
use crate::staging::StagingLedger;

/// Tracks a job's position in the state machine.
#[derive(Debug)]
pub struct JobProgress {
    state: JobState,
    history: Vec<JobState>,
    logger: JobLogger,
}

impl JobProgress {
    pub fn new(logger: JobLogger) -> Self {
        Self {
            state: JobState::Created,
            history: vec![JobState::Created],
            logger,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// States visited so far, in order.
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Move along an allowed edge.
    pub fn advance(&mut self, next: JobState) -> Result<(), CompilationError> {
        if !self.state.can_transition_to(next) {
            return Err(CompilationError::new(
                self.stage(),
                format!("invalid state transition {} -> {}", self.state, next),
            ));
        }
        self.set(next);
        Ok(())
    }

    /// Terminate the job as failed from whatever state it is in.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.set(JobState::Failed);
        }
    }

    /// Stage failures are attributed to while in the current state.
    pub fn stage(&self) -> Stage {
        match self.state {
            JobState::Created => Stage::Validation,
            JobState::ExtractingClips => Stage::ExtractingClips,
            JobState::MixingAudio => Stage::MixingAudio,
            JobState::Assembling | JobState::Uploaded | JobState::Failed => Stage::Assembling,
        }
    }

    fn set(&mut self, next: JobState) {
        self.logger.log_transition(self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

/// Result of one compilation, with the states the job passed through.
#[derive(Debug)]
pub struct CompilationOutcome {
    pub result: Result<OutputArtifact, CompilationError>,
    pub states: Vec<JobState>,
}

/// Highlight reel compiler.
pub struct Compiler {
    config: WorkerConfig,
    engine: Arc<dyn MediaEngine>,
    store: Arc<dyn ObjectStore>,
    recommender: Arc<dyn IntervalRecommender>,
    http: Client,
}

impl Compiler {
    pub fn new(
        config: WorkerConfig,
        engine: Arc<dyn MediaEngine>,
        store: Arc<dyn ObjectStore>,
        recommender: Arc<dyn IntervalRecommender>,
    ) -> WorkerResult<Self> {
        let http = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| WorkerError::config_error(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            engine,
            store,
            recommender,
            http,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Compile `job` and return the uploaded artifact.
    pub async fn compile(&self, job: &CompilationJob) -> Result<OutputArtifact, CompilationError> {
        self.compile_with_states(job).await.result
    }

    /// Compile `job`, also reporting the state history.
    pub async fn compile_with_states(&self, job: &CompilationJob) -> CompilationOutcome {
        let logger = JobLogger::new(&job.id, "compile");
        let span = logger.create_span();
        let started = Instant::now();
        let mut progress = JobProgress::new(logger.clone());

        let result = async {
            logger.log_start(&format!(
                "{} sources, quality={}, track={}",
                job.source_urls.len(),
                job.quality,
                job.audio_track.as_ref().map(|t| t.as_str()).unwrap_or("none")
            ));

            if let Err(message) = job.validate() {
                return Err(CompilationError::validation(message));
            }

            let ledger = Arc::new(StagingLedger::new());
            let outcome = tokio::time::timeout(
                self.config.job_timeout,
                self.run(job, &ledger, &mut progress, &logger),
            )
            .await
            .unwrap_or_else(|_| {
                Err(CompilationError::new(
                    progress.stage(),
                    format!(
                        "job timed out after {:.1}s",
                        self.config.job_timeout.as_secs_f64()
                    ),
                ))
            });

            let removed = ledger.cleanup(self.store.as_ref()).await;
            if removed > 0 {
                logger.log_progress(&format!("Removed {} staged objects", removed));
            }
            outcome
        }
        .instrument(span)
        .await;

        match &result {
            Ok(artifact) => {
                if let Err(e) = progress.advance(JobState::Uploaded) {
                    logger.log_error(&e.to_string());
                }
                logger.log_completion(&format!(
                    "{} ({:.2}s, {} clips)",
                    artifact.public_reference, artifact.duration, artifact.clip_count
                ));
                metrics::record_job("uploaded", started.elapsed().as_secs_f64());
            }
            Err(e) => {
                progress.abort();
                logger.log_error(&e.to_string());
                metrics::record_job("failed", started.elapsed().as_secs_f64());
            }
        }

        CompilationOutcome {
            result,
            states: progress.history().to_vec(),
        }
    }

    async fn run(
        &self,
        job: &CompilationJob,
        ledger: &Arc<StagingLedger>,
        progress: &mut JobProgress,
        logger: &JobLogger,
    ) -> Result<OutputArtifact, CompilationError> {
        let work_dir = self.create_work_dir().await?;
        let profile = job.quality.encoding();
        let fetcher = SourceFetcher::new(
            self.http.clone(),
            self.store.clone(),
            self.config.download_timeout,
        );

        progress.advance(JobState::ExtractingClips)?;
        let mut extractor = ClipExtractor::new(
            self.engine.clone(),
            self.store.clone(),
            fetcher.clone(),
            IntervalSelector::new(self.recommender.clone(), self.config.recommend_timeout),
            ExtractionSettings {
                work_dir: work_dir.path().to_path_buf(),
                profile: profile.clone(),
                keep_audio: job.volumes.keeps_original_audio(),
            },
            logger.for_stage(Stage::ExtractingClips.as_str()),
        );
        if self.config.stage_sources {
            extractor = extractor.with_staging(
                job.id.as_str(),
                ledger.clone(),
                self.config.signed_url_ttl,
            );
        }

        let clips = dispatch_all(job.clip_requests(), self.config.max_clip_parallel, |request| {
            let extractor = extractor.clone();
            async move { extractor.extract(&request).await }
        })
        .await?;

        progress.advance(JobState::MixingAudio)?;
        let audio = AudioMixer::new(self.engine.clone(), fetcher)
            .mix(
                &clips,
                job.audio_track.as_ref(),
                &job.volumes,
                &profile,
                work_dir.path(),
                &logger.for_stage(Stage::MixingAudio.as_str()),
            )
            .await;

        progress.advance(JobState::Assembling)?;
        let assembler = ReelAssembler::new(
            self.engine.clone(),
            self.store.clone(),
            PublishSettings {
                public_base_url: self.config.public_base_url.clone(),
                signed_url_ttl: self.config.signed_url_ttl,
            },
        );
        let assembling_logger = logger.for_stage(Stage::Assembling.as_str());
        let reel = assembler
            .encode(&clips, audio, &profile, work_dir.path(), &assembling_logger)
            .await?;
        drop(clips);

        assembler
            .upload(
                reel,
                &job.owner_id,
                job.id.as_str(),
                ledger,
                &logger.for_stage(Stage::Uploading.as_str()),
            )
            .await
    }

    async fn create_work_dir(&self) -> Result<TempDir, CompilationError> {
        let setup_error =
            |e: std::io::Error| CompilationError::new(Stage::ExtractingClips, format!("work dir unavailable: {}", e));

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(setup_error)?;
        tempfile::Builder::new()
            .prefix("reel-")
            .tempdir_in(&self.config.work_dir)
            .map_err(setup_error)
    }
}
