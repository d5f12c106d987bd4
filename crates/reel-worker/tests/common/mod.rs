//! In-process fakes for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use reel_media::{
    AssemblyRequest, AudioRenderRequest, MediaEngine, MediaError, MediaInfo, MediaResult,
    MixPlan, MixedAudio, TrimmedMedia,
};
use reel_models::{EncodingProfile, EngagingInterval};
use reel_storage::{ObjectStore, StorageError, StorageResult};
use reel_worker::{IntervalRecommender, RecommendError, VideoReference};

/// Object store backed by a map.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_put_prefix: Mutex<Option<String>>,
    signed_url_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub fn fail_puts_under(&self, prefix: &str) {
        *self.fail_put_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    /// Make every `signed_url` call wait `delay` first.
    pub fn delay_signed_urls(&self, delay: Duration) {
        *self.signed_url_delay.lock().unwrap() = Some(delay);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let failing = self
            .fail_put_prefix
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| key.starts_with(p.as_str()))
            .unwrap_or(false);
        if failing {
            return Err(StorageError::upload_failed(format!("{}: injected failure", key)));
        }
        self.puts.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.contains(key))
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let delay = *self.signed_url_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(format!("https://signed.example.com/{}?ttl={}", key, ttl.as_secs()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Recommender with scripted answers.
pub struct FakeRecommender {
    answer: String,
    fail: bool,
    delays: HashMap<String, Duration>,
    seen: Mutex<Vec<String>>,
}

impl FakeRecommender {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: false,
            delays: HashMap::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::answering("")
        }
    }

    /// Delay the answer for `url`.
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// URLs the recommender was asked about.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntervalRecommender for FakeRecommender {
    async fn recommend(&self, video: &VideoReference) -> Result<String, RecommendError> {
        self.seen.lock().unwrap().push(video.url.clone());
        if let Some(delay) = self.delays.get(&video.url) {
            tokio::time::sleep(*delay).await;
        }
        if self.fail {
            return Err(RecommendError::EmptyResponse);
        }
        Ok(self.answer.clone())
    }
}

/// One recorded trim call.
#[derive(Debug, Clone)]
pub struct TrimCall {
    pub source: String,
    pub interval: EngagingInterval,
    pub keep_audio: bool,
}

/// Media engine that writes marker files instead of encoding.
///
/// Sources are identified by their file contents. Trimmed clips contain
/// `clip:<source>` and the assembled reel lists its clips in order.
#[derive(Default)]
pub struct FakeEngine {
    trims: Mutex<Vec<TrimCall>>,
    plans: Mutex<Vec<MixPlan>>,
    assembled: Mutex<Vec<Vec<String>>>,
    assembled_audio: Mutex<Vec<MixedAudio>>,
    fail_first_trim: Mutex<HashSet<String>>,
    fail_background_render: bool,
    calls: Mutex<usize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first trim of the source with these contents fails.
    pub fn failing_first_trim_of(self, source: &str) -> Self {
        self.fail_first_trim.lock().unwrap().insert(source.to_string());
        self
    }

    /// Renders that use the background track fail.
    pub fn failing_background_render(mut self) -> Self {
        self.fail_background_render = true;
        self
    }

    pub fn trims(&self) -> Vec<TrimCall> {
        self.trims.lock().unwrap().clone()
    }

    pub fn plans(&self) -> Vec<MixPlan> {
        self.plans.lock().unwrap().clone()
    }

    pub fn assembled(&self) -> Vec<Vec<String>> {
        self.assembled.lock().unwrap().clone()
    }

    pub fn assembled_audio(&self) -> Vec<MixedAudio> {
        self.assembled_audio.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn count(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

async fn read_marker(path: &Path) -> MediaResult<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        self.count();
        let marker = read_marker(path).await?;
        let is_music = marker.starts_with("music");
        Ok(MediaInfo {
            duration: Some(if is_music { 30.0 } else { 120.0 }),
            has_video: !is_music,
            has_audio: true,
            width: if is_music { 0 } else { 1920 },
            height: if is_music { 0 } else { 1080 },
            fps: if is_music { 0.0 } else { 30.0 },
        })
    }

    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        interval: &EngagingInterval,
        _profile: &EncodingProfile,
        keep_audio: bool,
    ) -> MediaResult<TrimmedMedia> {
        self.count();
        let source = read_marker(input).await?;
        self.trims.lock().unwrap().push(TrimCall {
            source: source.clone(),
            interval: *interval,
            keep_audio,
        });

        if self.fail_first_trim.lock().unwrap().remove(&source) {
            return Err(MediaError::ffmpeg_failed("injected trim failure", None, Some(1)));
        }

        tokio::fs::write(output, format!("clip:{}", source)).await?;
        Ok(TrimmedMedia {
            duration: interval.duration(),
            has_audio: keep_audio,
        })
    }

    async fn render_audio(&self, request: &AudioRenderRequest, output: &Path) -> MediaResult<MixedAudio> {
        self.count();
        self.plans.lock().unwrap().push(request.plan);
        if request.plan.uses_background() && self.fail_background_render {
            return Err(MediaError::ffmpeg_failed("injected mix failure", None, Some(1)));
        }
        if request.plan == MixPlan::Silence {
            return Ok(MixedAudio::Silence);
        }
        tokio::fs::write(output, b"mix").await?;
        Ok(MixedAudio::Track(output.to_path_buf()))
    }

    async fn assemble(&self, request: &AssemblyRequest, output: &Path) -> MediaResult<f64> {
        self.count();
        let mut order = Vec::with_capacity(request.clips.len());
        for clip in &request.clips {
            order.push(read_marker(&clip.path).await?);
        }
        self.assembled.lock().unwrap().push(order.clone());
        self.assembled_audio.lock().unwrap().push(request.audio.clone());
        tokio::fs::write(output, order.join("\n")).await?;
        Ok(request.total_duration())
    }
}

/// Store `sources` sources under `videos/<i>.mp4` plus the built-in rock track.
pub fn seeded_store(sources: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for i in 0..sources {
        store.insert(&source_key(i), format!("source-{}", i).as_bytes());
    }
    store.insert("highlightMusic/rock_anthem.mp3", b"music:rock");
    store
}

pub fn source_key(index: usize) -> String {
    format!("videos/{}.mp4", index)
}
