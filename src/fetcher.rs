use std::{
    collections::HashSet,
    sync::{Arc, mpsc},
    thread,
    time::{Duration, Instant},
};

use tracing::{error, info};

use crate::assets::{AssetCache, AssetPatch, AssetStatus, GeneratedAsset};
use crate::catalog::{Scene, SceneId};
use crate::error::GenerationError;
use crate::generate::AssetGenerator;

struct FetchOutcome {
    scene_id: SceneId,
    result: Result<(String, Vec<u8>), GenerationError>,
}

/// Requests a scene's image and narration in the background and writes the
/// settled result into the cache. Outcomes are only applied by `drain`, so
/// every cache write happens on the caller's thread.
pub struct AssetFetcher {
    generator: Arc<dyn AssetGenerator>,
    tx: mpsc::Sender<FetchOutcome>,
    rx: mpsc::Receiver<FetchOutcome>,
    in_flight: HashSet<SceneId>,
}

impl AssetFetcher {
    pub fn new(generator: Arc<dyn AssetGenerator>) -> Self {
        let (tx, rx) = mpsc::channel();
        AssetFetcher {
            generator,
            tx,
            rx,
            in_flight: HashSet::new(),
        }
    }

    /// Start fetching `scene` unless its asset is ready or already in flight.
    /// Failed entries are fetched again from scratch. Returns whether a fetch
    /// was started.
    pub fn ensure_assets(&mut self, scene: &Scene, cache: &mut AssetCache) -> bool {
        if self.in_flight.contains(&scene.id) {
            return false;
        }
        if cache.status(scene.id) == Some(AssetStatus::Ready) {
            return false;
        }

        cache.merge(scene.id, AssetPatch::loading());
        self.in_flight.insert(scene.id);
        info!(scene = scene.id, "Fetching assets for \"{}\"", scene.title);

        let generator = Arc::clone(&self.generator);
        let tx = self.tx.clone();
        let scene_id = scene.id;
        let prompt = scene.visual_prompt;
        let voiceover = scene.voiceover;
        thread::spawn(move || {
            let result = fetch_both(generator.as_ref(), prompt, voiceover);
            let _ = tx.send(FetchOutcome { scene_id, result });
        });
        true
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Apply every outcome that has arrived. Returns the scene ids written.
    pub fn drain(&mut self, cache: &mut AssetCache) -> Vec<SceneId> {
        let mut settled = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            settled.push(self.apply(outcome, cache));
        }
        settled
    }

    /// Block until at least one outcome arrives (or `timeout` passes), then
    /// apply everything available.
    pub fn drain_timeout(&mut self, cache: &mut AssetCache, timeout: Duration) -> Vec<SceneId> {
        if self.in_flight.is_empty() {
            return Vec::new();
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                let mut settled = vec![self.apply(outcome, cache)];
                settled.extend(self.drain(cache));
                settled
            }
            Err(_) => Vec::new(),
        }
    }

    /// Apply outcomes until nothing is in flight or `timeout` passes.
    pub fn drain_all(&mut self, cache: &mut AssetCache, timeout: Duration) -> Vec<SceneId> {
        let deadline = Instant::now() + timeout;
        let mut settled = Vec::new();
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            settled.extend(self.drain_timeout(cache, remaining));
        }
        settled
    }

    fn apply(&mut self, outcome: FetchOutcome, cache: &mut AssetCache) -> SceneId {
        self.in_flight.remove(&outcome.scene_id);
        let asset = match outcome.result {
            Ok((image_url, audio)) => {
                info!(scene = outcome.scene_id, "Assets ready ({} bytes of narration)", audio.len());
                GeneratedAsset::ready(image_url, audio)
            }
            Err(e) => {
                error!(scene = outcome.scene_id, "Failed to fetch assets: {e}");
                GeneratedAsset::failed(e.to_string())
            }
        };
        cache.set(outcome.scene_id, asset);
        outcome.scene_id
    }
}

/// Run both requests concurrently and only return once both have resolved.
/// A scene is all-or-nothing: either failure discards the other half.
fn fetch_both(
    generator: &dyn AssetGenerator,
    prompt: &str,
    voiceover: &str,
) -> Result<(String, Vec<u8>), GenerationError> {
    let (image, narration) = thread::scope(|s| {
        let image = s.spawn(|| generator.generate_image(prompt));
        let narration = s.spawn(|| generator.generate_narration(voiceover));
        (
            image.join().unwrap_or(Err(GenerationError::WorkerPanicked("image"))),
            narration.join().unwrap_or(Err(GenerationError::WorkerPanicked("narration"))),
        )
    });
    Ok((image?, narration?))
}
