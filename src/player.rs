use std::{
    sync::{Arc, mpsc},
    time::Duration,
};

use tracing::{debug, error, info};

use crate::assets::{AssetCache, GeneratedAsset};
use crate::audio::{AudioBackend, PlaybackEngine};
use crate::catalog::{Scene, SceneId};
use crate::controller::{Command, Controller, PlaybackState, Session};
use crate::fetcher::AssetFetcher;
use crate::generate::AssetGenerator;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The cached asset for this scene changed.
    Asset(SceneId),
    /// Current scene, autoplay, or playback state changed.
    Session,
}

/// The application core: owns the asset cache, the fetcher, the audio engine
/// and the autoplay controller, and carries out the controller's commands.
///
/// Everything here runs on the UI thread. Call the intent methods for user
/// input first and `pump` afterwards on every tick.
pub struct Player {
    scenes: &'static [Scene],
    cache: AssetCache,
    asset_events: mpsc::Receiver<SceneId>,
    fetcher: AssetFetcher,
    engine: PlaybackEngine,
    controller: Controller,
    notifier: Notifier<PlayerEvent>,
}

impl Player {
    pub fn new(
        scenes: &'static [Scene],
        generator: Arc<dyn AssetGenerator>,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        let mut cache = AssetCache::new();
        let asset_events = cache.subscribe();
        Player {
            scenes,
            cache,
            asset_events,
            fetcher: AssetFetcher::new(generator),
            engine: PlaybackEngine::new(backend),
            controller: Controller::new(scenes),
            notifier: Notifier::new(),
        }
    }

    pub fn scenes(&self) -> &'static [Scene] {
        self.scenes
    }

    pub fn scene(&self) -> &'static Scene {
        self.controller.current_scene()
    }

    pub fn asset(&self, id: SceneId) -> Option<&GeneratedAsset> {
        self.cache.get(id)
    }

    pub fn completed_count(&self) -> usize {
        self.cache.completed_count()
    }

    pub fn session(&self) -> Session {
        self.controller.session()
    }

    pub fn state(&self) -> &PlaybackState {
        self.controller.state()
    }

    pub fn is_started(&self) -> bool {
        self.controller.is_started()
    }

    pub fn narration_progress(&self) -> Option<(Duration, Duration)> {
        self.engine.progress()
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<PlayerEvent> {
        self.notifier.subscribe()
    }

    pub fn start(&mut self) {
        self.apply(|c, cache| c.start(cache));
    }

    pub fn select(&mut self, index: usize) {
        self.apply(|c, cache| c.select(index, cache));
    }

    pub fn next(&mut self) {
        self.apply(|c, cache| c.next(cache));
    }

    pub fn prev(&mut self) {
        self.apply(|c, cache| c.prev(cache));
    }

    pub fn toggle_autoplay(&mut self) {
        self.apply(|c, cache| c.toggle_autoplay(cache));
    }

    pub fn play(&mut self) {
        self.apply(|c, _| c.play());
    }

    pub fn retry(&mut self) {
        self.apply(|c, _| c.retry());
    }

    /// Apply fetch results that arrived since the last call, then the end of
    /// the current narration if it finished.
    pub fn pump(&mut self) {
        self.fetcher.drain(&mut self.cache);
        self.dispatch_asset_changes();

        if self.engine.poll_ended().is_some() {
            info!(scene = self.scene().id, "Narration finished");
            self.apply(|c, cache| c.playback_ended(cache));
        }
    }

    /// Block until outstanding fetches settle or `timeout` passes, applying
    /// them as they arrive.
    pub fn wait_for_fetches(&mut self, timeout: Duration) {
        self.fetcher.drain_all(&mut self.cache, timeout);
        self.dispatch_asset_changes();
    }

    pub fn shutdown(&mut self) {
        if self.engine.is_playing() {
            info!("Stopping narration on exit");
        }
        self.engine.stop();
    }

    fn dispatch_asset_changes(&mut self) {
        let changed: Vec<SceneId> = self.asset_events.try_iter().collect();
        for id in changed {
            self.notifier.notify(PlayerEvent::Asset(id));
            self.apply(|c, cache| c.asset_changed(id, cache));
        }
    }

    /// Feed one controller transition through, then tell subscribers if the
    /// session or playback state ended up different from before the call.
    fn apply<F>(&mut self, transition: F)
    where
        F: FnOnce(&mut Controller, &AssetCache) -> Vec<Command>,
    {
        let before = (self.controller.session(), self.controller.state().clone());
        let cmds = transition(&mut self.controller, &self.cache);
        self.run(cmds);
        if (self.controller.session(), self.controller.state().clone()) != before {
            self.notifier.notify(PlayerEvent::Session);
        }
    }

    fn run(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            match cmd {
                Command::Stop => self.engine.stop(),
                Command::Fetch(index) => {
                    if self.fetcher.ensure_assets(&self.scenes[index], &mut self.cache) {
                        debug!(in_flight = self.fetcher.in_flight_count(), "Fetch started");
                    }
                }
                Command::Play(index) => self.play_scene(index),
            }
        }
        // Fetch writes `loading` synchronously; forward it before returning.
        self.dispatch_asset_changes();
    }

    fn play_scene(&mut self, index: usize) {
        let id = self.scenes[index].id;
        let Some(audio) = self.cache.get(id).and_then(|a| a.audio.clone()) else {
            self.controller
                .playback_failed(index, "narration is not available".to_string());
            return;
        };
        match self.engine.play(&audio) {
            Ok(_) => self.controller.playback_started(index),
            Err(e) => {
                error!(scene = id, "Audio playback error: {e}");
                self.controller.playback_failed(index, e.to_string());
            }
        }
    }
}
