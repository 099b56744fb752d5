use tracing::debug;

use crate::assets::{AssetCache, AssetStatus};
use crate::catalog::{Scene, SceneId, index_of};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneFault {
    /// Image or narration generation failed; retry fetches again.
    Generation(String),
    /// Narration could not be decoded or started; retry plays again.
    Playback(String),
}

impl SceneFault {
    pub fn message(&self) -> &str {
        match self {
            SceneFault::Generation(m) | SceneFault::Playback(m) => m,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    ReadyPaused,
    Playing,
    Error(SceneFault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub current_index: usize,
    pub autoplay: bool,
    pub is_playing: bool,
}

/// Side effects requested by the controller, executed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stop,
    Fetch(usize),
    Play(usize),
}

/// Autoplay state machine. It never touches the network or the audio device;
/// every transition returns the commands the caller must carry out.
pub struct Controller {
    scenes: &'static [Scene],
    session: Session,
    state: PlaybackState,
}

impl Controller {
    pub fn new(scenes: &'static [Scene]) -> Self {
        Controller {
            scenes,
            session: Session {
                current_index: 0,
                autoplay: false,
                is_playing: false,
            },
            state: PlaybackState::Idle,
        }
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_started(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    pub fn current_scene(&self) -> &'static Scene {
        &self.scenes[self.session.current_index]
    }

    pub fn start(&mut self, cache: &AssetCache) -> Vec<Command> {
        let mut cmds = Vec::new();
        if !self.is_started() {
            self.enter(self.session.current_index, cache, &mut cmds);
        }
        cmds
    }

    /// Manual navigation. Always wins over autoplay: any narration for the
    /// scene being left is stopped first.
    pub fn select(&mut self, index: usize, cache: &AssetCache) -> Vec<Command> {
        let mut cmds = Vec::new();
        if index >= self.scenes.len() {
            return cmds;
        }
        if self.is_started() && index == self.session.current_index {
            return cmds;
        }
        self.halt(&mut cmds);
        self.enter(index, cache, &mut cmds);
        cmds
    }

    pub fn next(&mut self, cache: &AssetCache) -> Vec<Command> {
        let index = self.session.current_index + 1;
        if index < self.scenes.len() {
            self.select(index, cache)
        } else {
            Vec::new()
        }
    }

    pub fn prev(&mut self, cache: &AssetCache) -> Vec<Command> {
        match self.session.current_index.checked_sub(1) {
            Some(index) => self.select(index, cache),
            None => Vec::new(),
        }
    }

    pub fn toggle_autoplay(&mut self, cache: &AssetCache) -> Vec<Command> {
        let mut cmds = Vec::new();
        self.session.autoplay = !self.session.autoplay;
        debug!(autoplay = self.session.autoplay, "autoplay toggled");

        if !self.is_started() {
            self.enter(self.session.current_index, cache, &mut cmds);
        } else if self.session.autoplay {
            if self.state == PlaybackState::ReadyPaused {
                cmds.push(Command::Play(self.session.current_index));
            }
        } else if self.session.is_playing {
            self.halt(&mut cmds);
            self.state = PlaybackState::ReadyPaused;
        }
        cmds
    }

    pub fn play(&mut self) -> Vec<Command> {
        match self.state {
            PlaybackState::ReadyPaused | PlaybackState::Error(SceneFault::Playback(_)) => {
                vec![Command::Play(self.session.current_index)]
            }
            _ => Vec::new(),
        }
    }

    pub fn retry(&mut self) -> Vec<Command> {
        match &self.state {
            PlaybackState::Error(SceneFault::Generation(_)) => {
                self.state = PlaybackState::Loading;
                vec![Command::Fetch(self.session.current_index)]
            }
            PlaybackState::Error(SceneFault::Playback(_)) => {
                self.state = PlaybackState::ReadyPaused;
                vec![Command::Play(self.session.current_index)]
            }
            _ => Vec::new(),
        }
    }

    /// React to a cache change. Changes for scenes other than the current one
    /// are late results and leave the session alone.
    pub fn asset_changed(&mut self, id: SceneId, cache: &AssetCache) -> Vec<Command> {
        let mut cmds = Vec::new();
        if !self.is_started() || index_of(self.scenes, id) != Some(self.session.current_index) {
            return cmds;
        }
        if self.state != PlaybackState::Loading {
            return cmds;
        }
        if let Some(asset) = cache.get(id) {
            match asset.status() {
                AssetStatus::Ready => self.ready(&mut cmds),
                AssetStatus::Failed => {
                    let message = asset.error.clone().unwrap_or_default();
                    self.state = PlaybackState::Error(SceneFault::Generation(message));
                }
                AssetStatus::Loading => {}
            }
        }
        cmds
    }

    pub fn playback_started(&mut self, index: usize) {
        if index == self.session.current_index {
            self.state = PlaybackState::Playing;
            self.session.is_playing = true;
        }
    }

    /// Decode or start failures stop here; autoplay does not skip ahead.
    pub fn playback_failed(&mut self, index: usize, message: String) {
        if index == self.session.current_index {
            self.session.is_playing = false;
            self.state = PlaybackState::Error(SceneFault::Playback(message));
        }
    }

    pub fn playback_ended(&mut self, cache: &AssetCache) -> Vec<Command> {
        let mut cmds = Vec::new();
        if self.state != PlaybackState::Playing {
            return cmds;
        }
        self.session.is_playing = false;
        self.state = PlaybackState::ReadyPaused;

        if self.session.autoplay {
            let next = self.session.current_index + 1;
            if next < self.scenes.len() {
                self.enter(next, cache, &mut cmds);
            } else {
                debug!("last scene finished, autoplay off");
                self.session.autoplay = false;
            }
        }
        cmds
    }

    fn halt(&mut self, cmds: &mut Vec<Command>) {
        if self.session.is_playing {
            cmds.push(Command::Stop);
            self.session.is_playing = false;
        }
    }

    fn enter(&mut self, index: usize, cache: &AssetCache, cmds: &mut Vec<Command>) {
        self.session.current_index = index;
        let id = self.scenes[index].id;
        match cache.status(id) {
            Some(AssetStatus::Ready) => self.ready(cmds),
            _ => {
                self.state = PlaybackState::Loading;
                cmds.push(Command::Fetch(index));
            }
        }
        debug!(index, state = ?self.state, "entered scene");
    }

    fn ready(&mut self, cmds: &mut Vec<Command>) {
        self.state = PlaybackState::ReadyPaused;
        if self.session.autoplay {
            cmds.push(Command::Play(self.session.current_index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::GeneratedAsset;
    use crate::catalog::SCENES;

    fn ready(cache: &mut AssetCache, index: usize) {
        cache.set(SCENES[index].id, GeneratedAsset::ready("u".into(), vec![0, 0]));
    }

    #[test]
    fn starts_idle_and_loads_first_scene() {
        let cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        assert_eq!(ctl.state(), &PlaybackState::Idle);
        assert_eq!(ctl.start(&cache), vec![Command::Fetch(0)]);
        assert_eq!(ctl.state(), &PlaybackState::Loading);
    }

    #[test]
    fn ready_asset_waits_for_play_without_autoplay() {
        let mut cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        ready(&mut cache, 0);
        assert!(ctl.asset_changed(SCENES[0].id, &cache).is_empty());
        assert_eq!(ctl.state(), &PlaybackState::ReadyPaused);
        assert_eq!(ctl.play(), vec![Command::Play(0)]);
    }

    #[test]
    fn autoplay_plays_as_soon_as_ready() {
        let mut cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        assert_eq!(ctl.toggle_autoplay(&cache), vec![Command::Fetch(0)]);
        ready(&mut cache, 0);
        assert_eq!(ctl.asset_changed(SCENES[0].id, &cache), vec![Command::Play(0)]);
        ctl.playback_started(0);
        assert_eq!(ctl.state(), &PlaybackState::Playing);
        assert!(ctl.session().is_playing);
    }

    #[test]
    fn generation_failure_enters_error_and_retry_refetches() {
        let mut cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        cache.set(SCENES[0].id, GeneratedAsset::failed("quota"));
        ctl.asset_changed(SCENES[0].id, &cache);
        assert_eq!(
            ctl.state(),
            &PlaybackState::Error(SceneFault::Generation("quota".into()))
        );
        assert_eq!(ctl.retry(), vec![Command::Fetch(0)]);
        assert_eq!(ctl.state(), &PlaybackState::Loading);
    }

    #[test]
    fn playback_failure_does_not_advance() {
        let mut cache = AssetCache::new();
        ready(&mut cache, 0);
        let mut ctl = Controller::new(SCENES);
        ctl.toggle_autoplay(&cache);
        ctl.playback_failed(0, "bad bytes".into());
        assert_eq!(ctl.session().current_index, 0);
        assert!(matches!(ctl.state(), PlaybackState::Error(SceneFault::Playback(_))));
        assert!(ctl.playback_ended(&cache).is_empty());
        assert_eq!(ctl.session().current_index, 0);
        assert_eq!(ctl.retry(), vec![Command::Play(0)]);
    }

    #[test]
    fn navigation_stops_current_narration_first() {
        let mut cache = AssetCache::new();
        ready(&mut cache, 0);
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        ctl.play();
        ctl.playback_started(0);

        assert_eq!(ctl.next(&cache), vec![Command::Stop, Command::Fetch(1)]);
        assert!(!ctl.session().is_playing);
        assert_eq!(ctl.session().current_index, 1);
    }

    #[test]
    fn navigating_to_cached_scene_is_ready_immediately() {
        let mut cache = AssetCache::new();
        ready(&mut cache, 3);
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        assert!(ctl.select(3, &cache).is_empty());
        assert_eq!(ctl.state(), &PlaybackState::ReadyPaused);
    }

    #[test]
    fn navigation_is_clamped_to_catalog() {
        let cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        assert!(ctl.prev(&cache).is_empty());
        assert!(ctl.select(SCENES.len(), &cache).is_empty());
        ctl.select(SCENES.len() - 1, &cache);
        assert!(ctl.next(&cache).is_empty());
        assert_eq!(ctl.session().current_index, SCENES.len() - 1);
    }

    #[test]
    fn late_asset_for_other_scene_is_ignored() {
        let mut cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        ctl.next(&cache);
        ready(&mut cache, 0);
        assert!(ctl.asset_changed(SCENES[0].id, &cache).is_empty());
        assert_eq!(ctl.session().current_index, 1);
        assert_eq!(ctl.state(), &PlaybackState::Loading);
    }

    #[test]
    fn turning_autoplay_off_stops_narration() {
        let mut cache = AssetCache::new();
        ready(&mut cache, 0);
        let mut ctl = Controller::new(SCENES);
        ctl.toggle_autoplay(&cache);
        ctl.playback_started(0);
        assert_eq!(ctl.toggle_autoplay(&cache), vec![Command::Stop]);
        assert_eq!(ctl.state(), &PlaybackState::ReadyPaused);
        assert!(!ctl.session().autoplay);
    }

    #[test]
    fn manual_play_does_not_advance_on_end() {
        let mut cache = AssetCache::new();
        ready(&mut cache, 0);
        let mut ctl = Controller::new(SCENES);
        ctl.start(&cache);
        ctl.play();
        ctl.playback_started(0);
        assert!(ctl.playback_ended(&cache).is_empty());
        assert_eq!(ctl.session().current_index, 0);
        assert_eq!(ctl.state(), &PlaybackState::ReadyPaused);
    }

    #[test]
    fn end_without_active_narration_is_ignored() {
        let mut cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        ctl.toggle_autoplay(&cache);
        assert!(ctl.playback_ended(&cache).is_empty());
        assert_eq!(ctl.state(), &PlaybackState::Loading);

        ready(&mut cache, 0);
        ctl.asset_changed(SCENES[0].id, &cache);
        ctl.playback_started(0);
        ctl.next(&cache);
        // The scene-0 end arrives after navigation; scene 1 is still loading.
        assert!(ctl.playback_ended(&cache).is_empty());
        assert_eq!(ctl.session().current_index, 1);
        assert_eq!(ctl.state(), &PlaybackState::Loading);
    }

    #[test]
    fn autoplay_runs_to_the_end_and_switches_off() {
        let mut cache = AssetCache::new();
        let mut ctl = Controller::new(SCENES);
        let mut advances = 0;
        let mut cmds = ctl.toggle_autoplay(&cache);

        loop {
            let index = ctl.session().current_index;
            assert!(index < SCENES.len());
            assert_eq!(cmds, vec![Command::Fetch(index)]);
            ready(&mut cache, index);
            assert_eq!(ctl.asset_changed(SCENES[index].id, &cache), vec![Command::Play(index)]);
            ctl.playback_started(index);

            cmds = ctl.playback_ended(&cache);
            if ctl.session().current_index == index {
                break;
            }
            advances += 1;
        }

        assert_eq!(advances, SCENES.len() - 1);
        assert_eq!(ctl.session().current_index, SCENES.len() - 1);
        assert!(!ctl.session().autoplay);
        assert_eq!(ctl.state(), &PlaybackState::ReadyPaused);
    }
}
