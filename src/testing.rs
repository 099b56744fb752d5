//! Test doubles for the generation service and the audio platform.

use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use crate::audio::{AudioBackend, DecodedAudio, EndSignal, OutputContext, PlaybackHandle};
use crate::error::{GenerationError, PlaybackError};
use crate::generate::AssetGenerator;

pub fn pcm_silence(samples: usize) -> Vec<u8> {
    vec![0; samples * 2]
}

fn service_error(message: &str) -> GenerationError {
    GenerationError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[derive(Default)]
struct Script {
    image_error: Option<String>,
    narration_error: Option<String>,
    image_calls: usize,
    narration_calls: usize,
}

/// Answers immediately with canned results.
pub struct ScriptedGenerator {
    script: Mutex<Script>,
}

impl ScriptedGenerator {
    pub fn ok() -> Self {
        Self::with(true, true)
    }

    pub fn with(image_ok: bool, narration_ok: bool) -> Self {
        ScriptedGenerator {
            script: Mutex::new(Script {
                image_error: (!image_ok).then(|| "image service unavailable".to_string()),
                narration_error: (!narration_ok).then(|| "speech service unavailable".to_string()),
                ..Default::default()
            }),
        }
    }

    pub fn image_fails(message: &str) -> Self {
        let generator = Self::ok();
        generator.script.lock().unwrap().image_error = Some(message.to_string());
        generator
    }

    pub fn heal(&self) {
        let mut script = self.script.lock().unwrap();
        script.image_error = None;
        script.narration_error = None;
    }

    pub fn image_calls(&self) -> usize {
        self.script.lock().unwrap().image_calls
    }

    pub fn narration_calls(&self) -> usize {
        self.script.lock().unwrap().narration_calls
    }
}

impl AssetGenerator for ScriptedGenerator {
    fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut script = self.script.lock().unwrap();
        script.image_calls += 1;
        match &script.image_error {
            Some(message) => Err(service_error(message)),
            None => Ok(format!("https://images.test/{}.png", prompt.len())),
        }
    }

    fn generate_narration(&self, _text: &str) -> Result<Vec<u8>, GenerationError> {
        let mut script = self.script.lock().unwrap();
        script.narration_calls += 1;
        match &script.narration_error {
            Some(message) => Err(service_error(message)),
            None => Ok(pcm_silence(240)),
        }
    }
}

#[derive(Default)]
struct Gate {
    permits: usize,
    waiting: usize,
}

/// Every request blocks until the test releases a permit for it.
pub struct GatedGenerator {
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedGenerator {
    pub fn new() -> Self {
        GatedGenerator {
            gate: Mutex::new(Gate::default()),
            changed: Condvar::new(),
        }
    }

    pub fn release(&self, permits: usize) {
        self.gate.lock().unwrap().permits += permits;
        self.changed.notify_all();
    }

    /// Wait until `count` requests are blocked on the gate at the same time.
    pub fn wait_for_waiting(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut gate = self.gate.lock().unwrap();
        while gate.waiting < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            gate = self.changed.wait_timeout(gate, remaining).unwrap().0;
        }
        true
    }

    fn pass(&self) {
        let mut gate = self.gate.lock().unwrap();
        gate.waiting += 1;
        self.changed.notify_all();
        while gate.permits == 0 {
            gate = self.changed.wait(gate).unwrap();
        }
        gate.permits -= 1;
        gate.waiting -= 1;
    }
}

impl AssetGenerator for GatedGenerator {
    fn generate_image(&self, prompt: &str) -> Result<String, GenerationError> {
        self.pass();
        Ok(format!("https://images.test/{}.png", prompt.len()))
    }

    fn generate_narration(&self, _text: &str) -> Result<Vec<u8>, GenerationError> {
        self.pass();
        Ok(pcm_silence(240))
    }
}

#[derive(Default)]
struct AudioState {
    opened: usize,
    started: usize,
    stopped: usize,
    max_active: usize,
    fail_start: bool,
    next_id: u64,
    live: HashMap<u64, EndSignal>,
    order: Vec<u64>,
}

impl AudioState {
    fn active(&self) -> usize {
        self.live.len()
    }
}

/// Records handle lifetimes instead of producing sound. Playback only ends
/// when the test calls `finish_latest`.
#[derive(Clone, Default)]
pub struct FakeAudio {
    state: Arc<Mutex<AudioState>>,
}

struct FakeOutput {
    state: Arc<Mutex<AudioState>>,
}

struct FakeHandle {
    id: u64,
    state: Arc<Mutex<AudioState>>,
}

impl FakeAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(&self) -> Box<dyn AudioBackend> {
        Box::new(self.clone())
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.lock().unwrap().fail_start = fail;
    }

    /// Let the most recently started live handle run to its end.
    pub fn finish_latest(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        while let Some(id) = state.order.pop() {
            if let Some(signal) = state.live.remove(&id) {
                signal.fire();
                return true;
            }
        }
        false
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn started(&self) -> usize {
        self.state.lock().unwrap().started
    }

    pub fn stopped(&self) -> usize {
        self.state.lock().unwrap().stopped
    }

    pub fn active(&self) -> usize {
        self.state.lock().unwrap().active()
    }

    pub fn max_active(&self) -> usize {
        self.state.lock().unwrap().max_active
    }
}

impl AudioBackend for FakeAudio {
    fn open_output(&mut self) -> Result<Box<dyn OutputContext>, PlaybackError> {
        self.state.lock().unwrap().opened += 1;
        Ok(Box::new(FakeOutput {
            state: Arc::clone(&self.state),
        }))
    }
}

impl OutputContext for FakeOutput {
    fn start(
        &mut self,
        _audio: DecodedAudio,
        on_end: EndSignal,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_start {
            return Err(PlaybackError::Start("device busy".into()));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.started += 1;
        state.live.insert(id, on_end);
        state.order.push(id);
        state.max_active = state.max_active.max(state.active());
        Ok(Box::new(FakeHandle {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

impl PlaybackHandle for FakeHandle {
    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.live.remove(&self.id).is_some() {
            state.stopped += 1;
        }
    }
}
