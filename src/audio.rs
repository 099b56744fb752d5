use std::{
    io::Cursor,
    sync::mpsc,
    time::{Duration, Instant},
};

use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, buffer::SamplesBuffer};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, info, warn};

use crate::error::{AudioError, DecodeError, PlaybackError};

/// Raw narration without a container is 16-bit little-endian mono PCM.
pub const PCM_SAMPLE_RATE: u32 = 24_000;
pub const PCM_CHANNELS: u16 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> Duration {
        if self.channels == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

// --- Decoding ---

fn sniff_container(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WAVE"[..]) {
        Some("wav")
    } else if bytes.starts_with(b"ID3") {
        Some("mp3")
    } else if bytes.starts_with(b"fLaC") {
        Some("flac")
    } else if bytes.starts_with(b"OggS") {
        Some("ogg")
    } else if bytes.get(4..8) == Some(&b"ftyp"[..]) {
        Some("m4a")
    } else {
        None
    }
}

/// Decode a narration payload into interleaved f32 samples.
pub fn decode_audio(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    match sniff_container(bytes) {
        Some(ext) => decode_container(bytes, ext),
        None => decode_pcm(bytes),
    }
}

fn decode_pcm(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::Malformed(format!(
            "{} bytes is not a whole number of 16-bit samples",
            bytes.len()
        )));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();
    Ok(DecodedAudio {
        samples,
        channels: PCM_CHANNELS,
        sample_rate: PCM_SAMPLE_RATE,
    })
}

fn decode_container(bytes: &[u8], ext: &str) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(ext);

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::Malformed("no audio track".into()))?;
    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut channels = 0u16;
    let mut sample_rate = 0u32;
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!("Skipping undecodable packet: {msg}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;
        sample_rate = spec.rate;
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(DecodeError::Malformed(format!("{ext} stream has no audio frames")));
    }
    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

// --- Platform output ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackToken(pub u64);

/// Fired once when a playback handle runs out of audio.
pub struct EndSignal {
    tx: mpsc::Sender<PlaybackToken>,
    token: PlaybackToken,
}

impl EndSignal {
    pub fn token(&self) -> PlaybackToken {
        self.token
    }

    pub fn fire(self) {
        let _ = self.tx.send(self.token);
    }
}

pub trait PlaybackHandle {
    fn stop(&mut self);
}

/// A live audio output that decoded buffers can be played through.
pub trait OutputContext {
    fn start(
        &mut self,
        audio: DecodedAudio,
        on_end: EndSignal,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

pub trait AudioBackend {
    fn open_output(&mut self) -> Result<Box<dyn OutputContext>, PlaybackError>;
}

/// Source wrapper that fires the end signal when the inner source is exhausted.
struct EndNotify<S> {
    inner: S,
    on_end: Option<EndSignal>,
}

impl<S> EndNotify<S>
where
    S: Source<Item = f32>,
{
    fn new(source: S, on_end: EndSignal) -> Self {
        EndNotify {
            inner: source,
            on_end: Some(on_end),
        }
    }
}

impl<S> Iterator for EndNotify<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next();
        if sample.is_none() {
            if let Some(signal) = self.on_end.take() {
                signal.fire();
            }
        }
        sample
    }
}

impl<S> Source for EndNotify<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
        self.inner.try_seek(pos)
    }
}

/// Default-device output through rodio.
pub struct RodioBackend;

struct RodioOutput {
    stream: OutputStream,
}

struct RodioHandle {
    sink: Sink,
}

impl AudioBackend for RodioBackend {
    fn open_output(&mut self) -> Result<Box<dyn OutputContext>, PlaybackError> {
        let stream = OutputStreamBuilder::from_default_device()
            .map_err(|e| PlaybackError::OutputInit(e.to_string()))?
            .open_stream_or_fallback()
            .map_err(|e| PlaybackError::OutputInit(e.to_string()))?;
        Ok(Box::new(RodioOutput { stream }))
    }
}

impl OutputContext for RodioOutput {
    fn start(
        &mut self,
        audio: DecodedAudio,
        on_end: EndSignal,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        if audio.channels == 0 || audio.sample_rate == 0 {
            return Err(PlaybackError::Start("buffer has no channels".into()));
        }
        debug!("Queueing {:?} on the default output", on_end.token());
        let sink = Sink::connect_new(self.stream.mixer());
        let source = SamplesBuffer::new(audio.channels, audio.sample_rate, audio.samples);
        sink.append(EndNotify::new(source, on_end));
        Ok(Box::new(RodioHandle { sink }))
    }
}

impl PlaybackHandle for RodioHandle {
    fn stop(&mut self) {
        self.sink.stop();
    }
}

// --- Engine ---

struct ActivePlayback {
    token: PlaybackToken,
    handle: Box<dyn PlaybackHandle>,
    started: Instant,
    duration: Duration,
}

/// Plays narration through one shared output, one handle at a time.
///
/// The output is opened on the first `play` and reused afterwards. Starting
/// new playback always stops the previous handle first, and only the end of
/// the current handle is ever reported by `poll_ended`.
pub struct PlaybackEngine {
    backend: Box<dyn AudioBackend>,
    output: Option<Box<dyn OutputContext>>,
    active: Option<ActivePlayback>,
    next_token: u64,
    ended_tx: mpsc::Sender<PlaybackToken>,
    ended_rx: mpsc::Receiver<PlaybackToken>,
}

impl PlaybackEngine {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        let (ended_tx, ended_rx) = mpsc::channel();
        PlaybackEngine {
            backend,
            output: None,
            active: None,
            next_token: 0,
            ended_tx,
            ended_rx,
        }
    }

    pub fn play(&mut self, payload: &[u8]) -> Result<PlaybackToken, AudioError> {
        self.stop();

        let audio = decode_audio(payload)?;
        let duration = audio.duration();

        let mut output = match self.output.take() {
            Some(output) => output,
            None => {
                let output = self.backend.open_output()?;
                info!("Opened audio output");
                output
            }
        };

        self.next_token += 1;
        let token = PlaybackToken(self.next_token);
        let signal = EndSignal {
            tx: self.ended_tx.clone(),
            token,
        };
        let started = output.start(audio, signal);
        self.output = Some(output);
        let handle = started?;

        info!("Playing narration {:?} ({:.1}s)", token, duration.as_secs_f64());
        self.active = Some(ActivePlayback {
            token,
            handle,
            started: Instant::now(),
            duration,
        });
        Ok(token)
    }

    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!("Stopping narration {:?}", active.token);
            active.handle.stop();
        }
    }

    /// The end of the current playback, if it has finished since the last poll.
    pub fn poll_ended(&mut self) -> Option<PlaybackToken> {
        let mut ended = None;
        while let Ok(token) = self.ended_rx.try_recv() {
            if self.active.as_ref().map(|a| a.token) == Some(token) {
                self.active = None;
                ended = Some(token);
            } else {
                debug!("Dropping stale end of {:?}", token);
            }
        }
        ended
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    #[cfg(test)]
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Elapsed and total time of the current narration.
    pub fn progress(&self) -> Option<(Duration, Duration)> {
        self.active
            .as_ref()
            .map(|a| (a.started.elapsed().min(a.duration), a.duration))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testing::{FakeAudio, pcm_silence};

    fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn raw_pcm_decodes_at_tts_rate() {
        let audio = decode_audio(&[0x00, 0x40, 0x00, 0xC0]).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, PCM_SAMPLE_RATE);
        assert_eq!(audio.samples, vec![0.5, -0.5]);
    }

    #[test]
    fn pcm_duration_follows_sample_count() {
        let audio = decode_audio(&pcm_silence(PCM_SAMPLE_RATE as usize)).unwrap();
        assert_eq!(audio.duration(), Duration::from_secs(1));
    }

    #[test]
    fn empty_and_odd_payloads_are_rejected() {
        assert!(matches!(decode_audio(&[]), Err(DecodeError::Empty)));
        assert!(matches!(decode_audio(&[1, 2, 3]), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn wav_container_is_decoded() {
        let samples: Vec<i16> = (0..1600).map(|i| ((i % 100) * 200) as i16).collect();
        let audio = decode_audio(&wav_bytes(&samples, 16_000)).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples.len(), samples.len());
    }

    #[test]
    fn truncated_container_is_an_error() {
        let bytes = b"RIFF\x00\x00\x00\x00WAVE".to_vec();
        assert!(decode_audio(&bytes).is_err());
    }

    #[test]
    fn output_is_opened_once_and_reused() {
        let fake = FakeAudio::new();
        let mut engine = PlaybackEngine::new(fake.backend());
        assert!(!engine.has_output());

        engine.play(&pcm_silence(10)).unwrap();
        engine.play(&pcm_silence(10)).unwrap();
        engine.play(&pcm_silence(10)).unwrap();
        assert_eq!(fake.opened(), 1);
        assert_eq!(fake.started(), 3);
    }

    #[test]
    fn decode_failure_does_not_start_or_open() {
        let fake = FakeAudio::new();
        let mut engine = PlaybackEngine::new(fake.backend());
        let err = engine.play(&[7]).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)));
        assert!(!engine.is_playing());
        assert_eq!(fake.started(), 0);
        assert_eq!(engine.poll_ended(), None);
    }

    #[test]
    fn start_failure_is_reported_and_output_kept() {
        let fake = FakeAudio::new();
        fake.fail_start(true);
        let mut engine = PlaybackEngine::new(fake.backend());
        let err = engine.play(&pcm_silence(10)).unwrap_err();
        assert!(matches!(err, AudioError::Playback(PlaybackError::Start(_))));
        assert!(!engine.is_playing());
        assert!(engine.has_output());

        fake.fail_start(false);
        engine.play(&pcm_silence(10)).unwrap();
        assert_eq!(fake.opened(), 1);
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let fake = FakeAudio::new();
        let mut engine = PlaybackEngine::new(fake.backend());
        engine.stop();
        engine.stop();
        assert_eq!(fake.stopped(), 0);
    }

    #[test]
    fn only_the_current_end_is_reported() {
        let fake = FakeAudio::new();
        let mut engine = PlaybackEngine::new(fake.backend());

        let first = engine.play(&pcm_silence(10)).unwrap();
        // The first handle finishes just as it is replaced.
        fake.finish_latest();
        let second = engine.play(&pcm_silence(10)).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.poll_ended(), None);

        fake.finish_latest();
        assert_eq!(engine.poll_ended(), Some(second));
        assert!(!engine.is_playing());
        assert_eq!(engine.poll_ended(), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn never_more_than_one_active_handle(ops in prop::collection::vec(0u8..3, 1..40)) {
            let fake = FakeAudio::new();
            let mut engine = PlaybackEngine::new(fake.backend());
            for op in ops {
                match op {
                    0 => { let _ = engine.play(&pcm_silence(4)); }
                    1 => engine.stop(),
                    _ => { fake.finish_latest(); let _ = engine.poll_ended(); }
                }
                prop_assert!(fake.active() <= 1);
            }
            prop_assert!(fake.max_active() <= 1);
        }
    }
}
