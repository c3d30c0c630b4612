//! In-memory stand-ins for the transport, shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{
    audio::{
        AudioResolver, AudioSource, CompletionHook, MockAudioResolver, Notifier, ResolvedTrack,
        SessionId, Track, VoicePlayer,
    },
    error::AudioError,
};

/// An RNG that fails the test if anything draws from it
pub struct UntouchableRng;

impl rand::RngCore for UntouchableRng {
    fn next_u32(&mut self) -> u32 {
        panic!("no randomness should be consumed here")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("no randomness should be consumed here")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("no randomness should be consumed here")
    }
}

#[derive(Default)]
struct PlayerState {
    plays: Vec<(SessionId, AudioSource)>,
    joins: Vec<(SessionId, u64)>,
    hooks: HashMap<SessionId, CompletionHook>,
    playing: HashSet<SessionId>,
    stops: usize,
    failing_plays: usize,
    fail_join: bool,
}

/// Player that records calls and keeps completion hooks until told a track ended
#[derive(Default)]
pub struct FakePlayer {
    state: Mutex<PlayerState>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plays(&self) -> Vec<AudioSource> {
        self.state
            .lock()
            .plays
            .iter()
            .map(|(_, source)| source.clone())
            .collect()
    }

    /// Stream URLs of every play, in order
    pub fn played_urls(&self) -> Vec<String> {
        self.plays()
            .into_iter()
            .map(|source| match source {
                AudioSource::Stream { url } => url,
                AudioSource::File(path) => path.display().to_string(),
            })
            .collect()
    }

    pub fn joins(&self) -> Vec<(SessionId, u64)> {
        self.state.lock().joins.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().stops
    }

    /// Make the next `count` calls to `play` fail
    pub fn fail_next_plays(&self, count: usize) {
        self.state.lock().failing_plays = count;
    }

    pub fn fail_joins(&self) {
        self.state.lock().fail_join = true;
    }

    /// Pretend something is playing without a hook (e.g. a foreign source)
    pub fn set_playing(&self, session: SessionId) {
        self.state.lock().playing.insert(session);
    }

    /// Simulate the playing item reaching its end
    pub async fn finish(&self, session: SessionId) {
        let hook = {
            let mut state = self.state.lock();
            state.playing.remove(&session);
            state.hooks.remove(&session)
        };
        if let Some(hook) = hook {
            hook.run().await;
        }
    }
}

#[async_trait]
impl VoicePlayer for FakePlayer {
    async fn join(&self, session: SessionId, voice_channel: u64) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.fail_join {
            return Err(AudioError::JoinFailed {
                channel_id: voice_channel,
                reason: "missing permissions".to_string(),
            });
        }
        state.joins.push((session, voice_channel));
        Ok(())
    }

    async fn is_playing(&self, session: SessionId) -> bool {
        self.state.lock().playing.contains(&session)
    }

    async fn stop(&self, session: SessionId) {
        let hook = {
            let mut state = self.state.lock();
            state.stops += 1;
            state.playing.remove(&session);
            state.hooks.remove(&session)
        };
        if let Some(hook) = hook {
            hook.run().await;
        }
    }

    async fn play(
        &self,
        session: SessionId,
        source: AudioSource,
        on_complete: CompletionHook,
    ) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.failing_plays > 0 {
            state.failing_plays -= 1;
            return Err(AudioError::PlaybackFailed {
                reason: "encoder crashed".to_string(),
            });
        }
        state.plays.push((session, source));
        state.playing.insert(session);
        state.hooks.insert(session, on_complete);
        Ok(())
    }
}

/// Notifier that keeps every line it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    lines: Mutex<Vec<(SessionId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, l)| l.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, session: SessionId, text: &str) {
        self.lines.lock().push((session, text.to_string()));
    }
}

/// Resolver mock that resolves every track to `stream:<track>`, titled after the track
pub fn echo_resolver() -> MockAudioResolver {
    let mut resolver = MockAudioResolver::new();
    resolver
        .expect_resolve()
        .returning(|track| Ok(Some(echoed(track))));
    resolver
}

fn echoed(track: &Track) -> ResolvedTrack {
    ResolvedTrack {
        stream_url: format!("stream:{track}"),
        title: track.to_string(),
    }
}

/// Resolves like [`echo_resolver`], except that the first resolve of one track
/// waits until [`GatedResolver::release`] is called
pub struct GatedResolver {
    track: Track,
    armed: AtomicBool,
    held: Notify,
    gate: Notify,
}

impl GatedResolver {
    pub fn holding(track: &str) -> Self {
        Self {
            track: Track::new(track),
            armed: AtomicBool::new(true),
            held: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Wait until the gated resolve has started
    pub async fn wait_until_held(&self) {
        self.held.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl AudioResolver for GatedResolver {
    async fn resolve(&self, track: &Track) -> Result<Option<ResolvedTrack>, AudioError> {
        if *track == self.track && self.armed.swap(false, Ordering::SeqCst) {
            self.held.notify_one();
            self.gate.notified().await;
        }
        Ok(Some(echoed(track)))
    }

    async fn expand_playlist(&self, _url: &str) -> Result<Vec<Track>, AudioError> {
        Ok(Vec::new())
    }
}
