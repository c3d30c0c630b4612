//! songbird backed [`VoicePlayer`].
//!
//! One track handle per guild: starting a track stops whatever the guild was
//! playing before. Completion hooks are relayed from songbird's track events
//! back onto the runtime that created them.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use rollbard_core::{AudioError, AudioSource, CompletionHook, SessionId, VoicePlayer};
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    Event, EventContext, Songbird, TrackEvent,
    input::{File, HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
};
use tracing::{debug, info, warn};

/// The live handle of each session
#[derive(Debug)]
struct HandleSlots<H> {
    slots: DashMap<SessionId, H>,
}

impl<H: Clone> HandleSlots<H> {
    fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Make `handle` the session's live handle, returning the one it replaced
    fn install(&self, session: SessionId, handle: H) -> Option<H> {
        self.slots.insert(session, handle)
    }

    fn take(&self, session: SessionId) -> Option<H> {
        self.slots.remove(&session).map(|(_, handle)| handle)
    }

    fn current(&self, session: SessionId) -> Option<H> {
        self.slots.get(&session).map(|handle| handle.clone())
    }
}

pub struct SongbirdPlayer {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    tracks: HandleSlots<TrackHandle>,
}

impl SongbirdPlayer {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            tracks: HandleSlots::new(),
        }
    }

    fn halt(session: SessionId, handle: &TrackHandle) {
        if let Err(e) = handle.stop() {
            debug!(%session, error = ?e, "track already finished");
        }
    }

    fn input(&self, source: AudioSource) -> Input {
        match source {
            AudioSource::Stream { url } => HttpRequest::new(self.http.clone(), url).into(),
            AudioSource::File(path) => File::new(path).into(),
        }
    }
}

#[async_trait]
impl VoicePlayer for SongbirdPlayer {
    async fn join(&self, session: SessionId, voice_channel: u64) -> Result<(), AudioError> {
        let guild = GuildId::new(session.0);
        let channel = ChannelId::new(voice_channel);

        self.manager
            .join(guild, channel)
            .await
            .map(|_call| info!(%session, voice_channel, "voice connected"))
            .map_err(|e| AudioError::JoinFailed {
                channel_id: voice_channel,
                reason: e.to_string(),
            })
    }

    async fn is_playing(&self, session: SessionId) -> bool {
        let Some(handle) = self.tracks.current(session) else {
            return false;
        };

        match handle.get_info().await {
            Ok(state) => matches!(state.playing, PlayMode::Play | PlayMode::Pause),
            Err(_) => false,
        }
    }

    async fn stop(&self, session: SessionId) {
        if let Some(handle) = self.tracks.take(session) {
            Self::halt(session, &handle);
        }
    }

    async fn play(
        &self,
        session: SessionId,
        source: AudioSource,
        on_complete: CompletionHook,
    ) -> Result<(), AudioError> {
        let call = self
            .manager
            .get(GuildId::new(session.0))
            .ok_or(AudioError::NotConnected { session: session.0 })?;

        if let Some(previous) = self.tracks.take(session) {
            debug!(%session, "replacing the playing track");
            Self::halt(session, &previous);
        }

        debug!(%session, ?source, "starting playback");
        let handle = call.lock().await.play_input(self.input(source));

        let relay = CompletionRelay::new(session, on_complete);
        for event in [TrackEvent::End, TrackEvent::Error] {
            if let Err(e) = handle.add_event(Event::Track(event), relay.clone()) {
                handle.stop().ok();
                return Err(AudioError::PlaybackFailed {
                    reason: e.to_string(),
                });
            }
        }

        if let Some(stale) = self.tracks.install(session, handle) {
            Self::halt(session, &stale);
        }
        Ok(())
    }
}

/// Fires the hook on whichever of end or error comes first
#[derive(Clone)]
struct CompletionRelay {
    session: SessionId,
    hook: Arc<Mutex<Option<CompletionHook>>>,
}

impl CompletionRelay {
    fn new(session: SessionId, hook: CompletionHook) -> Self {
        Self {
            session,
            hook: Arc::new(Mutex::new(Some(hook))),
        }
    }
}

#[async_trait]
impl songbird::EventHandler for CompletionRelay {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                if let PlayMode::Errored(e) = &state.playing {
                    warn!(session = %self.session, error = ?e, "track errored");
                }
            }
        }

        if let Some(hook) = self.hook.lock().take() {
            hook.fire();
        }
        None
    }
}
