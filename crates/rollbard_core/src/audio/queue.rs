use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{
    AudioResolver, AudioSource, CompletionHook, Notifier, SessionAudioState, SessionId, Track,
    VoicePlayer,
    session::{CurrentTrack, SessionStore},
};
use crate::error::AudioError;

/// Sequential playlist playback for every session.
///
/// All state changes for a session happen under that session's lock. Resolving
/// a track happens with the lock released, and the result is only applied if
/// the session still expects it.
#[derive(Clone)]
pub struct PlaylistQueue {
    pub(crate) store: Arc<SessionStore>,
    pub(crate) resolver: Arc<dyn AudioResolver>,
    pub(crate) player: Arc<dyn VoicePlayer>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl PlaylistQueue {
    pub fn new(
        resolver: Arc<dyn AudioResolver>,
        player: Arc<dyn VoicePlayer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store: Arc::new(SessionStore::default()),
            resolver,
            player,
            notifier,
        }
    }

    /// Copy of a session's current state
    pub async fn snapshot(&self, session: SessionId) -> SessionAudioState {
        self.store.state(session).lock().await.clone()
    }

    /// Replace the session's state with a fresh queue. Pending resumes are
    /// discarded; whatever is playing keeps playing.
    pub async fn load_playlist(&self, session: SessionId, tracks: Vec<Track>) {
        let count = tracks.len();
        let state = self.store.state(session);
        *state.lock().await = SessionAudioState::with_queue(tracks);
        info!(%session, count, "playlist loaded");
    }

    /// Start the next queued track.
    ///
    /// Returns false without doing anything when the queue is empty, auto-advance
    /// is suspended, a cue owns the connection or something is already playing.
    /// The same checks run again once the track is resolved; if they fail then,
    /// the track goes back to the head of the queue. Tracks that fail to resolve
    /// or play are reported and skipped.
    pub async fn play_next(&self, session: SessionId) -> bool {
        let state = self.store.state(session);

        loop {
            let (track, ticket) = {
                let mut st = state.lock().await;
                if st.queue.is_empty()
                    || st.is_suspended()
                    || st.cue.is_some()
                    || st.current.is_some()
                {
                    return false;
                }
                if self.player.is_playing(session).await {
                    return false;
                }
                let Some(track) = st.queue.pop_front() else {
                    return false;
                };
                let ticket = self.store.next_ticket();
                st.current = Some(CurrentTrack {
                    track: track.clone(),
                    ticket,
                    started: false,
                });
                (track, ticket)
            };

            debug!(%session, %track, ticket, "resolving next track");
            let failure = match self.resolver.resolve(&track).await {
                Ok(Some(resolved)) => {
                    let mut st = state.lock().await;
                    if !st.holds_ticket(ticket) {
                        debug!(%session, %track, "session changed while resolving");
                        return false;
                    }
                    if st.cue.is_some()
                        || st.is_suspended()
                        || self.player.is_playing(session).await
                    {
                        debug!(%session, %track, "voice connection taken while resolving");
                        st.current = None;
                        st.queue.push_front(track);
                        return false;
                    }

                    let hook = self.completion_hook(session, ticket);
                    let source = AudioSource::Stream {
                        url: resolved.stream_url,
                    };
                    match self.player.play(session, source, hook).await {
                        Ok(()) => {
                            if let Some(current) = st.current.as_mut() {
                                current.started = true;
                            }
                            drop(st);
                            info!(%session, title = %resolved.title, "now playing");
                            self.notifier
                                .notify(session, &format!("Tocando agora: **{}**", resolved.title))
                                .await;
                            return true;
                        }
                        Err(e) => {
                            warn!(%session, %track, error = %e, "failed to start track");
                            format!("Falha ao tocar faixa da playlist: `{e}`")
                        }
                    }
                }
                Ok(None) => {
                    warn!(%session, %track, "track has no playable stream");
                    "Não consegui obter o áudio da próxima faixa.".to_string()
                }
                Err(e) => {
                    warn!(%session, %track, error = %e, "failed to resolve track");
                    format!("Falha ao tocar faixa da playlist: `{e}`")
                }
            };

            let still_ours = {
                let mut st = state.lock().await;
                let ours = st.holds_ticket(ticket);
                if ours {
                    st.current = None;
                }
                ours
            };
            self.notifier.notify(session, &failure).await;
            if !still_ours {
                return false;
            }
        }
    }

    /// Completion of the track started with `ticket`
    pub(crate) async fn on_track_finished(&self, session: SessionId, ticket: u64) {
        let advance = {
            let state = self.store.state(session);
            let mut st = state.lock().await;
            if !st.holds_ticket(ticket) {
                debug!(%session, ticket, "ignoring completion of a replaced track");
                return;
            }
            if st.is_suspended() {
                debug!(%session, ticket, "track ended while suspended");
                return;
            }
            st.current = None;
            !st.queue.is_empty()
        };

        if advance {
            self.play_next(session).await;
        } else {
            debug!(%session, "playlist finished");
        }
    }

    fn completion_hook(&self, session: SessionId, ticket: u64) -> CompletionHook {
        let queue = self.clone();
        CompletionHook::new(move || async move {
            queue.on_track_finished(session, ticket).await;
        })
    }

    /// Join `voice_channel`, load the playlist at `playlist_url` and start it.
    /// Problems are reported to the session's text channel.
    pub async fn start(&self, session: SessionId, voice_channel: u64, playlist_url: &str) {
        if let Err(e) = self.try_start(session, voice_channel, playlist_url).await {
            error!(%session, error = %e, "failed to start playlist");
            self.notifier
                .notify(session, &format!("Falha no comando `!luta`: `{e}`"))
                .await;
        }
    }

    async fn try_start(
        &self,
        session: SessionId,
        voice_channel: u64,
        playlist_url: &str,
    ) -> Result<(), AudioError> {
        self.player.join(session, voice_channel).await?;

        let tracks = self.resolver.expand_playlist(playlist_url).await?;
        if tracks.is_empty() {
            warn!(%session, playlist_url, "playlist is empty");
            self.notifier
                .notify(session, "Não consegui carregar a playlist `!luta`.")
                .await;
            return Ok(());
        }

        let count = tracks.len();
        self.load_playlist(session, tracks).await;
        if self.player.is_playing(session).await {
            self.player.stop(session).await;
        }

        self.notifier
            .notify(
                session,
                &format!("Playlist de luta carregada com **{count}** faixas."),
            )
            .await;
        self.play_next(session).await;
        Ok(())
    }
}
