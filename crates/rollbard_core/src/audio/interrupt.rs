use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info, warn};

use super::{
    AudioSource, CompletionHook, PlaylistQueue, SessionId, Track, session::Preempted,
};
use crate::{dice::FateAction, error::AudioError, themes::ThemeMap};

/// Session fields a cue overwrote, put back if it never gets to play
#[derive(Debug)]
struct CueUndo {
    cue: Option<u64>,
    interrupted: Option<Track>,
    preempted: Preempted,
}

/// Lets one-off cues (personal themes, the special cue) take over the voice
/// connection and hands it back to the playlist afterwards.
#[derive(Clone)]
pub struct InterruptCoordinator {
    queue: PlaylistQueue,
    themes: Arc<ThemeMap>,
    special_cue: PathBuf,
}

impl InterruptCoordinator {
    pub fn new(queue: PlaylistQueue, themes: Arc<ThemeMap>, special_cue: PathBuf) -> Self {
        Self {
            queue,
            themes,
            special_cue,
        }
    }

    /// Suspend auto-advance and remember the current track, if one is playing
    pub async fn preempt(&self, session: SessionId) -> bool {
        let state = self.queue.store.state(session);
        let mut st = state.lock().await;
        let playing = self.queue.player.is_playing(session).await;
        let preempted = st.preempt(playing);
        if preempted != Preempted::Nothing {
            info!(%session, track = ?st.resume_track(), ?preempted, "playlist interrupted");
        }
        preempted != Preempted::Nothing
    }

    /// Put the interrupted track back at the head of the queue and restart the
    /// playlist if the connection is idle. Does nothing without a prior preempt.
    pub async fn resume(&self, session: SessionId) {
        let recovered = {
            let state = self.queue.store.state(session);
            let mut st = state.lock().await;
            st.take_resume()
        };

        let Some(track) = recovered else {
            return;
        };
        info!(%session, %track, "resuming playlist");

        if !self.queue.player.is_playing(session).await {
            self.queue.play_next(session).await;
        }
    }

    /// Play the roller's theme, or the special cue for an attack, in
    /// `voice_channel`. Problems are reported to the session's text channel.
    pub async fn play_cue(
        &self,
        session: SessionId,
        voice_channel: u64,
        user: u64,
        action: FateAction,
    ) {
        let Some(source) = self.cue_source(session, user, action).await else {
            return;
        };

        let ticket = self.queue.store.next_ticket();
        let undo = {
            let state = self.queue.store.state(session);
            let mut st = state.lock().await;
            let playing = self.queue.player.is_playing(session).await;
            let cue = st.cue;
            let interrupted = st.interrupted.clone();
            let preempted = st.preempt(playing);
            st.cue = Some(ticket);
            CueUndo {
                cue,
                interrupted,
                preempted,
            }
        };

        if let Err(e) = self.queue.player.join(session, voice_channel).await {
            warn!(%session, error = %e, "could not join for cue");
            self.release(session, ticket, undo).await;
            self.queue
                .notifier
                .notify(
                    session,
                    &format!("Não consegui tocar o áudio no canal de voz. Erro: `{e}`"),
                )
                .await;
            return;
        }

        if self.queue.player.is_playing(session).await {
            self.queue.player.stop(session).await;
        }

        let coordinator = self.clone();
        let hook = CompletionHook::new(move || async move {
            coordinator.cue_finished(session, ticket).await;
        });

        debug!(%session, user, ?source, "playing cue");
        if let Err(e) = self.queue.player.play(session, source, hook).await {
            warn!(%session, error = %e, "cue playback failed");
            self.queue
                .notifier
                .notify(
                    session,
                    &format!("Não consegui tocar o áudio no canal de voz. Erro: `{e}`"),
                )
                .await;
            self.cue_finished(session, ticket).await;
        }
    }

    /// Pick what to play: a theme always wins, the special cue only plays for
    /// an attack. Nothing has been touched yet when this returns `None`.
    async fn cue_source(
        &self,
        session: SessionId,
        user: u64,
        action: FateAction,
    ) -> Option<AudioSource> {
        if let Some(theme) = self.themes.get(user) {
            return match self.queue.resolver.resolve(&theme).await {
                Ok(Some(resolved)) => Some(AudioSource::Stream {
                    url: resolved.stream_url,
                }),
                Ok(None) => {
                    self.queue
                        .notifier
                        .notify(session, "Não consegui obter o áudio do tema configurado.")
                        .await;
                    None
                }
                Err(e) => {
                    warn!(%session, user, error = %e, "failed to resolve theme");
                    self.queue
                        .notifier
                        .notify(
                            session,
                            &format!("Não consegui tocar o tema no canal de voz. Erro: `{e}`"),
                        )
                        .await;
                    None
                }
            };
        }

        if action != FateAction::Attack {
            return None;
        }

        if !self.special_cue.is_file() {
            let err = AudioError::AssetMissing {
                path: self
                    .special_cue
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.special_cue.display().to_string()),
            };
            warn!(%session, path = %self.special_cue.display(), error = %err, "special cue missing");
            self.queue.notifier.notify(session, &err.to_string()).await;
            return None;
        }

        Some(AudioSource::File(self.special_cue.clone()))
    }

    /// Completion of the cue started with `ticket`. A cue replaced by a newer
    /// one leaves the resume to its successor.
    async fn cue_finished(&self, session: SessionId, ticket: u64) {
        let recovered = {
            let state = self.queue.store.state(session);
            let mut st = state.lock().await;
            if st.cue != Some(ticket) {
                debug!(%session, ticket, "ignoring completion of a replaced cue");
                return;
            }
            st.cue = None;
            st.take_resume()
        };

        if let Some(track) = recovered {
            info!(%session, %track, "resuming playlist");
        }
        self.queue.play_next(session).await;
    }

    /// Put back what a cue that never got to stop anything overwrote. A cue
    /// still playing from before keeps its claim on the resume.
    async fn release(&self, session: SessionId, ticket: u64, undo: CueUndo) {
        let idle = {
            let state = self.queue.store.state(session);
            let mut st = state.lock().await;
            if st.cue != Some(ticket) {
                return;
            }
            st.cue = undo.cue;
            match undo.preempted {
                // the cancelled start has to be retried
                Preempted::Pending if undo.cue.is_none() => {
                    st.take_resume();
                }
                Preempted::Pending => {}
                Preempted::Playing | Preempted::Nothing => st.interrupted = undo.interrupted,
            }
            st.cue.is_none()
        };

        if idle {
            self.queue.play_next(session).await;
        }
    }
}
