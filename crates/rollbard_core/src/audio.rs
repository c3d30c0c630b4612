//! Voice playback: the per-session playlist queue, one-off cue interruptions and
//! the traits the transport implements to actually resolve and play audio.

use std::{fmt, future::Future, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use futures::{FutureExt, future::BoxFuture};
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{dice::FateAction, error::AudioError};

mod interrupt;
mod queue;
mod session;

pub use interrupt::InterruptCoordinator;
pub use queue::PlaylistQueue;
pub use session::SessionAudioState;

/// Key for independent audio state, one per guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a playable item (usually a URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track(String);

impl Track {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A track resolved to something the player can stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub stream_url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Stream { url: String },
    File(PathBuf),
}

/// Turns links into streams. Implementations may block on network I/O.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioResolver: Send + Sync {
    /// Resolve one track; `Ok(None)` means the item has no playable stream
    async fn resolve(&self, track: &Track) -> Result<Option<ResolvedTrack>, AudioError>;

    /// List the entries of a playlist link, in order
    async fn expand_playlist(&self, url: &str) -> Result<Vec<Track>, AudioError>;
}

/// The voice connection of each session
#[async_trait]
pub trait VoicePlayer: Send + Sync {
    /// Connect to a voice channel, or move there if already connected elsewhere
    async fn join(&self, session: SessionId, voice_channel: u64) -> Result<(), AudioError>;

    async fn is_playing(&self, session: SessionId) -> bool;

    /// Stop whatever is playing. The stopped item's completion hook still fires.
    async fn stop(&self, session: SessionId);

    /// Start playing `source`, replacing nothing; `on_complete` fires once it ends
    async fn play(
        &self,
        session: SessionId,
        source: AudioSource,
        on_complete: CompletionHook,
    ) -> Result<(), AudioError>;
}

/// Posts status lines to the text channel bound to a session
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, session: SessionId, text: &str);
}

/// Callback run when a playing item finishes or is stopped.
///
/// Players report completion from their own tasks; [`CompletionHook::fire`]
/// hands the callback back to the runtime the hook was created on.
pub struct CompletionHook {
    callback: Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
    runtime: Option<Handle>,
}

impl CompletionHook {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            callback: Box::new(move || callback().boxed()),
            runtime: Handle::try_current().ok(),
        }
    }

    /// A hook that does nothing
    pub fn noop() -> Self {
        Self::new(|| async {})
    }

    /// Run the callback to completion in the current task
    pub async fn run(self) {
        (self.callback)().await
    }

    /// Schedule the callback without waiting for it
    pub fn fire(self) -> Option<JoinHandle<()>> {
        let runtime = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());

        match runtime {
            Some(runtime) => Some(runtime.spawn(self.run())),
            None => {
                tracing::warn!("completion hook dropped: no tokio runtime available");
                None
            }
        }
    }
}

impl fmt::Debug for CompletionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHook")
            .field("has_runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Audio work requested by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEffect {
    /// Load the fight playlist and start it in this voice channel
    StartPlaylist { voice_channel: u64 },
    /// Play the roller's theme (or the special cue) for a `++++`
    Cue {
        action: FateAction,
        voice_channel: u64,
    },
}

/// Owns the queue and the interrupt coordinator and carries out [`AudioEffect`]s
#[derive(Clone)]
pub struct AudioHub {
    queue: PlaylistQueue,
    interrupts: InterruptCoordinator,
    playlist_url: Arc<str>,
}

impl AudioHub {
    pub fn new(
        queue: PlaylistQueue,
        interrupts: InterruptCoordinator,
        playlist_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            queue,
            interrupts,
            playlist_url: playlist_url.into(),
        }
    }

    pub fn queue(&self) -> &PlaylistQueue {
        &self.queue
    }

    pub fn interrupts(&self) -> &InterruptCoordinator {
        &self.interrupts
    }

    pub async fn apply(&self, session: SessionId, user: u64, effect: AudioEffect) {
        match effect {
            AudioEffect::StartPlaylist { voice_channel } => {
                self.queue
                    .start(session, voice_channel, &self.playlist_url)
                    .await
            }
            AudioEffect::Cue {
                action,
                voice_channel,
            } => {
                self.interrupts
                    .play_cue(session, voice_channel, user, action)
                    .await
            }
        }
    }

    /// Run an effect on its own task so the caller's event loop keeps going
    pub fn spawn(&self, session: SessionId, user: u64, effect: AudioEffect) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move { hub.apply(session, user, effect).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_hook_fires_on_runtime() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let hook = CompletionHook::new(move || async move {
            flag.store(true, Ordering::SeqCst);
        });

        hook.fire().unwrap().await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_hook_fires_from_foreign_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let hook = runtime.block_on(async {
            CompletionHook::new(move || async move {
                flag.store(true, Ordering::SeqCst);
            })
        });

        let handle = std::thread::spawn(move || hook.fire()).join().unwrap();
        runtime.block_on(handle.unwrap()).unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }
}
