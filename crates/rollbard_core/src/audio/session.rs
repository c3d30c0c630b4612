use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{SessionId, Track};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CurrentTrack {
    pub track: Track,
    /// Identifies this particular start, so late completions can be told apart
    pub ticket: u64,
    /// False while the track is still being resolved
    pub started: bool,
}

/// What a preempt took over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Preempted {
    Nothing,
    /// A started track; it stays current until resumed
    Playing,
    /// A track still resolving; its start is cancelled
    Pending,
}

/// Playlist state of one session.
///
/// `interrupted` holds the track a cue took over from. While it is set,
/// auto-advance is suspended; there is no separate flag that could disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionAudioState {
    pub(crate) queue: VecDeque<Track>,
    pub(crate) current: Option<CurrentTrack>,
    pub(crate) interrupted: Option<Track>,
    /// Ticket of the cue that currently owns the voice connection
    pub(crate) cue: Option<u64>,
}

impl SessionAudioState {
    pub(crate) fn with_queue(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            queue: tracks.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn queue(&self) -> impl Iterator<Item = &Track> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref().map(|c| &c.track)
    }

    pub fn resume_track(&self) -> Option<&Track> {
        self.interrupted.as_ref()
    }

    pub fn is_suspended(&self) -> bool {
        self.interrupted.is_some()
    }

    pub(crate) fn holds_ticket(&self, ticket: u64) -> bool {
        self.current.as_ref().is_some_and(|c| c.ticket == ticket)
    }

    /// Record the current track for resumption. A started track only counts
    /// while audio is actually playing. A track still resolving loses its
    /// ticket, so the pending start gives up.
    pub(crate) fn preempt(&mut self, playing: bool) -> Preempted {
        match &self.current {
            Some(current) if current.started && playing => {
                self.interrupted = Some(current.track.clone());
                Preempted::Playing
            }
            Some(current) if !current.started => {
                self.interrupted = Some(current.track.clone());
                self.current = None;
                Preempted::Pending
            }
            _ => Preempted::Nothing,
        }
    }

    /// Clear the interruption and put its track back at the head of the queue.
    pub(crate) fn take_resume(&mut self) -> Option<Track> {
        let track = self.interrupted.take()?;
        self.current = None;
        self.queue.push_front(track.clone());
        Some(track)
    }
}

/// Every session's state behind its own lock
#[derive(Debug, Default)]
pub(crate) struct SessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<SessionAudioState>>>,
    tickets: AtomicU64,
}

impl SessionStore {
    /// The session's lock, created empty on first use
    pub fn state(&self, session: SessionId) -> Arc<Mutex<SessionAudioState>> {
        self.sessions.entry(session).or_default().value().clone()
    }

    pub fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed) + 1
    }
}
