//! Rollbard core: dice and arithmetic for tabletop chat, plus the per-guild
//! voice playlist with cue interruptions.
//!
//! Nothing in here knows about Discord. The transport feeds messages to the
//! [`Dispatcher`] and implements the [`AudioResolver`], [`VoicePlayer`] and
//! [`Notifier`] traits so the [`PlaylistQueue`] and [`InterruptCoordinator`]
//! can drive real audio.

pub mod access;
pub mod audio;
pub mod command;
pub mod config;
pub mod dice;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod themes;

#[cfg(test)]
pub(crate) mod test_utils;

pub use access::AccessLists;
pub use audio::{
    AudioEffect, AudioHub, AudioResolver, AudioSource, CompletionHook, InterruptCoordinator,
    Notifier, PlaylistQueue, ResolvedTrack, SessionAudioState, SessionId, Track, VoicePlayer,
};
pub use command::{Command, parse_command};
pub use config::Config;
pub use dice::{RollEngine, RollOutcome};
pub use dispatch::{Dispatcher, Invocation, Reply, Surface};
pub use error::{AudioError, ConfigError, CoreError, ExprError, Result};
pub use themes::ThemeMap;
