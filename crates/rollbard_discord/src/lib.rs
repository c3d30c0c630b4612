//! Rollbard Discord - gateway and voice transport
//!
//! Feeds chat messages and slash interactions to the core dispatcher and
//! backs its audio traits with songbird and yt-dlp.

pub mod bot;
pub mod error;
pub mod notifier;
pub mod resolver;
pub mod slash_commands;
pub mod voice;

pub use bot::{RollbardBot, create_discord_client};
pub use error::{DiscordError, Result};
pub use notifier::ChannelNotifier;
pub use resolver::YtDlpResolver;
pub use slash_commands::{SlashCommand, create_commands};
pub use voice::SongbirdPlayer;

// Re-export serenity for convenience
pub use serenity;
