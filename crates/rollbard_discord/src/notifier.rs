use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rollbard_core::{Notifier, SessionId};
use serenity::{http::Http, model::id::ChannelId};
use tracing::{error, warn};

use crate::error::DiscordError;

/// Sends session status lines to the text channel that last issued an audio command
pub struct ChannelNotifier {
    http: Arc<Http>,
    channels: DashMap<SessionId, ChannelId>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            channels: DashMap::new(),
        }
    }

    pub fn bind(&self, session: SessionId, channel: ChannelId) {
        self.channels.insert(session, channel);
    }

    pub fn channel(&self, session: SessionId) -> Option<ChannelId> {
        self.channels.get(&session).map(|c| *c)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, session: SessionId, text: &str) {
        let Some(channel) = self.channel(session) else {
            warn!(%session, text, "no text channel bound for session");
            return;
        };

        if let Err(cause) = channel.say(&self.http, text).await {
            let e = DiscordError::send_failed(channel.get(), cause);
            error!(%session, error = ?e, "failed to post status line");
        }
    }
}
