use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rollbard_core::{
    AccessLists, AudioEffect, AudioHub, Config, Dispatcher, InterruptCoordinator, Invocation,
    PlaylistQueue, Reply, RollEngine, SessionId, Surface, ThemeMap,
};
use serenity::{
    Client,
    all::{
        Command, CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage,
    },
    async_trait,
    client::{Context, EventHandler},
    model::{
        application::{CommandInteraction, Interaction},
        channel::Message,
        gateway::Ready,
        id::{ChannelId, GuildId, UserId},
    },
    http::Http,
    prelude::*,
};
use songbird::{SerenityInit, Songbird};
use tracing::{debug, error, info, warn};

use crate::{
    error::{DiscordError, Result},
    notifier::ChannelNotifier,
    resolver::YtDlpResolver,
    slash_commands::{COMMAND_NAMES, SlashCommand, create_commands},
    voice::SongbirdPlayer,
};

/// Discord bot handler
pub struct RollbardBot {
    dispatcher: Arc<Dispatcher>,
    hub: AudioHub,
    notifier: Arc<ChannelNotifier>,
    commands_registered: AtomicBool,
}

impl RollbardBot {
    pub fn new(dispatcher: Arc<Dispatcher>, hub: AudioHub, notifier: Arc<ChannelNotifier>) -> Self {
        Self {
            dispatcher,
            hub,
            notifier,
            commands_registered: AtomicBool::new(false),
        }
    }

    async fn register_commands(&self, ctx: &Context) {
        for (name, command) in COMMAND_NAMES.into_iter().zip(create_commands()) {
            if let Err(cause) = Command::create_global_command(&ctx.http, command).await {
                let e = DiscordError::CommandRegistrationFailed {
                    command_name: name.to_string(),
                    cause,
                };
                error!("Cannot create slash command: {:?}", e);
            }
        }
    }

    /// Bind the reply channel and hand the effect to the audio hub
    fn start_effect(
        &self,
        guild: Option<GuildId>,
        channel: ChannelId,
        user: u64,
        effect: AudioEffect,
    ) {
        let Some(guild) = guild else {
            debug!(?effect, "audio effect outside a guild ignored");
            return;
        };

        let session = SessionId(guild.get());
        self.notifier.bind(session, channel);
        self.hub.spawn(session, user, effect);
    }

    async fn handle_slash(&self, ctx: &Context, command: &CommandInteraction) -> Result<()> {
        let Some(slash) = SlashCommand::from_interaction(&command.data.name, &command.data.options)
        else {
            warn!("Unknown command: {}", command.data.name);
            return Ok(());
        };

        let mention = command.user.mention().to_string();
        let invocation = Invocation {
            user: command.user.id.get(),
            mention: &mention,
            mentioned: slash.selected_user(),
            voice_channel: command
                .guild_id
                .and_then(|guild| voice_channel_of(ctx, guild, command.user.id)),
            surface: Surface::Slash,
        };

        let reply = match &slash {
            SlashCommand::Roll { expression } => self.dispatcher.slash_roll(expression, &invocation),
            SlashCommand::Theme { link } => self.dispatcher.slash_theme(link, &invocation),
            SlashCommand::Ban { id_text, .. } => {
                self.dispatcher.slash_ban(id_text.as_deref(), &invocation)
            }
            SlashCommand::Unban { id_text, .. } => {
                self.dispatcher.slash_unban(id_text.as_deref(), &invocation)
            }
        };

        let effect = reply.effect;
        respond(ctx, command, slash.name(), reply).await?;

        if let Some(effect) = effect {
            self.start_effect(command.guild_id, command.channel_id, invocation.user, effect);
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for RollbardBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        // Reconnects fire ready again
        if self.commands_registered.swap(true, Ordering::SeqCst) {
            return;
        }
        self.register_commands(&ctx).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore bots, this one included
        if msg.author.bot {
            return;
        }

        let mention = msg.author.mention().to_string();
        let invocation = Invocation {
            user: msg.author.id.get(),
            mention: &mention,
            mentioned: msg.mentions.first().map(|user| user.id.get()),
            voice_channel: msg
                .guild_id
                .and_then(|guild| voice_channel_of(&ctx, guild, msg.author.id)),
            surface: Surface::Text,
        };

        let Some(reply) = self
            .dispatcher
            .handle_message(msg.content.trim(), &invocation)
        else {
            return;
        };

        for line in &reply.messages {
            if let Err(cause) = msg.channel_id.say(&ctx.http, line).await {
                let e = DiscordError::send_failed(msg.channel_id.get(), cause);
                error!("Failed to send reply: {:?}", e);
                break;
            }
        }

        if let Some(effect) = reply.effect {
            self.start_effect(msg.guild_id, msg.channel_id, invocation.user, effect);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            info!(
                "Received slash command: {} from user {}",
                command.data.name, command.user.name
            );
            if let Err(e) = self.handle_slash(&ctx, &command).await {
                error!("Slash command failed: {:?}", e);
            }
        }
    }
}

/// First message answers the interaction, the rest go out as follow-ups
async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    name: &str,
    reply: Reply,
) -> Result<()> {
    let mut lines = reply.messages.into_iter();
    let Some(first) = lines.next() else {
        return Ok(());
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(first)
                    .ephemeral(reply.ephemeral),
            ),
        )
        .await
        .map_err(|cause| DiscordError::interaction_failed(name, cause))?;

    for line in lines {
        command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(line)
                    .ephemeral(reply.ephemeral),
            )
            .await
            .map_err(|cause| DiscordError::interaction_failed(name, cause))?;
    }
    Ok(())
}

/// Voice channel the user sits in, from the gateway cache
fn voice_channel_of(ctx: &Context, guild: GuildId, user: UserId) -> Option<u64> {
    let guild = ctx.cache.guild(guild)?;
    guild
        .voice_states
        .get(&user)
        .and_then(|state| state.channel_id)
        .map(|channel| channel.get())
}

/// Wire the core services to Discord and build the client
pub async fn create_discord_client(config: &Config) -> Result<Client> {
    if config.discord.token.trim().is_empty() {
        return Err(DiscordError::NoToken);
    }

    let http = Arc::new(Http::new(&config.discord.token));
    let manager = Songbird::serenity();

    let themes = Arc::new(ThemeMap::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(AccessLists::from_config(&config.access)),
        themes.clone(),
        RollEngine::new(config.media.clone()),
    ));

    let notifier = Arc::new(ChannelNotifier::new(http));
    let queue = PlaylistQueue::new(
        Arc::new(YtDlpResolver::new(config.audio.ytdlp_path.as_str())),
        Arc::new(SongbirdPlayer::new(manager.clone())),
        notifier.clone(),
    );
    let interrupts = InterruptCoordinator::new(queue.clone(), themes, config.special_cue_path());
    let hub = AudioHub::new(queue, interrupts, config.audio.playlist_url.as_str());

    let handler = RollbardBot::new(dispatcher, hub, notifier);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client_builder = Client::builder(&config.discord.token, intents)
        .event_handler(handler)
        .register_songbird_with(manager);

    if let Some(app_id) = config.discord.application_id {
        client_builder = client_builder.application_id(app_id.into());
    }

    client_builder
        .await
        .map_err(|cause| DiscordError::ConnectionFailed { cause })
}
