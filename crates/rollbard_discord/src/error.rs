use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DiscordError {
    #[error("No Discord token configured")]
    #[diagnostic(
        code(rollbard::discord::no_token),
        help("Set DISCORD_TOKEN or discord.token in rollbard.toml")
    )]
    NoToken,

    #[error("Discord connection failed")]
    #[diagnostic(
        code(rollbard::discord::connection_failed),
        help("Check the bot token and that the gateway intents are enabled in the Developer Portal")
    )]
    ConnectionFailed {
        #[source]
        cause: serenity::Error,
    },

    #[error("Message send failed")]
    #[diagnostic(
        code(rollbard::discord::message_send_failed),
        help("Failed to send message to channel {channel_id}")
    )]
    SendFailed {
        channel_id: u64,
        #[source]
        cause: serenity::Error,
    },

    #[error("Interaction response failed")]
    #[diagnostic(
        code(rollbard::discord::interaction_failed),
        help("Discord rejected the reply to /{command_name}; interactions expire after 3 seconds")
    )]
    InteractionFailed {
        command_name: String,
        #[source]
        cause: serenity::Error,
    },

    #[error("Command registration failed")]
    #[diagnostic(
        code(rollbard::discord::command_registration_failed),
        help("Failed to register slash command '{command_name}'")
    )]
    CommandRegistrationFailed {
        command_name: String,
        #[source]
        cause: serenity::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(rollbard::discord::other))]
    Other(#[from] serenity::Error),
}

impl DiscordError {
    pub fn send_failed(channel_id: u64, cause: serenity::Error) -> Self {
        Self::SendFailed { channel_id, cause }
    }

    pub fn interaction_failed(command_name: impl Into<String>, cause: serenity::Error) -> Self {
        Self::InteractionFailed {
            command_name: command_name.into(),
            cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscordError>;
