//! Slash command definitions and option parsing

use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::application::{CommandDataOption, CommandDataOptionValue, CommandOptionType},
};

/// Names of the registered commands, in registration order
pub const COMMAND_NAMES: [&str; 4] = ["roll", "tema", "ban", "desbanir"];

/// Create all slash commands for registration
pub fn create_commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("roll")
            .description("Rola dados: d20+5, 2d6, 4df atacar")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "expressao",
                    "Expressão de dados, ex.: 2d6+1 ou 4df defender",
                )
                .required(true),
            ),
        CreateCommand::new("tema")
            .description("Define a música tocada no seu ++++")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "link", "Link http(s) da música")
                    .required(true),
            ),
        target_command("ban", "Bane um usuário das rolagens (admins)"),
        target_command("desbanir", "Remove um usuário dos banidos (admins)"),
    ]
}

fn target_command(name: &str, description: &str) -> CreateCommand {
    CreateCommand::new(name)
        .description(description)
        .add_option(
            CreateCommandOption::new(CommandOptionType::User, "usuario", "Usuário alvo")
                .required(false),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "usuario_id",
                "ID do usuário (15 a 20 dígitos)",
            )
            .required(false),
        )
}

/// The option values this bot reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue<'a> {
    Text(&'a str),
    User(u64),
    Unsupported,
}

impl<'a> From<&'a CommandDataOptionValue> for OptionValue<'a> {
    fn from(value: &'a CommandDataOptionValue) -> Self {
        match value {
            CommandDataOptionValue::String(text) => OptionValue::Text(text),
            CommandDataOptionValue::User(id) => OptionValue::User(id.get()),
            _ => OptionValue::Unsupported,
        }
    }
}

/// A recognized slash invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Roll { expression: String },
    Theme { link: String },
    Ban { user: Option<u64>, id_text: Option<String> },
    Unban { user: Option<u64>, id_text: Option<String> },
}

impl SlashCommand {
    /// Read the interaction's data; `None` for commands this bot does not own
    pub fn from_interaction(name: &str, options: &[CommandDataOption]) -> Option<Self> {
        Self::parse(
            name,
            options
                .iter()
                .map(|opt| (opt.name.as_str(), OptionValue::from(&opt.value))),
        )
    }

    pub fn parse<'a>(
        name: &str,
        options: impl IntoIterator<Item = (&'a str, OptionValue<'a>)>,
    ) -> Option<Self> {
        let options: Vec<_> = options.into_iter().collect();
        let text = |key: &str| {
            options.iter().find_map(|(name, value)| match value {
                OptionValue::Text(text) if *name == key => Some(text.to_string()),
                _ => None,
            })
        };
        let user = || {
            options.iter().find_map(|(name, value)| match value {
                OptionValue::User(id) if *name == "usuario" => Some(*id),
                _ => None,
            })
        };

        match name {
            "roll" => Some(SlashCommand::Roll {
                expression: text("expressao").unwrap_or_default(),
            }),
            "tema" => Some(SlashCommand::Theme {
                link: text("link").unwrap_or_default(),
            }),
            "ban" => Some(SlashCommand::Ban {
                user: user(),
                id_text: text("usuario_id"),
            }),
            "desbanir" => Some(SlashCommand::Unban {
                user: user(),
                id_text: text("usuario_id"),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SlashCommand::Roll { .. } => "roll",
            SlashCommand::Theme { .. } => "tema",
            SlashCommand::Ban { .. } => "ban",
            SlashCommand::Unban { .. } => "desbanir",
        }
    }

    /// User picked in the `usuario` option
    pub fn selected_user(&self) -> Option<u64> {
        match self {
            SlashCommand::Ban { user, .. } | SlashCommand::Unban { user, .. } => *user,
            _ => None,
        }
    }
}
