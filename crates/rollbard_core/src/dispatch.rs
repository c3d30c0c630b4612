//! Turns recognized commands into replies and audio effects.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng, rngs::StdRng};

use crate::{
    access::{AccessLists, resolve_target},
    audio::AudioEffect,
    command::{Command, parse_command},
    dice::{RollEngine, RollOutcome, parse_roll},
    error::ExprError,
    expr,
    themes::ThemeMap,
};

/// Where a command came from; slash commands get their own wording and
/// private error replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Text,
    Slash,
}

/// Who issued a command and where they are
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub user: u64,
    pub mention: &'a str,
    /// First user mentioned or selected in the command, if any
    pub mentioned: Option<u64>,
    /// Voice channel the user is connected to
    pub voice_channel: Option<u64>,
    pub surface: Surface,
}

/// What to send back, and what to play
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub messages: Vec<String>,
    /// Only the invoking user should see it (slash commands)
    pub ephemeral: bool,
    pub effect: Option<AudioEffect>,
}

impl Reply {
    fn say(text: impl Into<String>) -> Self {
        Self {
            messages: vec![text.into()],
            ..Self::default()
        }
    }

    fn private(text: impl Into<String>, surface: Surface) -> Self {
        Self {
            ephemeral: surface == Surface::Slash,
            ..Self::say(text)
        }
    }
}

/// Routes commands against the shared lists and the roll engine
pub struct Dispatcher {
    access: Arc<AccessLists>,
    themes: Arc<ThemeMap>,
    engine: RollEngine,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl Dispatcher {
    pub fn new(access: Arc<AccessLists>, themes: Arc<ThemeMap>, engine: RollEngine) -> Self {
        Self::with_rng(access, themes, engine, StdRng::from_os_rng())
    }

    pub fn with_rng(
        access: Arc<AccessLists>,
        themes: Arc<ThemeMap>,
        engine: RollEngine,
        rng: impl RngCore + Send + 'static,
    ) -> Self {
        Self {
            access,
            themes,
            engine,
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Handle a chat message; `None` when it is not a command
    pub fn handle_message(&self, text: &str, invocation: &Invocation<'_>) -> Option<Reply> {
        let command = parse_command(text, self.access.is_tester(invocation.user))?;
        Some(self.dispatch(command, invocation))
    }

    pub fn dispatch(&self, command: Command, invocation: &Invocation<'_>) -> Reply {
        tracing::debug!(user = invocation.user, ?command, "dispatching");
        match command {
            Command::SetTheme { link } => self.set_theme(link.as_deref(), invocation),
            Command::StartPlaylist => self.start_playlist(invocation),
            Command::AddAdmin { target } => {
                self.admin_action(AdminAction::AddAdmin, target.as_deref(), invocation)
            }
            Command::ToggleTestMode { target } => {
                self.admin_action(AdminAction::ToggleTestMode, target.as_deref(), invocation)
            }
            Command::Ban { target } => {
                self.admin_action(AdminAction::Ban, target.as_deref(), invocation)
            }
            Command::Unban { target } => {
                self.admin_action(AdminAction::Unban, target.as_deref(), invocation)
            }
            Command::Roll(outcome) => {
                let banned = self.access.is_banned(invocation.user);
                let rolled = {
                    let mut rng = self.rng.lock();
                    self.engine
                        .respond(&outcome, invocation.mention, banned, &mut *rng)
                };
                self.roll_reply(rolled, invocation)
            }
            Command::Calculate { expression } => self.calculate(&expression, invocation),
        }
    }

    /// `/roll expressao`
    pub fn slash_roll(&self, expression: &str, invocation: &Invocation<'_>) -> Reply {
        let test_mode = self.access.is_tester(invocation.user);
        match parse_roll(expression.trim(), test_mode) {
            Some(outcome) => self.dispatch(Command::Roll(outcome), invocation),
            None => Reply::say("Expressão inválida. Use exemplos: `d20+5`, `2d6`, `4df atacar`"),
        }
    }

    /// `/tema link`
    pub fn slash_theme(&self, link: &str, invocation: &Invocation<'_>) -> Reply {
        self.set_theme(Some(link), invocation)
    }

    /// `/ban [usuario] [usuario_id]`
    pub fn slash_ban(&self, id_text: Option<&str>, invocation: &Invocation<'_>) -> Reply {
        self.admin_action(AdminAction::Ban, id_text, invocation)
    }

    /// `/desbanir [usuario] [usuario_id]`
    pub fn slash_unban(&self, id_text: Option<&str>, invocation: &Invocation<'_>) -> Reply {
        self.admin_action(AdminAction::Unban, id_text, invocation)
    }

    fn set_theme(&self, link: Option<&str>, invocation: &Invocation<'_>) -> Reply {
        let stored = link.is_some_and(|l| self.themes.set(invocation.user, l));
        let mention = invocation.mention;

        match (stored, invocation.surface) {
            (true, Surface::Text) => {
                Reply::say(format!("{mention} tema salvo! Vou tocar no seu ++++ em 4df."))
            }
            (true, Surface::Slash) => {
                Reply::say("Tema salvo com sucesso! Agora seu ++++ tocará essa música.")
            }
            (false, Surface::Text) => {
                Reply::say(format!("{mention} use `!tema <link>` com URL válida."))
            }
            (false, Surface::Slash) => Reply::private(
                "Envie um link válido começando com `http://` ou `https://`.",
                Surface::Slash,
            ),
        }
    }

    fn start_playlist(&self, invocation: &Invocation<'_>) -> Reply {
        match invocation.voice_channel {
            Some(voice_channel) => Reply {
                effect: Some(AudioEffect::StartPlaylist { voice_channel }),
                ..Reply::default()
            },
            None => Reply::say(format!(
                "{} entre em um canal de voz para usar `!luta`.",
                invocation.mention
            )),
        }
    }

    fn admin_action(
        &self,
        action: AdminAction,
        target_text: Option<&str>,
        invocation: &Invocation<'_>,
    ) -> Reply {
        let surface = invocation.surface;

        if !self.access.is_admin(invocation.user) {
            return match surface {
                Surface::Text => Reply::say(format!(
                    "{} você não tem permissão para usar este comando.",
                    invocation.mention
                )),
                Surface::Slash => Reply::private(
                    "Você não tem permissão para usar este comando.",
                    Surface::Slash,
                ),
            };
        }

        let Some(target) = resolve_target(invocation.mentioned, target_text) else {
            let usage = match surface {
                Surface::Text => format!(
                    "Use `!{0} @usuario` ou `!{0} ID`.",
                    action.keyword()
                ),
                Surface::Slash => format!(
                    "Use `/{}` mencionando alguém ou informando um ID válido.",
                    action.keyword()
                ),
            };
            return Reply::private(usage, surface);
        };

        tracing::info!(admin = invocation.user, target, ?action, "admin command");
        match action {
            AdminAction::AddAdmin => {
                if self.access.add_admin(target) {
                    Reply::say(format!("Usuário `{target}` adicionado como admin."))
                } else {
                    Reply::private(format!("O usuário `{target}` já é admin."), surface)
                }
            }
            AdminAction::ToggleTestMode => {
                if self.access.toggle_test_mode(target) {
                    Reply::say(format!(
                        "Modo de teste ativado para `{target}`. Em `4df`, a pessoa pode usar `max`/`min` no fim da mensagem."
                    ))
                } else {
                    Reply::say(format!("Modo de teste removido para `{target}`."))
                }
            }
            AdminAction::Ban => {
                if self.access.ban(target) {
                    Reply::say(format!("Usuário `{target}` foi adicionado aos banidos."))
                } else {
                    Reply::private(format!("O usuário `{target}` já está banido."), surface)
                }
            }
            AdminAction::Unban => {
                if self.access.unban(target) {
                    Reply::say(format!("Usuário `{target}` foi removido dos banidos."))
                } else {
                    Reply::private(format!("O usuário `{target}` não está banido."), surface)
                }
            }
        }
    }

    fn roll_reply(&self, rolled: RollOutcome, invocation: &Invocation<'_>) -> Reply {
        let effect = rolled
            .cue
            .zip(invocation.voice_channel)
            .map(|(action, voice_channel)| AudioEffect::Cue {
                action,
                voice_channel,
            });

        Reply {
            messages: rolled.messages,
            ephemeral: false,
            effect,
        }
    }

    fn calculate(&self, expression: &str, invocation: &Invocation<'_>) -> Reply {
        let mention = invocation.mention;
        if self.access.is_banned(invocation.user) {
            return Reply {
                messages: self.engine.decoy(mention).messages,
                ..Reply::default()
            };
        }

        match expr::evaluate(expression) {
            Ok(value) => Reply::say(format!("{mention} `r {expression}` = **{value}**")),
            Err(ExprError::DivisionByZero) => {
                Reply::say(format!("{mention} não dá para dividir por zero."))
            }
            Err(ExprError::NumberTooLarge) => {
                Reply::say(format!("{mention} o resultado é grande demais."))
            }
            Err(ExprError::InvalidExpression { .. }) => Reply::say(format!(
                "{mention} expressão inválida. Exemplo: `r (10 + 5) * 2 - 3/4`"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AdminAction {
    AddAdmin,
    ToggleTestMode,
    Ban,
    Unban,
}

impl AdminAction {
    fn keyword(self) -> &'static str {
        match self {
            AdminAction::AddAdmin => "adm",
            AdminAction::ToggleTestMode => "teste",
            AdminAction::Ban => "ban",
            AdminAction::Unban => "desbanir",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MediaConfig, dice::FateAction, test_utils::UntouchableRng};
    use pretty_assertions::assert_eq;

    const ADMIN: u64 = 316323635470270475;
    const BANNED: u64 = 190954369917779968;
    const PLAYER: u64 = 111111111111111111;

    fn dispatcher() -> Dispatcher {
        dispatcher_with(StdRng::seed_from_u64(5))
    }

    fn dispatcher_with(rng: impl RngCore + Send + 'static) -> Dispatcher {
        Dispatcher::with_rng(
            Arc::new(AccessLists::new([ADMIN], [BANNED])),
            Arc::new(ThemeMap::new()),
            RollEngine::new(MediaConfig::default()),
            rng,
        )
    }

    fn by(user: u64) -> Invocation<'static> {
        Invocation {
            user,
            mention: "<@user>",
            mentioned: None,
            voice_channel: Some(900),
            surface: Surface::Text,
        }
    }

    fn slash(user: u64) -> Invocation<'static> {
        Invocation {
            surface: Surface::Slash,
            ..by(user)
        }
    }

    fn say(d: &Dispatcher, text: &str, invocation: Invocation<'_>) -> Reply {
        d.handle_message(text, &invocation)
            .unwrap_or_else(|| panic!("{text:?} should be a command"))
    }

    #[test]
    fn test_chatter_gets_no_reply() {
        assert_eq!(dispatcher().handle_message("bom dia", &by(PLAYER)), None);
    }

    #[test]
    fn test_admin_commands_require_permission() {
        let d = dispatcher();
        let reply = say(&d, "!ban 222222222222222222", by(PLAYER));
        assert_eq!(
            reply.messages,
            vec!["<@user> você não tem permissão para usar este comando."]
        );
        assert!(!d.access.is_banned(222222222222222222));

        let reply = d.slash_ban(Some("222222222222222222"), &slash(PLAYER));
        assert!(reply.ephemeral);
        assert!(!d.access.is_banned(222222222222222222));
    }

    #[test]
    fn test_ban_and_unban_cycle() {
        let d = dispatcher();
        let target = 222222222222222222;

        let reply = say(&d, "!ban id 222222222222222222", by(ADMIN));
        assert_eq!(
            reply.messages,
            vec!["Usuário `222222222222222222` foi adicionado aos banidos."]
        );
        assert!(d.access.is_banned(target));

        let reply = say(&d, "!ban 222222222222222222", by(ADMIN));
        assert_eq!(
            reply.messages,
            vec!["O usuário `222222222222222222` já está banido."]
        );

        let reply = d.slash_unban(Some("222222222222222222"), &slash(ADMIN));
        assert_eq!(
            reply.messages,
            vec!["Usuário `222222222222222222` foi removido dos banidos."]
        );
        assert!(!reply.ephemeral);

        let reply = say(&d, "!desbanir 222222222222222222", by(ADMIN));
        assert_eq!(
            reply.messages,
            vec!["O usuário `222222222222222222` não está banido."]
        );
    }

    #[test]
    fn test_mentions_take_precedence_and_usage_hints() {
        let d = dispatcher();
        let invocation = Invocation {
            mentioned: Some(PLAYER),
            ..by(ADMIN)
        };
        let reply = say(&d, "!adm 222222222222222222", invocation);
        assert_eq!(
            reply.messages,
            vec![format!("Usuário `{PLAYER}` adicionado como admin.")]
        );
        assert!(d.access.is_admin(PLAYER));

        let reply = say(&d, "!adm", by(ADMIN));
        assert_eq!(reply.messages, vec!["Use `!adm @usuario` ou `!adm ID`."]);

        let reply = d.slash_ban(None, &slash(ADMIN));
        assert_eq!(
            reply.messages,
            vec!["Use `/ban` mencionando alguém ou informando um ID válido."]
        );
        assert!(reply.ephemeral);
    }

    #[test]
    fn test_test_mode_toggle_enables_forcing() {
        let d = dispatcher_with(UntouchableRng);
        let reply = say(&d, &format!("!teste {PLAYER}"), by(ADMIN));
        assert!(reply.messages[0].starts_with("Modo de teste ativado"));

        let reply = say(&d, "4df atacar max", by(PLAYER));
        assert_eq!(reply.messages[0], "Black Flash!");
        assert_eq!(
            reply.effect,
            Some(AudioEffect::Cue {
                action: FateAction::Attack,
                voice_channel: 900
            })
        );

        let reply = say(&d, &format!("!teste {PLAYER}"), by(ADMIN));
        assert_eq!(
            reply.messages,
            vec![format!("Modo de teste removido para `{PLAYER}`.")]
        );
    }

    #[test]
    fn test_cue_needs_a_voice_channel() {
        let d = dispatcher_with(UntouchableRng);
        d.access.toggle_test_mode(PLAYER);
        let invocation = Invocation {
            voice_channel: None,
            ..by(PLAYER)
        };
        let reply = say(&d, "4df defender max", invocation);
        assert_eq!(reply.messages.len(), 1);
        assert_eq!(reply.effect, None);
    }

    #[test]
    fn test_banned_users_get_the_decoy_everywhere() {
        let d = dispatcher_with(UntouchableRng);
        for text in ["d20", "4df atacar", "r 1+1"] {
            let reply = say(&d, text, by(BANNED));
            assert_eq!(reply.messages.len(), 3, "{text:?}");
            assert_eq!(reply.effect, None);
        }
        assert_eq!(d.slash_roll("d20", &slash(BANNED)).messages.len(), 3);
    }

    #[test]
    fn test_missing_action_prompt_has_no_effect() {
        let d = dispatcher_with(UntouchableRng);
        let reply = say(&d, "4df pular", by(PLAYER));
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].contains("você precisa escolher uma ação"));
        assert_eq!(reply.effect, None);
    }

    #[test]
    fn test_calculations() {
        let d = dispatcher();
        assert_eq!(
            say(&d, "r 2 + 3 * (4 - 1)", by(PLAYER)).messages,
            vec!["<@user> `r 2 + 3 * (4 - 1)` = **11**"]
        );
        assert_eq!(
            say(&d, "r 10/4", by(PLAYER)).messages,
            vec!["<@user> `r 10/4` = **2.5**"]
        );
        assert_eq!(
            say(&d, "r 5 / 0", by(PLAYER)).messages,
            vec!["<@user> não dá para dividir por zero."]
        );
        assert_eq!(
            say(&d, "r 1 +* 2", by(PLAYER)).messages,
            vec!["<@user> expressão inválida. Exemplo: `r (10 + 5) * 2 - 3/4`"]
        );
    }

    #[test]
    fn test_themes() {
        let d = dispatcher();
        assert_eq!(
            say(&d, "!tema youtube", by(PLAYER)).messages,
            vec!["<@user> use `!tema <link>` com URL válida."]
        );
        assert_eq!(d.themes.get(PLAYER), None);

        assert_eq!(
            say(&d, "!tema https://youtu.be/abc", by(PLAYER)).messages,
            vec!["<@user> tema salvo! Vou tocar no seu ++++ em 4df."]
        );
        assert!(d.themes.get(PLAYER).is_some());

        let reply = d.slash_theme("nope", &slash(PLAYER));
        assert!(reply.ephemeral);
    }

    #[test]
    fn test_start_playlist() {
        let d = dispatcher();
        assert_eq!(
            say(&d, "!luta", by(PLAYER)).effect,
            Some(AudioEffect::StartPlaylist { voice_channel: 900 })
        );

        let reply = say(
            &d,
            "!luta",
            Invocation {
                voice_channel: None,
                ..by(PLAYER)
            },
        );
        assert_eq!(
            reply.messages,
            vec!["<@user> entre em um canal de voz para usar `!luta`."]
        );
        assert_eq!(reply.effect, None);
    }

    #[test]
    fn test_slash_roll() {
        let d = dispatcher();
        let reply = d.slash_roll("d20+5", &slash(PLAYER));
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].starts_with("<@user> rolled: ["));

        let reply = d.slash_roll("banana", &slash(PLAYER));
        assert_eq!(
            reply.messages,
            vec!["Expressão inválida. Use exemplos: `d20+5`, `2d6`, `4df atacar`"]
        );
    }
}
