//! Text command recognition.
//!
//! Messages are tried against an ordered list of matchers; the first one that
//! accepts the text decides the command.

use std::sync::LazyLock;

use regex::Regex;

use crate::dice::{ParseOutcome, parse_roll};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!tema <link>`
    SetTheme { link: Option<String> },
    /// `!luta`
    StartPlaylist,
    /// `!adm <target>`
    AddAdmin { target: Option<String> },
    /// `!teste <target>`
    ToggleTestMode { target: Option<String> },
    /// `!ban <target>`
    Ban { target: Option<String> },
    /// `!desbanir <target>`
    Unban { target: Option<String> },
    /// `d20+3 ...` or `4df atacar ...`
    Roll(ParseOutcome),
    /// `r <arithmetic>`
    Calculate { expression: String },
}

fn keyword(name: &str) -> Regex {
    Regex::new(&format!(r"(?i)^!{name}(?:\s+(.*))?$")).expect("command pattern")
}

static THEME: LazyLock<Regex> = LazyLock::new(|| keyword("tema"));
static FIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^!luta\s*$").expect("command pattern"));
static ADMIN: LazyLock<Regex> = LazyLock::new(|| keyword("adm"));
static TEST_MODE: LazyLock<Regex> = LazyLock::new(|| keyword("teste"));
static BAN: LazyLock<Regex> = LazyLock::new(|| keyword("ban"));
static UNBAN: LazyLock<Regex> = LazyLock::new(|| keyword("desbanir"));

/// Arithmetic only: digits, decimal points, parentheses, whitespace and operators
static CALCULATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^r\s*([0-9.\s()+\-*/%]+)$").expect("calculate pattern"));

type Matcher = fn(&str, bool) -> Option<Command>;

const MATCHERS: &[Matcher] = &[
    |text, _| argument(&THEME, text).map(|link| Command::SetTheme { link }),
    |text, _| FIGHT.is_match(text).then_some(Command::StartPlaylist),
    |text, _| argument(&ADMIN, text).map(|target| Command::AddAdmin { target }),
    |text, _| argument(&TEST_MODE, text).map(|target| Command::ToggleTestMode { target }),
    |text, _| argument(&BAN, text).map(|target| Command::Ban { target }),
    |text, _| argument(&UNBAN, text).map(|target| Command::Unban { target }),
    |text, test_mode| parse_roll(text, test_mode).map(Command::Roll),
    calculation,
];

/// Recognize a command in a whole message; `None` for ordinary chatter.
/// `test_mode` is whether the author may force 4df results.
pub fn parse_command(text: &str, test_mode: bool) -> Option<Command> {
    MATCHERS.iter().find_map(|matcher| matcher(text, test_mode))
}

/// `Some(argument)` when the keyword matches, the argument itself being optional
fn argument(pattern: &Regex, text: &str) -> Option<Option<String>> {
    let caps = pattern.captures(text)?;
    Some(
        caps.get(1)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty()),
    )
}

fn calculation(text: &str, _test_mode: bool) -> Option<Command> {
    let caps = CALCULATE.captures(text)?;
    let expression = caps[1].trim();

    let has_digit = expression.chars().any(|c| c.is_ascii_digit());
    let has_operator = expression.chars().any(|c| "+-*/%".contains(c));
    (has_digit && has_operator).then(|| Command::Calculate {
        expression: expression.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::RollKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyword_commands() {
        assert_eq!(
            parse_command("!TEMA https://youtu.be/x", false),
            Some(Command::SetTheme {
                link: Some("https://youtu.be/x".to_string())
            })
        );
        assert_eq!(
            parse_command("!tema", false),
            Some(Command::SetTheme { link: None })
        );
        assert_eq!(parse_command("!luta  ", false), Some(Command::StartPlaylist));
        assert_eq!(parse_command("!luta agora", false), None);
        assert_eq!(
            parse_command("!ban <@316323635470270475>", false),
            Some(Command::Ban {
                target: Some("<@316323635470270475>".to_string())
            })
        );
        assert_eq!(
            parse_command("!desbanir", false),
            Some(Command::Unban { target: None })
        );
        assert_eq!(
            parse_command("!adm 1", false),
            Some(Command::AddAdmin {
                target: Some("1".to_string())
            })
        );
        assert_eq!(
            parse_command("!teste x", false),
            Some(Command::ToggleTestMode {
                target: Some("x".to_string())
            })
        );
    }

    #[test]
    fn test_keywords_need_a_word_boundary() {
        assert_eq!(parse_command("!banana", false), None);
        assert_eq!(parse_command("!temas", false), None);
        assert_eq!(parse_command("!lutar", false), None);
    }

    #[test]
    fn test_arguments_stay_on_one_line() {
        assert_eq!(argument(&THEME, "!tema https://youtu.be/x\nmais texto"), None);
        assert_eq!(argument(&BAN, "!ban 1\n2"), None);
        assert_eq!(
            argument(&THEME, "!tema\nhttps://youtu.be/x"),
            Some(Some("https://youtu.be/x".to_string()))
        );
    }

    #[test]
    fn test_rolls() {
        let Some(Command::Roll(ParseOutcome::Roll(request))) = parse_command("2d6+1", false)
        else {
            panic!("expected a roll");
        };
        assert_eq!(request.kind, RollKind::Standard { sides: 6 });

        assert_eq!(
            parse_command("4df", false),
            Some(Command::Roll(ParseOutcome::MissingAction))
        );
    }

    #[test]
    fn test_calculations() {
        assert_eq!(
            parse_command("r (10 + 5) * 2 - 3/4", false),
            Some(Command::Calculate {
                expression: "(10 + 5) * 2 - 3/4".to_string()
            })
        );
        assert_eq!(
            parse_command("r2**10", false),
            Some(Command::Calculate {
                expression: "2**10".to_string()
            })
        );
        // no operator, letters, or a capital marker
        assert_eq!(parse_command("r 42", false), None);
        assert_eq!(parse_command("r abs(-1)", false), None);
        assert_eq!(parse_command("R 1+1", false), None);
        assert_eq!(parse_command("rolei 1+1", false), None);
        assert_eq!(parse_command("r +", false), None);
    }

    #[test]
    fn test_chatter_is_ignored() {
        for text in ["", "oi", "vamos rolar d20?", "bom dia r 1+1"] {
            assert_eq!(parse_command(text, false), None, "{text:?}");
        }
    }
}
