use std::sync::LazyLock;

use regex::{Captures, Match, Regex};

use super::{FateAction, ForcedOutcome, MAX_DICE, MAX_SIDES, RollKind, RollRequest};

/// Largest magnitude of a single modifier term
const MAX_MODIFIER: i64 = 1_000_000_000;

static STANDARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([0-9]*)d([0-9]+)((?:\s*[+-]\s*[0-9]+)*)(?:\s+(.*))?$")
        .expect("standard roll pattern")
});

static FATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([0-9]*)df((?:\s*[+-]\s*[0-9]+)*)(?:\s+(.*))?$").expect("fate roll pattern")
});

static MODIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+-])\s*([0-9]+)").expect("modifier pattern"));

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(criar\s+vantagem|atacar|defender|superar)(?:\s+(.*))?$")
        .expect("fate action pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Roll(RollRequest),
    /// A 4df roll whose text does not start with one of the four actions
    MissingAction,
}

/// Recognize a roll in a whole message.
///
/// Returns `None` when the text is not a roll at all (including counts, sides
/// or modifiers outside the accepted ranges). `test_mode` enables the `max`/`min`
/// override on 4df rolls.
pub fn parse_roll(text: &str, test_mode: bool) -> Option<ParseOutcome> {
    if let Some(caps) = STANDARD.captures(text) {
        return parse_standard(&caps).map(ParseOutcome::Roll);
    }

    let caps = FATE.captures(text)?;
    parse_fate(&caps, test_mode)
}

fn parse_standard(caps: &Captures<'_>) -> Option<RollRequest> {
    let count = parse_count(caps.get(1))?;
    let sides = caps[2]
        .parse::<u32>()
        .ok()
        .filter(|s| (1..=MAX_SIDES).contains(s))?;
    let modifiers = parse_modifiers(caps.get(3))?;

    Some(RollRequest {
        kind: RollKind::Standard { sides },
        count,
        modifiers,
        trailer: non_empty(caps.get(4).map(|m| m.as_str())),
        action: None,
        forced: None,
    })
}

fn parse_fate(caps: &Captures<'_>, test_mode: bool) -> Option<ParseOutcome> {
    let count = parse_count(caps.get(1))?;
    let modifiers = parse_modifiers(caps.get(2))?;
    let raw_trailer = caps.get(3).map(|m| m.as_str());

    let mut request = RollRequest {
        kind: RollKind::Fate,
        count,
        modifiers,
        trailer: None,
        action: None,
        forced: None,
    };

    if count != 4 {
        request.trailer = non_empty(raw_trailer);
        return Some(ParseOutcome::Roll(request));
    }

    let Some((action, mut complement)) = raw_trailer.and_then(split_action) else {
        return Some(ParseOutcome::MissingAction);
    };
    request.action = Some(action);

    if test_mode {
        let (forced, rest) = extract_forced(&complement);
        request.forced = forced;
        complement = rest;
    }
    request.trailer = non_empty(Some(&complement));

    Some(ParseOutcome::Roll(request))
}

fn parse_count(m: Option<Match<'_>>) -> Option<u32> {
    match m.map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        None => Some(1),
        Some(digits) => digits
            .parse::<u32>()
            .ok()
            .filter(|c| (1..=MAX_DICE).contains(c)),
    }
}

fn parse_modifiers(m: Option<Match<'_>>) -> Option<Vec<i64>> {
    let Some(m) = m else {
        return Some(Vec::new());
    };

    MODIFIER
        .captures_iter(m.as_str())
        .map(|caps| {
            let value = caps[2]
                .parse::<i64>()
                .ok()
                .filter(|v| *v <= MAX_MODIFIER)?;
            Some(if &caps[1] == "-" { -value } else { value })
        })
        .collect()
}

/// Split a 4df trailer into its action and the remaining complement.
fn split_action(text: &str) -> Option<(FateAction, String)> {
    let collapsed = collapse_whitespace(text);
    let caps = ACTION.captures(&collapsed)?;

    let phrase = collapse_whitespace(&caps[1].to_lowercase());
    let action = FateAction::from_phrase(&phrase)?;
    let complement = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Some((action, complement))
}

/// Pull the first standalone `max`/`min` token out of the complement.
fn extract_forced(complement: &str) -> (Option<ForcedOutcome>, String) {
    let tokens: Vec<&str> = complement.split_whitespace().collect();

    for (index, token) in tokens.iter().enumerate() {
        let forced = match token.to_lowercase().as_str() {
            "max" => ForcedOutcome::Max,
            "min" => ForcedOutcome::Min,
            _ => continue,
        };

        let rest = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, t)| *t)
            .collect::<Vec<_>>()
            .join(" ");
        return (Some(forced), rest);
    }

    (None, tokens.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roll(text: &str) -> RollRequest {
        match parse_roll(text, false) {
            Some(ParseOutcome::Roll(request)) => request,
            other => panic!("{text:?} did not parse as a roll: {other:?}"),
        }
    }

    #[test]
    fn test_standard_roll_defaults() {
        let request = roll("d20");
        assert_eq!(request.kind, RollKind::Standard { sides: 20 });
        assert_eq!(request.count, 1);
        assert!(request.modifiers.is_empty());
        assert_eq!(request.trailer, None);
    }

    #[test]
    fn test_standard_roll_with_modifiers_and_trailer() {
        let request = roll("2D6 + 3 -1 furtividade no escuro");
        assert_eq!(request.kind, RollKind::Standard { sides: 6 });
        assert_eq!(request.count, 2);
        assert_eq!(request.modifiers, vec![3, -1]);
        assert_eq!(request.trailer.as_deref(), Some("furtividade no escuro"));
    }

    #[test]
    fn test_standard_roll_limits() {
        assert_eq!(parse_roll("0d6", false), None);
        assert_eq!(parse_roll("101d6", false), None);
        assert_eq!(parse_roll("d0", false), None);
        assert_eq!(parse_roll("d1000001", false), None);
        assert_eq!(parse_roll("d20+99999999999", false), None);
        assert_eq!(roll("100d1000000").count, 100);
    }

    #[test]
    fn test_non_rolls() {
        for text in ["hello", "dado", "d", "2d", "xd20", " d20", "d20+", "!ban d20"] {
            assert_eq!(parse_roll(text, false), None, "{text:?}");
        }
    }

    #[test]
    fn test_fate_roll_without_action_requirement() {
        let request = roll("df+2 alguma coisa");
        assert_eq!(request.kind, RollKind::Fate);
        assert_eq!(request.count, 1);
        assert_eq!(request.modifiers, vec![2]);
        assert_eq!(request.action, None);
        assert_eq!(request.trailer.as_deref(), Some("alguma coisa"));
    }

    #[test]
    fn test_four_fate_dice_need_an_action() {
        assert_eq!(parse_roll("4df", false), Some(ParseOutcome::MissingAction));
        assert_eq!(
            parse_roll("4df correr muito", false),
            Some(ParseOutcome::MissingAction)
        );
        assert_eq!(
            parse_roll("4df atacarei", false),
            Some(ParseOutcome::MissingAction)
        );
    }

    #[test]
    fn test_four_fate_dice_action_and_complement() {
        let request = roll("4dF+1   CRIAR   vantagem  no   terreno");
        assert_eq!(request.action, Some(FateAction::CreateAdvantage));
        assert_eq!(request.modifiers, vec![1]);
        assert_eq!(request.trailer.as_deref(), Some("no terreno"));

        let request = roll("4df superar");
        assert_eq!(request.action, Some(FateAction::Overcome));
        assert_eq!(request.trailer, None);
    }

    #[test]
    fn test_forced_outcome_requires_test_mode() {
        let request = roll("4df atacar max");
        assert_eq!(request.forced, None);
        assert_eq!(request.trailer.as_deref(), Some("max"));

        let Some(ParseOutcome::Roll(request)) = parse_roll("4df atacar com MAX força min", true)
        else {
            panic!("expected a roll");
        };
        // first match wins, the later token stays in the complement
        assert_eq!(request.forced, Some(ForcedOutcome::Max));
        assert_eq!(request.trailer.as_deref(), Some("com força min"));
    }

    #[test]
    fn test_forced_outcome_ignored_for_other_counts() {
        let Some(ParseOutcome::Roll(request)) = parse_roll("3df atacar max", true) else {
            panic!("expected a roll");
        };
        assert_eq!(request.forced, None);
        assert_eq!(request.trailer.as_deref(), Some("atacar max"));
    }

    #[test]
    fn test_forced_token_must_stand_alone() {
        let Some(ParseOutcome::Roll(request)) = parse_roll("4df defender maxi minimo", true)
        else {
            panic!("expected a roll");
        };
        assert_eq!(request.forced, None);
        assert_eq!(request.trailer.as_deref(), Some("maxi minimo"));
    }
}
