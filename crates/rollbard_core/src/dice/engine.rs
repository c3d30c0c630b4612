use rand::Rng;

use super::{
    FateAction, ForcedOutcome, ParseOutcome, RollKind, RollRequest, RollResult, SpecialCase,
    fate_glyph, tier_label,
};
use crate::config::MediaConfig;

/// Messages produced by a roll, plus the audio cue it earned (if any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    pub messages: Vec<String>,
    pub cue: Option<FateAction>,
    /// Absent when no dice were drawn
    pub result: Option<RollResult>,
}

impl RollOutcome {
    fn text(messages: Vec<String>) -> Self {
        Self {
            messages,
            cue: None,
            result: None,
        }
    }
}

/// Executes roll requests and renders their results
#[derive(Debug, Clone, Default)]
pub struct RollEngine {
    media: MediaConfig,
}

impl RollEngine {
    pub fn new(media: MediaConfig) -> Self {
        Self { media }
    }

    /// Answer a parsed roll message. Banned users get the decoy before anything
    /// else is looked at, including a missing 4df action.
    pub fn respond<R: Rng + ?Sized>(
        &self,
        outcome: &ParseOutcome,
        mention: &str,
        banned: bool,
        rng: &mut R,
    ) -> RollOutcome {
        if banned {
            return self.decoy(mention);
        }

        match outcome {
            ParseOutcome::MissingAction => RollOutcome::text(vec![missing_action_prompt(mention)]),
            ParseOutcome::Roll(request) => self.roll(request, mention, false, rng),
        }
    }

    pub fn roll<R: Rng + ?Sized>(
        &self,
        request: &RollRequest,
        mention: &str,
        banned: bool,
        rng: &mut R,
    ) -> RollOutcome {
        if banned {
            return self.decoy(mention);
        }

        let result = draw(request, rng);
        let (messages, cue) = match request.kind {
            RollKind::Standard { .. } => (vec![standard_line(request, &result, mention)], None),
            RollKind::Fate => self.fate_messages(request, &result, mention),
        };

        tracing::debug!(
            count = request.count,
            total = result.total,
            special = ?result.special,
            "rolled"
        );

        RollOutcome {
            messages,
            cue,
            result: Some(result),
        }
    }

    /// Fixed reply sent to banned users instead of a result
    pub fn decoy(&self, mention: &str) -> RollOutcome {
        RollOutcome::text(vec![
            format!("Desculpe {mention}, não vou rolar nada para você."),
            "Mas caso queira falar comigo, resolva esta simples questão de matemática:".to_string(),
            self.media.decoy_url.clone(),
        ])
    }

    fn fate_messages(
        &self,
        request: &RollRequest,
        result: &RollResult,
        mention: &str,
    ) -> (Vec<String>, Option<FateAction>) {
        let line = fate_line(request, result, mention);

        match (result.special, request.action) {
            (SpecialCase::AllSuccess, Some(FateAction::Attack)) => (
                vec![
                    "Black Flash!".to_string(),
                    self.media.flourish_url.clone(),
                    line,
                ],
                Some(FateAction::Attack),
            ),
            (SpecialCase::AllFailure, _) => (vec![line, self.media.failure_url.clone()], None),
            (SpecialCase::AllSuccess, action) => (vec![line], action),
            (SpecialCase::None, _) => (vec![line], None),
        }
    }
}

/// Prompt for a 4df roll that did not name an action
pub fn missing_action_prompt(mention: &str) -> String {
    let names = FateAction::ALL.map(|a| format!("`{}`", a.label()));
    format!(
        "{mention} em `4df` você precisa escolher uma ação: {}, {}, {} ou {}.",
        names[0], names[1], names[2], names[3]
    )
}

fn draw<R: Rng + ?Sized>(request: &RollRequest, rng: &mut R) -> RollResult {
    let rolls: Vec<i64> = match (request.kind, request.forced) {
        (RollKind::Standard { sides }, _) => (0..request.count)
            .map(|_| rng.random_range(1..=i64::from(sides)))
            .collect(),
        (RollKind::Fate, Some(ForcedOutcome::Max)) if request.count == 4 => vec![1; 4],
        (RollKind::Fate, Some(ForcedOutcome::Min)) if request.count == 4 => vec![-1; 4],
        (RollKind::Fate, _) => (0..request.count)
            .map(|_| rng.random_range(-1..=1))
            .collect(),
    };

    let modifier_sum = request.modifier_sum();
    let total = rolls.iter().sum::<i64>() + modifier_sum;

    let (tier, special) = match request.kind {
        RollKind::Standard { .. } => (None, SpecialCase::None),
        RollKind::Fate => {
            let special = if request.count != 4 {
                SpecialCase::None
            } else if rolls.iter().all(|&r| r == 1) {
                SpecialCase::AllSuccess
            } else if rolls.iter().all(|&r| r == -1) {
                SpecialCase::AllFailure
            } else {
                SpecialCase::None
            };
            (Some(tier_label(total)), special)
        }
    };

    RollResult {
        rolls,
        modifier_sum,
        total,
        tier,
        special,
    }
}

fn standard_line(request: &RollRequest, result: &RollResult, mention: &str) -> String {
    let rolls = result
        .rolls
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut parts = vec![format!("{mention} rolled: [{rolls}]")];
    let modifiers = request.modifier_display();
    if !modifiers.is_empty() {
        parts.push(modifiers);
    }
    parts.push(format!("(**Total: {}**)", result.total));
    if let Some(trailer) = &request.trailer {
        parts.push(trailer.clone());
    }
    parts.join(" ")
}

fn fate_line(request: &RollRequest, result: &RollResult, mention: &str) -> String {
    let dice = result
        .rolls
        .iter()
        .map(|&r| fate_glyph(r).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let dice = match result.special {
        SpecialCase::None => dice,
        _ => format!("**{dice}**"),
    };

    let mut line = format!(
        "{mention} rolled: [{dice}]{} (**Total: {}**) | Escala: **{}**",
        request.modifier_display(),
        result.total,
        result.tier.unwrap_or_else(|| tier_label(result.total)),
    );
    if let Some(action) = request.action {
        line.push_str(&format!(" | Ação: **{action}**"));
    }
    if let Some(trailer) = &request.trailer {
        line.push_str(&format!(" → '{trailer}'"));
    }
    line
}
