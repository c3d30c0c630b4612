//! Dice rolls: standard `NdS` rolls and Fate `Ndf` rolls.

use std::fmt;

mod engine;
mod parser;

pub use engine::{RollEngine, RollOutcome};
pub use parser::{ParseOutcome, parse_roll};

/// Largest number of dice accepted in one roll
pub const MAX_DICE: u32 = 100;
/// Largest die accepted in a standard roll
pub const MAX_SIDES: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollKind {
    Standard { sides: u32 },
    Fate,
}

/// Tactical category a 4-dice Fate roll is made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FateAction {
    Attack,
    Defend,
    CreateAdvantage,
    Overcome,
}

impl FateAction {
    pub const ALL: [FateAction; 4] = [
        FateAction::Attack,
        FateAction::Defend,
        FateAction::CreateAdvantage,
        FateAction::Overcome,
    ];

    /// Display name shown in roll results
    pub fn label(self) -> &'static str {
        match self {
            FateAction::Attack => "Atacar",
            FateAction::Defend => "Defender",
            FateAction::CreateAdvantage => "Criar Vantagem",
            FateAction::Overcome => "Superar",
        }
    }

    /// Match a whitespace-normalized, lowercase phrase
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        match phrase {
            "atacar" => Some(FateAction::Attack),
            "defender" => Some(FateAction::Defend),
            "criar vantagem" => Some(FateAction::CreateAdvantage),
            "superar" => Some(FateAction::Overcome),
            _ => None,
        }
    }
}

impl fmt::Display for FateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result override available to test-mode users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedOutcome {
    Max,
    Min,
}

/// A parsed roll, ready to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollRequest {
    pub kind: RollKind,
    pub count: u32,
    pub modifiers: Vec<i64>,
    /// Free text after the roll; for 4df this is the complement after the action
    pub trailer: Option<String>,
    pub action: Option<FateAction>,
    pub forced: Option<ForcedOutcome>,
}

impl RollRequest {
    pub fn modifier_sum(&self) -> i64 {
        self.modifiers.iter().sum()
    }

    /// Modifiers as typed, e.g. `+3-1`
    pub fn modifier_display(&self) -> String {
        self.modifiers.iter().map(|m| format!("{m:+}")).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCase {
    None,
    AllSuccess,
    AllFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollResult {
    /// Face values; Fate draws are -1, 0 or 1
    pub rolls: Vec<i64>,
    pub modifier_sum: i64,
    pub total: i64,
    /// Present for Fate rolls only
    pub tier: Option<&'static str>,
    pub special: SpecialCase,
}

/// Glyph shown for a Fate draw
pub fn fate_glyph(value: i64) -> char {
    match value {
        v if v < 0 => '-',
        0 => '0',
        _ => '+',
    }
}

/// Descriptive tier for a Fate total. Totals past either end clamp to the end tier.
pub fn tier_label(total: i64) -> &'static str {
    match total {
        t if t >= 9 => "Inominável",
        8 => "Lendário",
        7 => "Épico",
        6 => "Fantástico",
        5 => "Excepcional",
        4 => "Ótimo",
        3 => "Bom",
        2 => "Razoável",
        1 => "Regular",
        0 => "Medíocre",
        -1 => "Ruim",
        -2 => "Terrível",
        -3 => "Catastrófico",
        _ => "Horrível",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tier_boundaries() {
        let expected = [
            (9, "Inominável"),
            (8, "Lendário"),
            (7, "Épico"),
            (6, "Fantástico"),
            (5, "Excepcional"),
            (4, "Ótimo"),
            (3, "Bom"),
            (2, "Razoável"),
            (1, "Regular"),
            (0, "Medíocre"),
            (-1, "Ruim"),
            (-2, "Terrível"),
            (-3, "Catastrófico"),
            (-4, "Horrível"),
        ];
        for (total, label) in expected {
            assert_eq!(tier_label(total), label, "total {total}");
        }
    }

    #[test]
    fn test_tier_clamps_outside_the_scale() {
        assert_eq!(tier_label(42), "Inominável");
        assert_eq!(tier_label(i64::MAX), "Inominável");
        assert_eq!(tier_label(-17), "Horrível");
        assert_eq!(tier_label(i64::MIN), "Horrível");
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(fate_glyph(-1), '-');
        assert_eq!(fate_glyph(0), '0');
        assert_eq!(fate_glyph(1), '+');
    }

    #[test]
    fn test_modifier_display_keeps_signs() {
        let request = RollRequest {
            kind: RollKind::Standard { sides: 20 },
            count: 1,
            modifiers: vec![5, -2, 1],
            trailer: None,
            action: None,
            forced: None,
        };
        assert_eq!(request.modifier_display(), "+5-2+1");
        assert_eq!(request.modifier_sum(), 4);
    }

    #[test]
    fn test_action_phrases() {
        for action in FateAction::ALL {
            let phrase = action.label().to_lowercase();
            assert_eq!(FateAction::from_phrase(&phrase), Some(action));
        }
        assert_eq!(FateAction::from_phrase("fugir"), None);
    }
}
