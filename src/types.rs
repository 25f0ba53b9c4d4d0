use serde::{Deserialize, Serialize};
use std::fmt;

// ── Constants ──────────────────────────────────────────────────────────

pub const MIN_FIELD_SIZE: usize = 4;
pub const MAX_FIELD_SIZE: usize = 512;

// ── Players ────────────────────────────────────────────────────────────

/// A competitor as the host application hands it over. `opponents` is the
/// host-owned record of prior opponents and is only read for rematch
/// avoidance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub opponents: Vec<u32>,
}

// ── Rounds ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bracket {
    Winner,
    Loser,
    Placement,
}

/// Identity of one round. Serialized as its short tag ("w3", "l5", "p78",
/// "p56", "gf1", "gf2") so match ids and snapshots stay compact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RoundKey {
    Winners(u8),
    Losers(u8),
    SeventhEighth,
    FifthSixth,
    Final,
    GrandFinal,
}

impl RoundKey {
    pub fn tag(&self) -> String {
        self.to_string()
    }

    pub fn label(&self) -> String {
        match self {
            RoundKey::Winners(n) => format!("Winners Round {n}"),
            RoundKey::Losers(n) => format!("Losers Round {n}"),
            RoundKey::SeventhEighth => "7th Place Match".to_string(),
            RoundKey::FifthSixth => "5th Place Match".to_string(),
            RoundKey::Final => "Grand Finals".to_string(),
            RoundKey::GrandFinal => "Grand Finals Reset".to_string(),
        }
    }

    pub fn bracket(&self) -> Bracket {
        match self {
            RoundKey::Winners(_) | RoundKey::Final | RoundKey::GrandFinal => Bracket::Winner,
            RoundKey::Losers(_) => Bracket::Loser,
            RoundKey::SeventhEighth | RoundKey::FifthSixth => Bracket::Placement,
        }
    }
}

impl fmt::Display for RoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundKey::Winners(n) => write!(f, "w{n}"),
            RoundKey::Losers(n) => write!(f, "l{n}"),
            RoundKey::SeventhEighth => write!(f, "p78"),
            RoundKey::FifthSixth => write!(f, "p56"),
            RoundKey::Final => write!(f, "gf1"),
            RoundKey::GrandFinal => write!(f, "gf2"),
        }
    }
}

impl From<RoundKey> for String {
    fn from(key: RoundKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for RoundKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "p78" => return Ok(RoundKey::SeventhEighth),
            "p56" => return Ok(RoundKey::FifthSixth),
            "gf1" => return Ok(RoundKey::Final),
            "gf2" => return Ok(RoundKey::GrandFinal),
            _ => {}
        }
        if let Some(rest) = value.strip_prefix('w') {
            if let Ok(num) = rest.parse::<u8>() {
                if num >= 1 {
                    return Ok(RoundKey::Winners(num));
                }
            }
        }
        if let Some(rest) = value.strip_prefix('l') {
            if let Ok(num) = rest.parse::<u8>() {
                if num >= 1 {
                    return Ok(RoundKey::Losers(num));
                }
            }
        }
        Err(format!("unrecognized round tag: {value}"))
    }
}

// ── Matches ────────────────────────────────────────────────────────────

/// One match in the bracket. Round identity always travels on the match;
/// nothing ever parses it back out of the id string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub round_key: RoundKey,
    pub round: u32,
    pub match_number: u32,
    pub bracket: Bracket,
    pub player1_id: u32,
    pub player2_id: Option<u32>,
    pub is_bye: bool,
    pub winner_id: Option<u32>,
    pub description: String,
}

impl Match {
    pub fn involves(&self, player_id: u32) -> bool {
        self.player1_id == player_id || self.player2_id == Some(player_id)
    }

    /// The defeated participant. Byes and undecided matches have none.
    pub fn loser_id(&self) -> Option<u32> {
        if self.is_bye {
            return None;
        }
        let winner = self.winner_id?;
        if winner == self.player1_id {
            self.player2_id
        } else {
            Some(self.player1_id)
        }
    }
}

// ── Rankings ───────────────────────────────────────────────────────────

/// Final placements 1 through 8. Slots stay unset while the deciding
/// matches are open, or forever in fields too small to fill them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub first: Option<u32>,
    pub second: Option<u32>,
    pub third: Option<u32>,
    pub fourth: Option<u32>,
    pub fifth: Option<u32>,
    pub sixth: Option<u32>,
    pub seventh: Option<u32>,
    pub eighth: Option<u32>,
}

// ── Config ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TournamentConfig {
    /// Seed for the opening draw. `None` draws fresh from the clock.
    pub shuffle_seed: Option<u64>,
    /// When true the losers-side finalist can force one reset match.
    pub grand_final_reset: bool,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        TournamentConfig {
            shuffle_seed: None,
            grand_final_reset: true,
        }
    }
}

// ── Snapshot ───────────────────────────────────────────────────────────

/// The entire durable state of a tournament. Serializing and restoring
/// this triple verbatim reproduces the engine exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSnapshot {
    pub matches: Vec<Match>,
    pub completion_log: Vec<String>,
    pub current_round: RoundKey,
}
