use tracing::{debug, error};

use crate::errors::EngineError;
use crate::store::MatchStore;
use crate::types::{RoundKey, MAX_FIELD_SIZE, MIN_FIELD_SIZE};

// ── Source rules ───────────────────────────────────────────────────────

/// How a round's candidate list is produced once its inputs resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceRule {
    /// Opening round: the shuffled field plus the computed byes.
    InitialDraw,
    /// Winners of every match in the named round, bye winners included.
    WinnersOf(RoundKey),
    /// Losers of every non-bye match in the named round.
    LosersOf(RoundKey),
    /// Losers-bracket merge: winners of `survivors` interleaved with the
    /// players dropping out of `dropping`, survivor first.
    LoserMerge {
        survivors: RoundKey,
        dropping: RoundKey,
    },
    /// The finals: winners-side champion against losers-side champion.
    Finalists {
        winners: RoundKey,
        losers: RoundKey,
    },
}

impl SourceRule {
    pub fn sources(&self) -> Vec<RoundKey> {
        match *self {
            SourceRule::InitialDraw => Vec::new(),
            SourceRule::WinnersOf(key) | SourceRule::LosersOf(key) => vec![key],
            SourceRule::LoserMerge { survivors, dropping } => vec![survivors, dropping],
            SourceRule::Finalists { winners, losers } => vec![winners, losers],
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoundPlan {
    pub key: RoundKey,
    pub rule: SourceRule,
}

// ── Topology ───────────────────────────────────────────────────────────

/// The full shape of one double-elimination bracket: slot arithmetic plus
/// the ordered round plan. The reset match is not part of the plan; it is
/// materialized conditionally at the very end.
#[derive(Clone, Debug)]
pub struct Topology {
    pub player_count: usize,
    pub bracket_size: usize,
    pub byes: usize,
    pub rounds: Vec<RoundPlan>,
}

impl Topology {
    /// Number of winners-bracket rounds, log2 of the bracket size.
    pub fn depth(&self) -> u8 {
        self.bracket_size.trailing_zeros() as u8
    }

    pub fn first_round_real_matches(&self) -> usize {
        (self.player_count - self.byes) / 2
    }

    pub fn winners_final(&self) -> RoundKey {
        RoundKey::Winners(self.depth())
    }

    pub fn losers_final(&self) -> RoundKey {
        RoundKey::Losers(2 * self.depth() - 2)
    }

    /// The round eliminating the eventual 4th place finisher.
    pub fn losers_prefinal(&self) -> RoundKey {
        RoundKey::Losers(2 * self.depth() - 3)
    }

    pub fn index_of(&self, key: RoundKey) -> Option<usize> {
        self.rounds.iter().position(|plan| plan.key == key)
    }

    pub fn plan(&self, key: RoundKey) -> Option<&RoundPlan> {
        self.rounds.iter().find(|plan| plan.key == key)
    }

    /// 1-based position of a round in play order. The reset match sits one
    /// past the planned list.
    pub fn ordinal(&self, key: RoundKey) -> u32 {
        if key == RoundKey::GrandFinal {
            return self.rounds.len() as u32 + 1;
        }
        match self.index_of(key) {
            Some(idx) => idx as u32 + 1,
            None => {
                debug_assert!(false, "round {key} is not part of this bracket");
                0
            }
        }
    }

    /// Candidate list for a rule, or `None` while any source round still
    /// has an open match. Callers re-check after every mutation.
    pub fn sources_for(&self, rule: SourceRule, store: &MatchStore) -> Option<Vec<u32>> {
        match rule {
            SourceRule::InitialDraw => None,
            SourceRule::WinnersOf(key) => round_winners(store, key),
            SourceRule::LosersOf(key) => round_losers(store, key),
            SourceRule::LoserMerge { survivors, dropping } => {
                let kept = round_winners(store, survivors)?;
                let dropped = round_losers(store, dropping)?;
                Some(interleave(kept, dropped))
            }
            SourceRule::Finalists { winners, losers } => {
                let from_winners = round_winners(store, winners)?;
                let from_losers = round_winners(store, losers)?;
                if from_winners.len() != 1 || from_losers.len() != 1 {
                    debug_assert!(
                        false,
                        "finals expect one champion per side, got {} and {}",
                        from_winners.len(),
                        from_losers.len()
                    );
                    error!(
                        winners = from_winners.len(),
                        losers = from_losers.len(),
                        "finals sources are malformed"
                    );
                    return None;
                }
                Some(vec![from_winners[0], from_losers[0]])
            }
        }
    }
}

/// Build the topology for a field. Sizes follow the next power of two, so
/// 17 through 23 players land in a 32-slot bracket with the remainder as
/// byes.
pub fn topology(player_count: usize) -> Result<Topology, EngineError> {
    if !(MIN_FIELD_SIZE..=MAX_FIELD_SIZE).contains(&player_count) {
        return Err(EngineError::UnsupportedFieldSize(player_count));
    }
    let bracket_size = player_count.next_power_of_two();
    let byes = bracket_size - player_count;
    let depth = bracket_size.trailing_zeros() as u8;

    let mut rounds = Vec::new();
    rounds.push(RoundPlan {
        key: RoundKey::Winners(1),
        rule: SourceRule::InitialDraw,
    });
    rounds.push(RoundPlan {
        key: RoundKey::Losers(1),
        rule: SourceRule::LosersOf(RoundKey::Winners(1)),
    });
    for k in 2..=depth {
        rounds.push(RoundPlan {
            key: RoundKey::Winners(k),
            rule: SourceRule::WinnersOf(RoundKey::Winners(k - 1)),
        });
        rounds.push(RoundPlan {
            key: RoundKey::Losers(2 * k - 2),
            rule: SourceRule::LoserMerge {
                survivors: RoundKey::Losers(2 * k - 3),
                dropping: RoundKey::Winners(k),
            },
        });
        if 2 * k - 1 <= 2 * depth - 2 {
            rounds.push(RoundPlan {
                key: RoundKey::Losers(2 * k - 1),
                rule: SourceRule::WinnersOf(RoundKey::Losers(2 * k - 2)),
            });
        }
    }
    if depth >= 3 {
        rounds.push(RoundPlan {
            key: RoundKey::SeventhEighth,
            rule: SourceRule::LosersOf(RoundKey::Losers(2 * depth - 5)),
        });
        rounds.push(RoundPlan {
            key: RoundKey::FifthSixth,
            rule: SourceRule::LosersOf(RoundKey::Losers(2 * depth - 4)),
        });
    }
    rounds.push(RoundPlan {
        key: RoundKey::Final,
        rule: SourceRule::Finalists {
            winners: RoundKey::Winners(depth),
            losers: RoundKey::Losers(2 * depth - 2),
        },
    });

    debug!(
        player_count,
        bracket_size,
        byes,
        rounds = rounds.len(),
        "built bracket topology"
    );
    Ok(Topology {
        player_count,
        bracket_size,
        byes,
        rounds,
    })
}

fn round_winners(store: &MatchStore, key: RoundKey) -> Option<Vec<u32>> {
    let mut out = Vec::new();
    for m in store.by_round(key) {
        out.push(m.winner_id?);
    }
    Some(out)
}

fn round_losers(store: &MatchStore, key: RoundKey) -> Option<Vec<u32>> {
    let mut out = Vec::new();
    for m in store.by_round(key) {
        if m.is_bye {
            continue;
        }
        if m.winner_id.is_none() {
            return None;
        }
        if let Some(loser) = m.loser_id() {
            out.push(loser);
        }
    }
    Some(out)
}

fn interleave(kept: Vec<u32>, dropped: Vec<u32>) -> Vec<u32> {
    let mut out = Vec::with_capacity(kept.len() + dropped.len());
    let mut kept = kept.into_iter();
    let mut dropped = dropped.into_iter();
    loop {
        match (kept.next(), dropped.next()) {
            (Some(a), Some(b)) => {
                out.push(a);
                out.push(b);
            }
            (Some(a), None) => out.push(a),
            (None, Some(b)) => out.push(b),
            (None, None) => break,
        }
    }
    out
}
