use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use crate::errors::EngineError;
use crate::pairing::pair;
use crate::rankings::calculate_rankings;
use crate::store::MatchStore;
use crate::topology::{topology, Topology};
use crate::types::{Match, Player, Ranking, RoundKey, TournamentConfig, TournamentSnapshot};
use crate::undo;

// ── Draw rng ───────────────────────────────────────────────────────────

struct DrawRng {
    state: u64,
}

impl DrawRng {
    fn new(seed: u64) -> Self {
        let mut state = seed;
        if state == 0 {
            state = 0x9E37_79B9_7F4A_7C15;
        }
        DrawRng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn shuffle(&mut self, items: &mut [u32]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u64() % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

// ── Tournament ─────────────────────────────────────────────────────────

/// A running double-elimination tournament. All mutation funnels through
/// `record_result`, `undo_last` and `reset`; every query is a plain read.
/// The durable state is exactly what `snapshot` returns.
#[derive(Clone, Debug)]
pub struct Tournament {
    players: Vec<Player>,
    players_by_id: HashMap<u32, Player>,
    config: TournamentConfig,
    topology: Topology,
    store: MatchStore,
    completion_log: Vec<String>,
    current_round: RoundKey,
}

impl Tournament {
    pub fn new(players: Vec<Player>, config: TournamentConfig) -> Result<Self, EngineError> {
        let topology = topology(players.len())?;
        let players_by_id = index_players(&players)?;

        let mut tournament = Tournament {
            players,
            players_by_id,
            config,
            topology,
            store: MatchStore::new(),
            completion_log: Vec::new(),
            current_round: RoundKey::Winners(1),
        };
        tournament.synthesize_first_round()?;
        tournament.advance();
        info!(
            players = tournament.players.len(),
            bracket_size = tournament.topology.bracket_size,
            byes = tournament.topology.byes,
            "tournament initialized"
        );
        Ok(tournament)
    }

    /// Rebuild an engine from a stored snapshot. The snapshot is taken
    /// verbatim; it only has to describe a state this engine could have
    /// reached.
    pub fn restore(
        players: Vec<Player>,
        config: TournamentConfig,
        snapshot: TournamentSnapshot,
    ) -> Result<Self, EngineError> {
        let topology = topology(players.len())?;
        let players_by_id = index_players(&players)?;

        if snapshot.current_round != RoundKey::GrandFinal
            && topology.index_of(snapshot.current_round).is_none()
        {
            return Err(EngineError::CorruptSnapshot(format!(
                "round {} is not part of a {}-player bracket",
                snapshot.current_round,
                players.len()
            )));
        }

        let mut store = MatchStore::new();
        for m in &snapshot.matches {
            if !players_by_id.contains_key(&m.player1_id)
                || m.player2_id.is_some_and(|p| !players_by_id.contains_key(&p))
            {
                return Err(EngineError::CorruptSnapshot(format!(
                    "match {} references an unknown player",
                    m.id
                )));
            }
            store.insert(m.clone()).map_err(|_| {
                EngineError::CorruptSnapshot(format!("duplicate match id {}", m.id))
            })?;
        }

        let mut seen = HashSet::new();
        for id in &snapshot.completion_log {
            if !seen.insert(id.clone()) {
                return Err(EngineError::CorruptSnapshot(format!(
                    "completion log repeats {id}"
                )));
            }
            let decided = store.get(id).is_some_and(|m| !m.is_bye && m.winner_id.is_some());
            if !decided {
                return Err(EngineError::CorruptSnapshot(format!(
                    "completion log references {id}, which is not a decided match"
                )));
            }
        }

        let tournament = Tournament {
            players,
            players_by_id,
            config,
            topology,
            store,
            completion_log: snapshot.completion_log,
            current_round: snapshot.current_round,
        };
        info!(
            players = tournament.players.len(),
            matches = tournament.store.len(),
            round = %tournament.current_round,
            "tournament restored from snapshot"
        );
        Ok(tournament)
    }

    /// Throw the bracket away and redraw. With no configured seed the new
    /// draw comes fresh from the clock.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        *self = Tournament::new(self.players.clone(), self.config.clone())?;
        Ok(())
    }

    pub fn reset_with_seed(&mut self, seed: u64) -> Result<(), EngineError> {
        let mut config = self.config.clone();
        config.shuffle_seed = Some(seed);
        *self = Tournament::new(self.players.clone(), config)?;
        Ok(())
    }

    /// Confirm a winner. The result lands in the completion log and the
    /// bracket advances as far as the new state allows.
    pub fn record_result(&mut self, match_id: &str, winner_id: u32) -> Result<(), EngineError> {
        let was_complete = self.is_complete();
        self.store.set_winner(match_id, winner_id)?;
        self.completion_log.push(match_id.to_string());
        debug!(match_id, winner_id, "recorded result");
        self.advance();
        if !was_complete && self.is_complete() {
            info!("tournament complete");
        }
        Ok(())
    }

    /// Take back the most recently confirmed result, deleting everything
    /// downstream of its round. Rounds whose inputs are still resolved
    /// grow back immediately, minus the undone result.
    pub fn undo_last(&mut self) -> Result<(), EngineError> {
        let round = undo::undo_last(&mut self.store, &mut self.completion_log)?;
        self.current_round = round;
        self.advance();
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn current_round(&self) -> RoundKey {
        self.current_round
    }

    /// Every synthesized match, in play order.
    pub fn matches(&self) -> Vec<&Match> {
        let mut out: Vec<&Match> = self.store.iter().collect();
        out.sort_by_key(|m| (m.round, m.match_number));
        out
    }

    pub fn matches_in_round(&self, key: RoundKey) -> Vec<&Match> {
        self.store.by_round(key)
    }

    /// Undecided non-bye matches, earliest round first.
    pub fn pending_matches(&self) -> Vec<&Match> {
        self.matches()
            .into_iter()
            .filter(|m| !m.is_bye && m.winner_id.is_none())
            .collect()
    }

    pub fn completion_log(&self) -> &[String] {
        &self.completion_log
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn config(&self) -> &TournamentConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn rankings(&self) -> Ranking {
        calculate_rankings(&self.store, &self.topology, self.config.grand_final_reset)
    }

    pub fn is_round_complete(&self, key: RoundKey) -> bool {
        let synthesized = match key {
            RoundKey::GrandFinal => !self.store.by_round(key).is_empty(),
            _ => self
                .topology
                .index_of(key)
                .is_some_and(|idx| idx < self.synthesized_rounds()),
        };
        synthesized
            && self
                .store
                .by_round(key)
                .iter()
                .all(|m| m.is_bye || m.winner_id.is_some())
    }

    pub fn is_complete(&self) -> bool {
        if let Some(reset) = self.store.by_round(RoundKey::GrandFinal).first() {
            return reset.winner_id.is_some();
        }
        let Some(finals) = self.store.by_round(RoundKey::Final).into_iter().next() else {
            return false;
        };
        match finals.winner_id {
            Some(winner) => !self.config.grand_final_reset || winner == finals.player1_id,
            None => false,
        }
    }

    pub fn snapshot(&self) -> TournamentSnapshot {
        TournamentSnapshot {
            matches: self.matches().into_iter().cloned().collect(),
            completion_log: self.completion_log.clone(),
            current_round: self.current_round,
        }
    }

    // ── Round synthesis ────────────────────────────────────────────────

    fn synthesize_first_round(&mut self) -> Result<(), EngineError> {
        let seed = self.config.shuffle_seed.unwrap_or_else(clock_seed);
        let mut rng = DrawRng::new(seed);
        let mut draw: Vec<u32> = self.players.iter().map(|p| p.id).collect();
        rng.shuffle(&mut draw);

        let key = RoundKey::Winners(1);
        let byes = self.topology.byes;
        let mut number = 1u32;
        for player_id in &draw[..byes] {
            let m = self.make_match(key, number, *player_id, None);
            self.store.insert(m)?;
            number += 1;
        }
        let field = draw[byes..].to_vec();
        let pairs = pair(&field, |a, b| self.have_met(a, b))?;
        for (a, b) in pairs {
            let m = self.make_match(key, number, a, Some(b));
            self.store.insert(m)?;
            number += 1;
        }
        self.current_round = key;
        debug!(matches = self.store.len(), byes, "synthesized opening round");
        Ok(())
    }

    /// The progression loop: keep synthesizing the next planned round
    /// while its sources are fully resolved, then try the conditional
    /// reset match. Parks as soon as inputs are missing. Bounded by the
    /// plan length.
    fn advance(&mut self) {
        let limit = self.topology.rounds.len() + 2;
        for _ in 0..limit {
            match self.advance_once() {
                Ok(true) => continue,
                Ok(false) => break,
                Err(err) => {
                    debug_assert!(false, "round synthesis failed: {err}");
                    error!(%err, "round synthesis failed, parking the bracket");
                    break;
                }
            }
        }
    }

    fn advance_once(&mut self) -> Result<bool, EngineError> {
        let next_index = self.synthesized_rounds();
        if next_index < self.topology.rounds.len() {
            let plan = self.topology.rounds[next_index].clone();
            let Some(candidates) = self.topology.sources_for(plan.rule, &self.store) else {
                return Ok(false);
            };
            self.synthesize_round(plan.key, candidates)?;
            return Ok(true);
        }
        self.try_create_reset_match()
    }

    fn synthesize_round(&mut self, key: RoundKey, candidates: Vec<u32>) -> Result<(), EngineError> {
        match key {
            RoundKey::SeventhEighth | RoundKey::FifthSixth => {
                if candidates.len() == 2 {
                    let m = self.make_match(key, 1, candidates[0], Some(candidates[1]));
                    self.store.insert(m)?;
                } else if !candidates.is_empty() {
                    warn!(
                        round = %key,
                        candidates = candidates.len(),
                        "placement round skipped, field too small"
                    );
                }
            }
            RoundKey::Final => {
                if candidates.len() != 2 {
                    return Err(EngineError::StructuralMismatch(format!(
                        "finals expect two finalists, got {}",
                        candidates.len()
                    )));
                }
                let m = self.make_match(key, 1, candidates[0], Some(candidates[1]));
                self.store.insert(m)?;
            }
            _ => {
                let mut field = candidates;
                let bye = if field.len() % 2 != 0 { field.pop() } else { None };
                let pairs = pair(&field, |a, b| self.have_met(a, b))?;
                let mut number = 1u32;
                for (a, b) in pairs {
                    let m = self.make_match(key, number, a, Some(b));
                    self.store.insert(m)?;
                    number += 1;
                }
                if let Some(player_id) = bye {
                    let m = self.make_match(key, number, player_id, None);
                    self.store.insert(m)?;
                }
            }
        }
        self.current_round = key;
        debug!(round = %key, matches = self.store.by_round(key).len(), "synthesized round");
        Ok(())
    }

    /// Once the finals are decided, a win by the losers-side finalist
    /// (player 2) forces one reset match; a winners-side win ends the
    /// bracket outright.
    fn try_create_reset_match(&mut self) -> Result<bool, EngineError> {
        if !self.config.grand_final_reset {
            return Ok(false);
        }
        if !self.store.by_round(RoundKey::GrandFinal).is_empty() {
            return Ok(false);
        }
        let reset = {
            let Some(finals) = self.store.by_round(RoundKey::Final).into_iter().next() else {
                return Ok(false);
            };
            let Some(winner) = finals.winner_id else {
                return Ok(false);
            };
            let Some(runner_up) = finals.player2_id else {
                return Ok(false);
            };
            if winner != runner_up {
                return Ok(false);
            }
            self.make_match(RoundKey::GrandFinal, 1, winner, Some(finals.player1_id))
        };
        self.store.insert(reset)?;
        self.current_round = RoundKey::GrandFinal;
        info!("losers-side finalist forced a bracket reset");
        Ok(true)
    }

    /// Number of planned rounds synthesized so far. Synthesis always runs
    /// as a prefix of the plan, so the current round pins it down.
    fn synthesized_rounds(&self) -> usize {
        if self.current_round == RoundKey::GrandFinal {
            return self.topology.rounds.len();
        }
        match self.topology.index_of(self.current_round) {
            Some(idx) => idx + 1,
            None => 0,
        }
    }

    /// Two players have met when the host's opponent history links them or
    /// any real match in this bracket already paired them.
    fn have_met(&self, a: u32, b: u32) -> bool {
        if let Some(player) = self.players_by_id.get(&a) {
            if player.opponents.contains(&b) {
                return true;
            }
        }
        if let Some(player) = self.players_by_id.get(&b) {
            if player.opponents.contains(&a) {
                return true;
            }
        }
        self.store
            .iter()
            .any(|m| !m.is_bye && m.involves(a) && m.involves(b))
    }

    fn make_match(&self, key: RoundKey, number: u32, player1: u32, player2: Option<u32>) -> Match {
        Match {
            id: format!("{}-{}", key.tag(), number),
            round_key: key,
            round: self.topology.ordinal(key),
            match_number: number,
            bracket: key.bracket(),
            player1_id: player1,
            player2_id: player2,
            is_bye: player2.is_none(),
            winner_id: None,
            description: key.label(),
        }
    }
}

fn index_players(players: &[Player]) -> Result<HashMap<u32, Player>, EngineError> {
    let mut by_id = HashMap::new();
    for player in players {
        if by_id.insert(player.id, player.clone()).is_some() {
            return Err(EngineError::DuplicatePlayer(player.id));
        }
    }
    Ok(by_id)
}
