use crate::store::MatchStore;
use crate::topology::Topology;
use crate::types::{Match, Ranking, RoundKey};

/// Project placements 1 through 8 out of the store. Pure and idempotent;
/// call it whenever a caller wants standings, finished bracket or not.
///
/// First and second stay open while a reset is still possible: a decided
/// reset match settles them, otherwise the finals only count when the
/// winners-side champion (player 1) held.
pub fn calculate_rankings(store: &MatchStore, topology: &Topology, reset_enabled: bool) -> Ranking {
    let mut ranking = Ranking::default();

    if let Some(reset) = single(store, RoundKey::GrandFinal) {
        if reset.winner_id.is_some() {
            ranking.first = reset.winner_id;
            ranking.second = reset.loser_id();
        }
    } else if let Some(finals) = single(store, RoundKey::Final) {
        if let Some(winner) = finals.winner_id {
            if winner == finals.player1_id || !reset_enabled {
                ranking.first = Some(winner);
                ranking.second = finals.loser_id();
            }
        }
    }

    ranking.third = round_loser(store, topology.losers_final());
    ranking.fourth = round_loser(store, topology.losers_prefinal());

    if let Some(m) = single(store, RoundKey::FifthSixth) {
        if m.winner_id.is_some() {
            ranking.fifth = m.winner_id;
            ranking.sixth = m.loser_id();
        }
    }
    if let Some(m) = single(store, RoundKey::SeventhEighth) {
        if m.winner_id.is_some() {
            ranking.seventh = m.winner_id;
            ranking.eighth = m.loser_id();
        }
    }

    ranking
}

fn single(store: &MatchStore, key: RoundKey) -> Option<&Match> {
    store.by_round(key).into_iter().next()
}

fn round_loser(store: &MatchStore, key: RoundKey) -> Option<u32> {
    single(store, key)?.loser_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::topology;
    use crate::types::Bracket;

    fn make_match(key: RoundKey, p1: u32, p2: Option<u32>, winner: Option<u32>) -> Match {
        Match {
            id: format!("{}-1", key.tag()),
            round_key: key,
            round: 1,
            match_number: 1,
            bracket: key.bracket(),
            player1_id: p1,
            player2_id: p2,
            is_bye: p2.is_none(),
            winner_id: winner,
            description: key.label(),
        }
    }

    #[test]
    fn test_empty_store_ranks_nobody() {
        let topo = topology(8).unwrap();
        let store = MatchStore::new();
        assert_eq!(calculate_rankings(&store, &topo, true), Ranking::default());
    }

    #[test]
    fn test_outright_finals_win_settles_first_and_second() {
        let topo = topology(8).unwrap();
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Final, 1, Some(2), Some(1)))
            .unwrap();
        let ranking = calculate_rankings(&store, &topo, true);
        assert_eq!(ranking.first, Some(1));
        assert_eq!(ranking.second, Some(2));
    }

    #[test]
    fn test_first_and_second_wait_for_the_reset_match() {
        let topo = topology(8).unwrap();
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Final, 1, Some(2), Some(2)))
            .unwrap();
        store
            .insert(make_match(RoundKey::GrandFinal, 2, Some(1), None))
            .unwrap();

        let pending = calculate_rankings(&store, &topo, true);
        assert_eq!(pending.first, None);
        assert_eq!(pending.second, None);

        store.set_winner("gf2-1", 1).unwrap();
        let settled = calculate_rankings(&store, &topo, true);
        assert_eq!(settled.first, Some(1));
        assert_eq!(settled.second, Some(2));
    }

    #[test]
    fn test_reset_disabled_lets_the_losers_finalist_take_first() {
        let topo = topology(8).unwrap();
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Final, 1, Some(2), Some(2)))
            .unwrap();
        let ranking = calculate_rankings(&store, &topo, false);
        assert_eq!(ranking.first, Some(2));
        assert_eq!(ranking.second, Some(1));
    }

    #[test]
    fn test_lower_placements_read_their_rounds() {
        let topo = topology(8).unwrap();
        let mut store = MatchStore::new();
        store
            .insert(make_match(topo.losers_final(), 3, Some(4), Some(3)))
            .unwrap();
        store
            .insert(make_match(topo.losers_prefinal(), 4, Some(5), Some(4)))
            .unwrap();
        store
            .insert(make_match(RoundKey::FifthSixth, 5, Some(6), Some(5)))
            .unwrap();
        store
            .insert(make_match(RoundKey::SeventhEighth, 7, Some(8), Some(8)))
            .unwrap();

        let ranking = calculate_rankings(&store, &topo, true);
        assert_eq!(ranking.third, Some(4));
        assert_eq!(ranking.fourth, Some(5));
        assert_eq!(ranking.fifth, Some(5));
        assert_eq!(ranking.sixth, Some(6));
        assert_eq!(ranking.seventh, Some(8));
        assert_eq!(ranking.eighth, Some(7));
    }

    #[test]
    fn test_bye_in_a_deciding_round_leaves_the_slot_empty() {
        let topo = topology(8).unwrap();
        let mut store = MatchStore::new();
        store
            .insert(make_match(topo.losers_final(), 3, None, None))
            .unwrap();

        let ranking = calculate_rankings(&store, &topo, true);
        assert_eq!(ranking.third, None);
        assert_eq!(ranking.fourth, None);
        assert_eq!(ranking.fifth, None);
    }
}
