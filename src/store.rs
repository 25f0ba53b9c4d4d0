use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::errors::EngineError;
use crate::types::{Match, RoundKey};

/// Flat match container with an id index. Insertion order is synthesis
/// order; per-round ordering goes by match number.
#[derive(Clone, Debug, Default)]
pub struct MatchStore {
    matches: Vec<Match>,
    index: HashMap<String, usize>,
}

impl MatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a match. Byes resolve to player 1 on the spot; re-inserting an
    /// id is a structural fault, never a silent overwrite.
    pub fn insert(&mut self, mut m: Match) -> Result<(), EngineError> {
        if self.index.contains_key(&m.id) {
            return Err(EngineError::StructuralMismatch(format!(
                "match {} inserted twice",
                m.id
            )));
        }
        if m.is_bye && m.winner_id.is_none() {
            m.winner_id = Some(m.player1_id);
        }
        self.index.insert(m.id.clone(), self.matches.len());
        self.matches.push(m);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Match> {
        self.index.get(id).and_then(|idx| self.matches.get(*idx))
    }

    /// Matches of one round, ordered by match number.
    pub fn by_round(&self, key: RoundKey) -> Vec<&Match> {
        let mut out: Vec<&Match> = self
            .matches
            .iter()
            .filter(|m| m.round_key == key)
            .collect();
        out.sort_by_key(|m| m.match_number);
        out
    }

    pub fn set_winner(&mut self, id: &str, winner_id: u32) -> Result<(), EngineError> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| EngineError::UnknownMatch(id.to_string()))?;
        let m = &mut self.matches[idx];
        if m.winner_id.is_some() || !m.involves(winner_id) {
            return Err(EngineError::InvalidWinner {
                match_id: id.to_string(),
                winner_id,
            });
        }
        m.winner_id = Some(winner_id);
        Ok(())
    }

    pub fn clear_winner(&mut self, id: &str) -> Result<(), EngineError> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| EngineError::UnknownMatch(id.to_string()))?;
        self.matches[idx].winner_id = None;
        Ok(())
    }

    /// Drop a set of matches and rebuild the index.
    pub fn remove_all(&mut self, ids: &HashSet<String>) {
        if ids.is_empty() {
            return;
        }
        let before = self.matches.len();
        self.matches.retain(|m| !ids.contains(&m.id));
        self.index.clear();
        for (idx, m) in self.matches.iter().enumerate() {
            self.index.insert(m.id.clone(), idx);
        }
        debug!(removed = before - self.matches.len(), "removed matches");
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bracket;

    fn make_match(key: RoundKey, number: u32, p1: u32, p2: Option<u32>) -> Match {
        Match {
            id: format!("{}-{}", key.tag(), number),
            round_key: key,
            round: 1,
            match_number: number,
            bracket: key.bracket(),
            player1_id: p1,
            player2_id: p2,
            is_bye: p2.is_none(),
            winner_id: None,
            description: key.label(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Winners(1), 1, 1, Some(2)))
            .unwrap();
        assert_eq!(store.len(), 1);
        let m = store.get("w1-1").unwrap();
        assert_eq!(m.player1_id, 1);
        assert_eq!(m.winner_id, None);
        assert!(store.get("w1-2").is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Winners(1), 1, 1, Some(2)))
            .unwrap();
        let err = store
            .insert(make_match(RoundKey::Winners(1), 1, 3, Some(4)))
            .unwrap_err();
        assert!(matches!(err, EngineError::StructuralMismatch(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_bye_resolves_on_insert() {
        let mut store = MatchStore::new();
        store.insert(make_match(RoundKey::Winners(1), 1, 9, None)).unwrap();
        let m = store.get("w1-1").unwrap();
        assert!(m.is_bye);
        assert_eq!(m.winner_id, Some(9));
    }

    #[test]
    fn test_decided_bye_is_not_reresolved() {
        let mut store = MatchStore::new();
        let mut bye = make_match(RoundKey::Winners(1), 1, 9, None);
        bye.winner_id = Some(9);
        store.insert(bye).unwrap();
        assert_eq!(store.get("w1-1").unwrap().winner_id, Some(9));
    }

    #[test]
    fn test_set_winner_rejects_outsiders_and_double_reports() {
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Winners(1), 1, 1, Some(2)))
            .unwrap();

        let err = store.set_winner("w1-1", 3).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidWinner {
                match_id: "w1-1".to_string(),
                winner_id: 3,
            }
        );

        store.set_winner("w1-1", 2).unwrap();
        let err = store.set_winner("w1-1", 1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWinner { .. }));
        assert_eq!(store.get("w1-1").unwrap().winner_id, Some(2));
    }

    #[test]
    fn test_set_winner_unknown_match() {
        let mut store = MatchStore::new();
        let err = store.set_winner("w9-9", 1).unwrap_err();
        assert_eq!(err, EngineError::UnknownMatch("w9-9".to_string()));
    }

    #[test]
    fn test_by_round_orders_by_match_number() {
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Losers(2), 2, 3, Some(4)))
            .unwrap();
        store
            .insert(make_match(RoundKey::Losers(2), 1, 1, Some(2)))
            .unwrap();
        store
            .insert(make_match(RoundKey::Winners(1), 1, 5, Some(6)))
            .unwrap();
        let numbers: Vec<u32> = store
            .by_round(RoundKey::Losers(2))
            .iter()
            .map(|m| m.match_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_remove_all_reindexes() {
        let mut store = MatchStore::new();
        store
            .insert(make_match(RoundKey::Winners(1), 1, 1, Some(2)))
            .unwrap();
        store
            .insert(make_match(RoundKey::Winners(1), 2, 3, Some(4)))
            .unwrap();
        store
            .insert(make_match(RoundKey::Winners(2), 1, 5, Some(6)))
            .unwrap();

        let doomed: HashSet<String> = ["w1-1".to_string()].into_iter().collect();
        store.remove_all(&doomed);

        assert_eq!(store.len(), 2);
        assert!(store.get("w1-1").is_none());
        assert_eq!(store.get("w1-2").unwrap().player1_id, 3);
        assert_eq!(store.get("w2-1").unwrap().player1_id, 5);
        store.set_winner("w2-1", 6).unwrap();
        assert_eq!(store.get("w2-1").unwrap().winner_id, Some(6));
    }
}
