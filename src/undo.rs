use std::collections::HashSet;

use tracing::debug;

use crate::errors::EngineError;
use crate::store::MatchStore;
use crate::types::RoundKey;

/// Revert the most recently confirmed result. Clears that match, deletes
/// every match in every round strictly after it in play order, and prunes
/// the completion log down to results that still stand. Returns the round
/// the bracket falls back to.
pub fn undo_last(
    store: &mut MatchStore,
    completion_log: &mut Vec<String>,
) -> Result<RoundKey, EngineError> {
    let last_id = match completion_log.last() {
        Some(id) => id.clone(),
        None => return Err(EngineError::NothingToUndo),
    };
    let undone = store
        .get(&last_id)
        .ok_or_else(|| EngineError::UnknownMatch(last_id.clone()))?;
    let round_key = undone.round_key;
    let ordinal = undone.round;

    completion_log.pop();
    store.clear_winner(&last_id)?;

    let doomed: HashSet<String> = store
        .iter()
        .filter(|m| m.round > ordinal)
        .map(|m| m.id.clone())
        .collect();
    let dropped = doomed.len();
    store.remove_all(&doomed);

    completion_log.retain(|id| store.get(id).is_some_and(|m| m.winner_id.is_some()));

    debug!(match_id = %last_id, round = %round_key, dropped, "undid last result");
    Ok(round_key)
}
