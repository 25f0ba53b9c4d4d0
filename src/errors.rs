use thiserror::Error;

use crate::types::{MAX_FIELD_SIZE, MIN_FIELD_SIZE};

/// Everything that can go wrong inside the engine. Winner validation,
/// unknown ids and empty-log undo are recoverable results the host is
/// expected to handle; a structural mismatch means the bracket tables
/// themselves are inconsistent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("winner {winner_id} is not valid for match {match_id}: not a participant, or the match is already decided")]
    InvalidWinner { match_id: String, winner_id: u32 },

    #[error("unknown match id {0}")]
    UnknownMatch(String),

    #[error("completion log is empty, nothing to undo")]
    NothingToUndo,

    #[error("bracket structure violated: {0}")]
    StructuralMismatch(String),

    #[error("field size {0} is outside the supported range {min}..={max}", min = MIN_FIELD_SIZE, max = MAX_FIELD_SIZE)]
    UnsupportedFieldSize(usize),

    #[error("duplicate player id {0}")]
    DuplicatePlayer(u32),

    #[error("snapshot does not describe a reachable tournament state: {0}")]
    CorruptSnapshot(String),
}
