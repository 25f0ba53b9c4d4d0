pub mod engine;
pub mod errors;
pub mod pairing;
pub mod rankings;
pub mod store;
pub mod topology;
pub mod types;
mod undo;

pub use engine::Tournament;
pub use errors::EngineError;
pub use rankings::calculate_rankings;
pub use store::MatchStore;
pub use topology::{topology, RoundPlan, SourceRule, Topology};
pub use types::{
    Bracket, Match, Player, Ranking, RoundKey, TournamentConfig, TournamentSnapshot,
    MAX_FIELD_SIZE, MIN_FIELD_SIZE,
};
