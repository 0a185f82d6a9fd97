//! Core data models for the draft tracker.

mod ids;
mod match_record;
mod player;
mod stats;
mod tournament;

pub use ids::*;
pub use match_record::*;
pub use player::*;
pub use stats::*;
pub use tournament::*;
