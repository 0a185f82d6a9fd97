//! Errors returned by the pairing engine and the draft service.

use thiserror::Error;

use crate::storage::StorageError;

/// Every rejected operation surfaces as one of these.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Invalid roster size {0}: a draft needs 4, 6 or 8 players")]
    InvalidRosterSize(usize),

    #[error("Invalid round count {0}: a draft plays 3 or 4 rounds")]
    InvalidRoundCount(u32),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid score {player1_score}-{player2_score}: at most {max} games per player")]
    InvalidScore {
        player1_score: u32,
        player2_score: u32,
        max: u32,
    },

    #[error("Round {round} is not ready: {pending} match(es) still pending")]
    RoundNotReady { round: u32, pending: usize },

    #[error("Unknown {kind}: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    #[error("A player named {0:?} already exists")]
    DuplicatePlayerName(String),

    #[error("Delete not allowed: {0}")]
    DeleteNotAllowed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DraftError {
    pub fn unknown(kind: &'static str, id: impl std::fmt::Display) -> Self {
        DraftError::UnknownEntity {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T, E = DraftError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DraftError::InvalidRosterSize(5).to_string(),
            "Invalid roster size 5: a draft needs 4, 6 or 8 players"
        );
        assert_eq!(
            DraftError::RoundNotReady {
                round: 2,
                pending: 1
            }
            .to_string(),
            "Round 2 is not ready: 1 match(es) still pending"
        );
        assert_eq!(
            DraftError::unknown("tournament", "abc").to_string(),
            "Unknown tournament: abc"
        );
    }

    #[test]
    fn test_storage_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: DraftError = StorageError::from(io).into();
        assert!(matches!(err, DraftError::Storage(_)));
    }
}
