use crate::snowman::PartId;

/// Configuration problems detected while building a game.
///
/// Gameplay itself never fails: input that a state forbids is dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("unknown snowman part: {0}")]
    UnknownPart(String),

    #[error("no target zone for part {0}")]
    MissingTarget(PartId),

    #[error("part {0} has more than one target zone")]
    DuplicateTarget(PartId),

    #[error("unknown game: {0}")]
    UnknownGame(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
