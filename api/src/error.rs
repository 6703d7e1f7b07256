use crate::clock::GameState;
use crate::{BetId, FixtureId, ParticipantId};

/// Failures raised while turning a snapshot into leaderboard data.
///
/// Every variant is fatal for the snapshot: the engine has no partial-success
/// mode, so a single corrupt fixture makes the whole board unavailable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("fixture {fixture_id} is finished but has no final score")]
    MissingActualScore { fixture_id: FixtureId },

    #[error("bet {bet_id} is attached to fixture {attached_to} but references fixture {references}")]
    ForeignBet {
        bet_id: BetId,
        attached_to: FixtureId,
        references: FixtureId,
    },

    #[error("participant {owner_id} has no display name on any bet")]
    UnnamedOwner { owner_id: ParticipantId },

    #[error("participant {owner_id} has more than one bet on fixture {fixture_id}")]
    DuplicateBet {
        owner_id: ParticipantId,
        fixture_id: FixtureId,
    },

    #[error("bet {bet_id} carries {points} points, which matches no scoring tier")]
    UnknownTier { bet_id: BetId, points: u32 },

    #[error("start time {raw:?} of fixture {fixture_id} does not map to a single instant in the reference zone")]
    AmbiguousStartTime { fixture_id: FixtureId, raw: String },

    #[error("start time {raw:?} of fixture {fixture_id} is not an ISO-8601 timestamp")]
    MalformedStartTime { fixture_id: FixtureId, raw: String },

    #[error("betting on fixture {fixture_id} is closed ({state})")]
    BettingClosed { fixture_id: FixtureId, state: GameState },

    #[error("fixture {fixture_id} is not finished yet")]
    TournamentInProgress { fixture_id: FixtureId },
}

impl EngineError {
    /// Data-integrity failures point at a defect in the upstream data source.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            EngineError::MissingActualScore { .. }
                | EngineError::ForeignBet { .. }
                | EngineError::UnnamedOwner { .. }
                | EngineError::DuplicateBet { .. }
                | EngineError::UnknownTier { .. }
        )
    }
}
