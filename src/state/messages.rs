use crate::state::network::LoadingState;
use betboard_api::{Bet, BetId, FixtureId, Score, Tournament, TournamentId, TournamentSummary};
use crossterm::event::KeyEvent;

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadTournaments,
    LoadSnapshot { tournament_id: TournamentId },
    /// Re-fetch whichever tournament was loaded last.
    RefreshSnapshot,
    SubmitBet {
        tournament_id: TournamentId,
        fixture_id: FixtureId,
        /// `Some` edits the existing bet, `None` places a new one.
        bet_id: Option<BetId>,
        prediction: Score,
        hidden: bool,
    },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    TournamentsLoaded { tournaments: Vec<TournamentSummary> },
    SnapshotLoaded { tournament: Tournament },
    BetSaved { tournament_id: TournamentId, bet: Bet },
    Error {
        /// Tournament the failed request was about; `None` for the list.
        tournament_id: Option<TournamentId>,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    /// Once a second: fixture states and countdowns move with the clock.
    ClockTick,
}
