use crate::app::MenuItem;
use betboard_api::leaderboard::{SortOrder, UpcomingRow};
use betboard_api::{BetId, FixtureId, Score, Tournament, TournamentId, TournamentSummary};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Highest score the draft editor lets you type.
pub const MAX_GOALS: u16 = 99;

// ---------------------------------------------------------------------------
// Persisted preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub last_tournament: Option<TournamentId>,
}

// ---------------------------------------------------------------------------
// Board (snapshot + scroll position)
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BoardState {
    pub tournament: Option<Tournament>,
    /// First participant row shown in the grid.
    pub row_offset: usize,
    /// First fixture column shown in the grid.
    pub column_offset: usize,
    pub last_loaded_at: Option<DateTime<Local>>,
}

impl BoardState {
    /// Store a fresh snapshot. Scroll position survives a refresh of the same
    /// tournament and resets when the tournament changes.
    pub fn load(&mut self, tournament: Tournament) {
        let same = self.tournament.as_ref().map(|t| t.id) == Some(tournament.id);
        if !same {
            self.row_offset = 0;
            self.column_offset = first_open_column(&tournament);
        }
        self.clamp_offsets_for(&tournament);
        self.tournament = Some(tournament);
        self.last_loaded_at = Some(Local::now());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn scroll_rows(&mut self, delta: isize) {
        let max = self.participant_count().saturating_sub(1);
        self.row_offset = self.row_offset.saturating_add_signed(delta).min(max);
    }

    pub fn scroll_columns(&mut self, delta: isize) {
        let max = self.fixture_count().saturating_sub(1);
        self.column_offset = self.column_offset.saturating_add_signed(delta).min(max);
    }

    fn participant_count(&self) -> usize {
        let Some(t) = &self.tournament else {
            return 0;
        };
        let mut owners: Vec<_> = t.bets().map(|(_, b)| b.owner_id).collect();
        owners.sort_unstable();
        owners.dedup();
        owners.len()
    }

    fn fixture_count(&self) -> usize {
        self.tournament.as_ref().map(|t| t.fixtures.len()).unwrap_or(0)
    }

    fn clamp_offsets_for(&mut self, tournament: &Tournament) {
        self.column_offset = self
            .column_offset
            .min(tournament.fixtures.len().saturating_sub(1));
    }
}

/// Start the grid a couple of columns before the first unfinished fixture so
/// the latest results stay in view.
fn first_open_column(tournament: &Tournament) -> usize {
    tournament
        .fixtures_by_kickoff()
        .iter()
        .position(|f| !f.finished)
        .map(|idx| idx.saturating_sub(2))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Bet draft (My Bets tab)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetDraft {
    pub fixture_id: FixtureId,
    /// Existing bet being edited, if any.
    pub bet_id: Option<BetId>,
    pub prediction: Score,
    pub hidden: bool,
}

impl BetDraft {
    pub fn from_row(row: &UpcomingRow) -> Self {
        match &row.bet {
            Some(bet) => Self {
                fixture_id: row.fixture_id,
                bet_id: Some(bet.id),
                prediction: bet.prediction,
                hidden: bet.hidden,
            },
            None => Self {
                fixture_id: row.fixture_id,
                bet_id: None,
                prediction: Score::default(),
                hidden: false,
            },
        }
    }

    pub fn bump_home(&mut self, delta: i16) {
        self.prediction.home = bump(self.prediction.home, delta);
    }

    pub fn bump_away(&mut self, delta: i16) {
        self.prediction.away = bump(self.prediction.away, delta);
    }

    pub fn toggle_hidden(&mut self) {
        self.hidden = !self.hidden;
    }
}

fn bump(goals: u16, delta: i16) -> u16 {
    goals.saturating_add_signed(delta).min(MAX_GOALS)
}

#[derive(Debug, Default)]
pub struct MyBetsState {
    pub selected: usize,
    pub draft: Option<BetDraft>,
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    /// One-line feedback such as "bet saved".
    pub status: Option<String>,
    pub signed_in: bool,
    pub tournaments: Vec<TournamentSummary>,
    pub selected_tournament: Option<TournamentId>,
    pub sort_order: SortOrder,
    pub board: BoardState,
    pub standings_scroll: u16,
    pub my_bets: MyBetsState,
}

impl AppState {
    pub fn new(prefs: Prefs) -> Self {
        Self {
            sort_order: prefs.sort_order,
            selected_tournament: prefs.last_tournament,
            ..Self::default()
        }
    }

    pub fn prefs(&self) -> Prefs {
        Prefs {
            sort_order: self.sort_order,
            last_tournament: self.selected_tournament,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use betboard_api::{Bet, Fixture, Team};
    use chrono::{TimeZone, Utc};

    fn fixture(id: FixtureId, hour: u32, finished: bool, owners: &[u64]) -> Fixture {
        Fixture {
            id,
            tournament_id: 1,
            title: None,
            home: Team { name: format!("H{id}"), emblem: None },
            away: Team { name: format!("A{id}"), emblem: None },
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            finished,
            score: finished.then_some(Score::new(1, 0)),
            bets: owners
                .iter()
                .map(|&owner_id| Bet {
                    id: id * 100 + owner_id,
                    owner_id,
                    owner_name: Some(format!("p{owner_id}")),
                    fixture_id: id,
                    prediction: Score::new(1, 0),
                    hidden: false,
                    points: None,
                })
                .collect(),
        }
    }

    fn tournament(id: TournamentId, fixtures: Vec<Fixture>) -> Tournament {
        Tournament { id, name: format!("T{id}"), logo: None, fixtures }
    }

    #[test]
    fn new_tournament_opens_near_first_open_fixture() {
        let mut board = BoardState::default();
        board.load(tournament(
            1,
            vec![
                fixture(1, 10, true, &[7]),
                fixture(2, 11, true, &[7]),
                fixture(3, 12, true, &[7]),
                fixture(4, 13, false, &[7]),
                fixture(5, 14, false, &[]),
            ],
        ));
        assert_eq!(board.column_offset, 1);
        assert!(board.last_loaded_at.is_some());
    }

    #[test]
    fn refresh_keeps_scroll_but_switch_resets_it() {
        let fixtures = || vec![fixture(1, 10, false, &[7, 8, 9]), fixture(2, 11, false, &[7])];
        let mut board = BoardState::default();
        board.load(tournament(1, fixtures()));
        board.scroll_rows(2);
        board.scroll_columns(1);
        assert_eq!((board.row_offset, board.column_offset), (2, 1));

        board.load(tournament(1, fixtures()));
        assert_eq!((board.row_offset, board.column_offset), (2, 1));

        board.load(tournament(2, fixtures()));
        assert_eq!((board.row_offset, board.column_offset), (0, 0));
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut board = BoardState::default();
        board.load(tournament(1, vec![fixture(1, 10, false, &[7, 8])]));
        board.scroll_rows(10);
        assert_eq!(board.row_offset, 1);
        board.scroll_rows(-10);
        assert_eq!(board.row_offset, 0);
        board.scroll_columns(3);
        assert_eq!(board.column_offset, 0);
    }

    #[test]
    fn draft_starts_from_existing_bet_or_nil_nil() {
        let f = fixture(4, 13, false, &[7]);
        let with_bet = UpcomingRow {
            fixture_id: 4,
            start_time: f.start_time,
            home: f.home.clone(),
            away: f.away.clone(),
            bet: f.bets.first().cloned(),
        };
        let draft = BetDraft::from_row(&with_bet);
        assert_eq!(draft.bet_id, Some(407));
        assert_eq!(draft.prediction, Score::new(1, 0));

        let empty = UpcomingRow { bet: None, ..with_bet };
        let draft = BetDraft::from_row(&empty);
        assert_eq!(draft.bet_id, None);
        assert_eq!(draft.prediction, Score::new(0, 0));
        assert!(!draft.hidden);
    }

    #[test]
    fn draft_scores_stay_in_range() {
        let mut draft = BetDraft {
            fixture_id: 1,
            bet_id: None,
            prediction: Score::new(0, 98),
            hidden: false,
        };
        draft.bump_home(-1);
        draft.bump_away(1);
        draft.bump_away(1);
        draft.toggle_hidden();
        assert_eq!(draft.prediction, Score::new(0, MAX_GOALS));
        assert!(draft.hidden);
    }

    #[test]
    fn prefs_round_trip_through_state() {
        let prefs = Prefs { sort_order: SortOrder::Alphabetical, last_tournament: Some(3) };
        assert_eq!(AppState::new(prefs).prefs(), prefs);
        let parsed: Prefs = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, Prefs::default());
    }
}
