use crate::state::app_settings::{AppSettings, config_path};
use crate::state::app_state::{AppState, BetDraft, Prefs};
use crate::state::messages::NetworkRequest;
use betboard_api::clock::GameClock;
use betboard_api::leaderboard::{UpcomingRow, upcoming_view};
use betboard_api::scoring::audit_points;
use betboard_api::{Bet, Tournament, TournamentId, TournamentSummary};
use log::{info, warn};
use std::path::{Path, PathBuf};

const PREFS_FILE: &str = "prefs.json";

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Leaderboard,
    Standings,
    MyBets,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
    /// `None` disables preference persistence.
    prefs_path: Option<PathBuf>,
}

impl App {
    pub fn new(settings: AppSettings, signed_in: bool) -> Self {
        let prefs_path = Some(config_path(PREFS_FILE));
        let prefs = prefs_path
            .as_ref()
            .and_then(|p| load_prefs(p).map_err(|e| info!("{e}")).ok())
            .unwrap_or_default();

        let mut app = Self {
            state: AppState::new(prefs),
            settings,
            prefs_path,
        };
        app.state.signed_in = signed_in;
        if let Some(id) = app.settings.tournament {
            app.state.selected_tournament = Some(id);
        }

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    /// An app that never touches the preferences file.
    #[cfg(test)]
    pub(crate) fn in_memory(settings: AppSettings) -> Self {
        Self {
            settings,
            state: AppState::new(Prefs::default()),
            prefs_path: None,
        }
    }

    /// One clock sample per render or submit.
    pub fn clock(&self) -> GameClock {
        GameClock::sample(self.settings.reference_zone)
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    /// Returns the tournament to load when none was chosen yet.
    pub fn on_tournaments_loaded(&mut self, tournaments: Vec<TournamentSummary>) -> Option<TournamentId> {
        self.state.tournaments = tournaments;
        if self.state.selected_tournament.is_some() {
            return None;
        }
        let pick = self
            .state
            .tournaments
            .iter()
            .find(|t| !t.finished)
            .or_else(|| self.state.tournaments.first())
            .map(|t| t.id)?;
        self.select_tournament(pick);
        Some(pick)
    }

    pub fn on_snapshot_loaded(&mut self, tournament: Tournament) {
        if self.state.selected_tournament != Some(tournament.id) {
            info!("dropping stale snapshot for tournament {}", tournament.id);
            return;
        }
        match audit_points(&tournament) {
            Ok(mismatches) => {
                for m in mismatches {
                    warn!(
                        "bet {} on fixture {}: upstream awarded {} points, local scoring gives {}",
                        m.bet_id, m.fixture_id, m.stored, m.computed
                    );
                }
            }
            Err(e) => warn!("points audit skipped: {e}"),
        }
        self.state.last_error = None;
        self.state.board.load(tournament);
    }

    pub fn on_bet_saved(&mut self, tournament_id: TournamentId, bet: Bet) {
        self.state.my_bets.draft = None;
        self.state.status = Some(format!("Bet saved: {}", bet.prediction));
        if let Some(t) = self.state.board.tournament.as_mut()
            && t.id == tournament_id
        {
            t.upsert_bet(bet);
        }
    }

    pub fn on_network_error(&mut self, tournament_id: Option<TournamentId>, message: String) {
        if tournament_id.is_some() && tournament_id != self.state.selected_tournament {
            info!("dropping stale error for tournament {tournament_id:?}: {message}");
            return;
        }
        self.on_error(message);
    }

    pub fn on_error(&mut self, message: String) {
        self.state.status = None;
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if next != MenuItem::MyBets {
            self.state.my_bets.draft = None;
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Tournament selection and ordering
    // -----------------------------------------------------------------------

    pub fn selected_tournament(&self) -> Option<TournamentId> {
        self.state.selected_tournament
    }

    /// Move to the next tournament in the list; returns it if it changed.
    pub fn cycle_tournament(&mut self) -> Option<TournamentId> {
        let list = &self.state.tournaments;
        if list.is_empty() {
            return None;
        }
        let next = match self
            .state
            .selected_tournament
            .and_then(|id| list.iter().position(|t| t.id == id))
        {
            Some(idx) => list[(idx + 1) % list.len()].id,
            None => list[0].id,
        };
        if Some(next) == self.state.selected_tournament {
            return None;
        }
        self.select_tournament(next);
        Some(next)
    }

    fn select_tournament(&mut self, id: TournamentId) {
        self.state.selected_tournament = Some(id);
        self.state.board.clear();
        self.state.my_bets = Default::default();
        self.state.standings_scroll = 0;
        self.persist_prefs();
    }

    pub fn toggle_sort_order(&mut self) {
        self.state.sort_order = self.state.sort_order.toggle();
        self.persist_prefs();
    }

    // -----------------------------------------------------------------------
    // Board scrolling
    // -----------------------------------------------------------------------

    pub fn board_rows(&mut self, delta: isize) {
        self.state.board.scroll_rows(delta);
    }

    pub fn board_columns(&mut self, delta: isize) {
        self.state.board.scroll_columns(delta);
    }

    pub fn standings_down(&mut self) {
        self.state.standings_scroll = self.state.standings_scroll.saturating_add(1);
    }

    pub fn standings_up(&mut self) {
        self.state.standings_scroll = self.state.standings_scroll.saturating_sub(1);
    }

    // -----------------------------------------------------------------------
    // My Bets: upcoming fixtures and the bet draft
    // -----------------------------------------------------------------------

    /// Fixtures the signed-in participant can still bet on. Empty when no
    /// participant is configured or no snapshot is loaded.
    pub fn upcoming_rows(&self, clock: &GameClock) -> Result<Vec<UpcomingRow>, String> {
        let (Some(tournament), Some(user_id)) = (&self.state.board.tournament, self.settings.user_id) else {
            return Ok(Vec::new());
        };
        upcoming_view(tournament, user_id, clock).map_err(|e| e.to_string())
    }

    pub fn my_bets_down(&mut self) {
        let len = self.upcoming_rows(&self.clock()).map(|r| r.len()).unwrap_or(0);
        if self.state.my_bets.selected + 1 < len {
            self.state.my_bets.selected += 1;
        }
    }

    pub fn my_bets_up(&mut self) {
        self.state.my_bets.selected = self.state.my_bets.selected.saturating_sub(1);
    }

    pub fn start_draft(&mut self, clock: &GameClock) {
        if !self.state.signed_in || self.settings.user_id.is_none() {
            self.on_error("Betting needs BETBOARD_USER_ID and a token".to_string());
            return;
        }
        let rows = match self.upcoming_rows(clock) {
            Ok(rows) => rows,
            Err(e) => return self.on_error(e),
        };
        if let Some(row) = rows.get(self.state.my_bets.selected) {
            self.state.status = None;
            self.state.my_bets.draft = Some(BetDraft::from_row(row));
        }
    }

    pub fn cancel_draft(&mut self) {
        self.state.my_bets.draft = None;
    }

    pub fn draft_mut(&mut self) -> Option<&mut BetDraft> {
        self.state.my_bets.draft.as_mut()
    }

    /// Gate the draft on the clock before anything goes over the wire. The
    /// draft is kept on failure so it can be corrected or cancelled.
    pub fn submit_draft(&mut self, clock: &GameClock) -> Option<NetworkRequest> {
        let draft = self.state.my_bets.draft?;
        let tournament = self.state.board.tournament.as_ref()?;
        let Some(fixture) = tournament.find_fixture(draft.fixture_id) else {
            self.on_error(format!("fixture {} is no longer in the snapshot", draft.fixture_id));
            return None;
        };
        if let Err(e) = clock.ensure_open(fixture) {
            self.on_error(e.to_string());
            self.state.my_bets.draft = None;
            return None;
        }
        Some(NetworkRequest::SubmitBet {
            tournament_id: tournament.id,
            fixture_id: draft.fixture_id,
            bet_id: draft.bet_id,
            prediction: draft.prediction,
            hidden: draft.hidden,
        })
    }

    // -----------------------------------------------------------------------
    // Preferences
    // -----------------------------------------------------------------------

    fn persist_prefs(&self) {
        let Some(path) = &self.prefs_path else {
            return;
        };
        if let Err(e) = save_prefs(path, &self.state.prefs()) {
            warn!("{e}");
        }
    }
}

fn save_prefs(path: &Path, prefs: &Prefs) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("create dir failed: {e}"))?;
    }
    let payload =
        serde_json::to_string_pretty(prefs).map_err(|e| format!("serialize prefs failed: {e}"))?;
    std::fs::write(path, payload).map_err(|e| format!("write prefs failed: {e}"))?;
    Ok(())
}

fn load_prefs(path: &Path) -> Result<Prefs, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("read prefs failed: {e}"))?;
    serde_json::from_str::<Prefs>(&content).map_err(|e| format!("parse prefs failed: {e}"))
}
