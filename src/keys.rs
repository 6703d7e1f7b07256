use crate::app::{App, MenuItem};
use crate::state::app_state::BetDraft;
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;

    // The draft editor captures input until it is submitted or cancelled.
    if guard.state.my_bets.draft.is_some() {
        let mut request = None;
        match (key_event.code, key_event.modifiers) {
            (Char('c'), KeyModifiers::CONTROL) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (KeyCode::Esc, _) => guard.cancel_draft(),
            (KeyCode::Enter, _) => {
                let clock = guard.clock();
                request = guard.submit_draft(&clock);
            }
            (Char('+') | Char('=') | KeyCode::Up, _) => bump(&mut guard, |d| d.bump_home(1)),
            (Char('-') | KeyCode::Down, _) => bump(&mut guard, |d| d.bump_home(-1)),
            (Char(']') | KeyCode::Right, _) => bump(&mut guard, |d| d.bump_away(1)),
            (Char('[') | KeyCode::Left, _) => bump(&mut guard, |d| d.bump_away(-1)),
            (Char('h'), _) => bump(&mut guard, |d| d.toggle_hidden()),
            _ => {}
        }
        drop(guard);
        if let Some(request) = request {
            let _ = network_requests.send(request).await;
        }
        return;
    }

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Leaderboard),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Standings),
        (_, Char('3'), _) => guard.update_tab(MenuItem::MyBets),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Leaderboard grid
        (MenuItem::Leaderboard, Char('j') | KeyCode::Down, _) => guard.board_rows(1),
        (MenuItem::Leaderboard, Char('k') | KeyCode::Up, _) => guard.board_rows(-1),
        (MenuItem::Leaderboard, Char('l') | KeyCode::Right, _) => guard.board_columns(1),
        (MenuItem::Leaderboard, Char('h') | KeyCode::Left, _) => guard.board_columns(-1),
        (MenuItem::Leaderboard, KeyCode::PageDown, _) => guard.board_rows(10),
        (MenuItem::Leaderboard, KeyCode::PageUp, _) => guard.board_rows(-10),

        // Standings
        (MenuItem::Standings, Char('j') | KeyCode::Down, _) => guard.standings_down(),
        (MenuItem::Standings, Char('k') | KeyCode::Up, _) => guard.standings_up(),

        // My bets
        (MenuItem::MyBets, Char('j') | KeyCode::Down, _) => guard.my_bets_down(),
        (MenuItem::MyBets, Char('k') | KeyCode::Up, _) => guard.my_bets_up(),
        (MenuItem::MyBets, KeyCode::Enter | Char('e'), _) => {
            let clock = guard.clock();
            guard.start_draft(&clock);
        }

        // Global
        (_, Char('s'), _) => guard.toggle_sort_order(),
        (_, Char('t'), _) => {
            if let Some(tournament_id) = guard.cycle_tournament() {
                drop(guard);
                let _ = network_requests
                    .send(NetworkRequest::LoadSnapshot { tournament_id })
                    .await;
                return;
            }
        }
        (_, Char('r'), _) => {
            let selected = guard.selected_tournament();
            drop(guard);
            let request = match selected {
                Some(tournament_id) => NetworkRequest::LoadSnapshot { tournament_id },
                None => NetworkRequest::LoadTournaments,
            };
            let _ = network_requests.send(request).await;
            return;
        }
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }
}

fn bump(app: &mut App, edit: impl FnOnce(&mut BetDraft)) {
    if let Some(draft) = app.draft_mut() {
        edit(draft);
    }
}
