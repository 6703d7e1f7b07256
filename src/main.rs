mod app;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::credentials::load_token;
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use betboard_api::client::BetboardApi;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, info};
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(log::LevelFilter::Trace)?;
    tui_logger::set_default_level(log::LevelFilter::Error);

    let settings = AppSettings::load();
    let token = load_token();
    let client = BetboardApi::new(settings.api_url.clone())
        .with_token(token)
        .with_reference_zone(settings.reference_zone);
    info!(
        "api {} ({}), reference zone {}",
        settings.api_url,
        if client.has_token() { "signed in" } else { "anonymous" },
        settings.reference_zone
    );
    let refresh_every = settings.refresh_interval;

    let app = Arc::new(Mutex::new(App::new(settings, client.has_token())));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(client, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Periodic snapshot refresh thread
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone(), refresh_every);
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Clock tick thread: kickoffs flip fixtures to live without any new data
    let tick_tx = ui_event_tx.clone();
    let clock_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if tick_tx.send(UiEvent::ClockTick).await.is_err() {
                break;
            }
        }
    });

    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    network_task.abort();
    periodic_task.abort();
    clock_task.abort();

    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("betboard {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "betboard - score prediction leaderboard in the terminal

Usage:
  betboard
  betboard --help
  betboard --version

Environment (also read from ./.env):
  BETBOARD_API_URL           Tournament API base URL (default http://localhost:8000/api)
  BETBOARD_TOKEN             Bearer token (default: contents of ~/.config/betboard/token)
  BETBOARD_TOURNAMENT        Tournament id to open
  BETBOARD_USER_ID           Your participant id; reveals your hidden bets and enables betting
  BETBOARD_REFERENCE_OFFSET  Timezone offset kickoffs are shown in (default +03:00)
  BETBOARD_REFRESH_SECS      Seconds between refreshes (default 30)
  BETBOARD_LOG               Log level: error, warn, info, debug, trace (default error)"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let selected = app.lock().await.selected_tournament();
            let _ = network_requests.send(NetworkRequest::LoadTournaments).await;
            if let Some(tournament_id) = selected {
                let _ = network_requests
                    .send(NetworkRequest::LoadSnapshot { tournament_id })
                    .await;
            }
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Resize | UiEvent::ClockTick => true,
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::TournamentsLoaded { tournaments } => {
            let mut guard = app.lock().await;
            let to_load = guard.on_tournaments_loaded(tournaments);
            drop(guard);
            if let Some(tournament_id) = to_load {
                let _ = network_requests
                    .send(NetworkRequest::LoadSnapshot { tournament_id })
                    .await;
            }
        }
        NetworkResponse::SnapshotLoaded { tournament } => {
            let mut guard = app.lock().await;
            guard.on_snapshot_loaded(tournament);
        }
        NetworkResponse::BetSaved { tournament_id, bet } => {
            let mut guard = app.lock().await;
            guard.on_bet_saved(tournament_id, bet);
            drop(guard);
            // Re-sync so points and other participants' changes come through.
            let _ = network_requests
                .send(NetworkRequest::LoadSnapshot { tournament_id })
                .await;
        }
        NetworkResponse::Error { tournament_id, message } => {
            error!("Network error: {message}");
            let mut guard = app.lock().await;
            guard.on_network_error(tournament_id, message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    // Best effort: this also runs from the panic hook.
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
