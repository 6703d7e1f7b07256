use crate::state::messages::{NetworkRequest, NetworkResponse};
use betboard_api::client::{ApiError, BetboardApi};
use betboard_api::{BetId, FixtureId, Score, TournamentId};
use log::{debug, error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

pub struct NetworkWorker {
    client: BetboardApi,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
    /// Target of `RefreshSnapshot`.
    current: Option<TournamentId>,
}

impl NetworkWorker {
    pub fn new(
        client: BetboardApi,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            client,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
            current: None,
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            let mut about = None;
            let result = match request {
                NetworkRequest::LoadTournaments => {
                    self.start_loading_animation().await;
                    self.handle_load_tournaments().await
                }
                NetworkRequest::LoadSnapshot { tournament_id } => {
                    self.current = Some(tournament_id);
                    about = Some(tournament_id);
                    self.start_loading_animation().await;
                    self.handle_load_snapshot(tournament_id).await
                }
                NetworkRequest::RefreshSnapshot => {
                    let Some(tournament_id) = self.current else {
                        debug!("refresh skipped: no tournament selected");
                        continue;
                    };
                    about = Some(tournament_id);
                    self.start_loading_animation().await;
                    self.handle_load_snapshot(tournament_id).await
                }
                NetworkRequest::SubmitBet { tournament_id, fixture_id, bet_id, prediction, hidden } => {
                    about = Some(tournament_id);
                    self.start_loading_animation().await;
                    self.handle_submit_bet(tournament_id, fixture_id, bet_id, prediction, hidden)
                        .await
                }
            };

            debug!("network request complete");
            self.stop_loading_animation(result.is_ok()).await;

            let response = result.unwrap_or_else(|err| NetworkResponse::Error {
                tournament_id: about,
                message: err.to_string(),
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_tournaments(&self) -> Result<NetworkResponse, ApiError> {
        debug!("loading tournament list");
        let tournaments = self.client.fetch_tournaments().await?;
        Ok(NetworkResponse::TournamentsLoaded { tournaments })
    }

    async fn handle_load_snapshot(&self, tournament_id: TournamentId) -> Result<NetworkResponse, ApiError> {
        debug!("loading snapshot for tournament {tournament_id}");
        let tournament = self.client.fetch_tournament(tournament_id).await?;
        Ok(NetworkResponse::SnapshotLoaded { tournament })
    }

    async fn handle_submit_bet(
        &self,
        tournament_id: TournamentId,
        fixture_id: FixtureId,
        bet_id: Option<BetId>,
        prediction: Score,
        hidden: bool,
    ) -> Result<NetworkResponse, ApiError> {
        let bet = match bet_id {
            Some(bet_id) => {
                self.client
                    .update_bet(bet_id, fixture_id, prediction, hidden)
                    .await?
            }
            None => self.client.place_bet(fixture_id, prediction, hidden).await?,
        };
        info!("saved bet {} on fixture {fixture_id}: {prediction}", bet.id);
        Ok(NetworkResponse::BetSaved { tournament_id, bet })
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}
