use crate::clock::{ReferenceZone, parse_start_instant};
use crate::leaderboard::validate;
use crate::wire::{
    BetCreateRequest, BetResponse, BetUpdateRequest, ErrorDetail, FixtureResponse, TournamentResponse,
};
use crate::{
    Bet, BetId, EngineError, Fixture, FixtureId, Score, Team, Tournament, TournamentId,
    TournamentSummary,
};
use log::debug;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Client for the tournament service REST API.
#[derive(Debug, Clone)]
pub struct BetboardApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    zone: ReferenceZone,
}

impl Default for BetboardApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error for {1}: {0}")]
    Network(reqwest::Error, String),
    #[error("API error for {1}: {0}")]
    Api(reqwest::Error, String),
    #[error("Parse error for {1}: {0}")]
    Parsing(reqwest::Error, String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not signed in or token expired ({0})")]
    Unauthorized(String),
    #[error("Rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("Data unavailable: {0}")]
    Snapshot(#[from] EngineError),
}

impl BetboardApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("betboard/0.1 (terminal leaderboard)")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
            timeout: Duration::from_secs(10),
            zone: ReferenceZone::default(),
        }
    }

    /// Bearer token from the credential store. Without one, only public
    /// endpoints work.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Zone that naive kickoff times in snapshots are read in.
    pub fn with_reference_zone(mut self, zone: ReferenceZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub async fn fetch_tournaments(&self) -> ApiResult<Vec<TournamentSummary>> {
        let url = format!("{}/tournaments", self.base_url);
        let raw: Vec<TournamentResponse> = self.send(Method::GET, &url, None::<&()>).await?;
        Ok(raw
            .into_iter()
            .map(|t| TournamentSummary { id: t.id, name: t.name, finished: t.finished })
            .collect())
    }

    /// Fetch one tournament with its fixtures and nested bets, validated.
    ///
    /// A snapshot that fails validation is an error as a whole; there is no
    /// partially usable board.
    pub async fn fetch_tournament(&self, id: TournamentId) -> ApiResult<Tournament> {
        let url = format!("{}/tournaments/{id}", self.base_url);
        let raw: TournamentResponse = self.send(Method::GET, &url, None::<&()>).await?;
        let tournament = map_tournament(raw, self.zone)?;
        validate(&tournament)?;
        debug!(
            "loaded tournament {} with {} fixtures",
            tournament.id,
            tournament.fixtures.len()
        );
        Ok(tournament)
    }

    pub async fn place_bet(&self, fixture_id: FixtureId, prediction: Score, hidden: bool) -> ApiResult<Bet> {
        let url = format!("{}/bets", self.base_url);
        let body = BetCreateRequest {
            game_id: fixture_id,
            team1_score: prediction.home,
            team2_score: prediction.away,
            hidden,
        };
        let raw: BetResponse = self.send(Method::POST, &url, Some(&body)).await?;
        Ok(map_bet(raw, fixture_id))
    }

    pub async fn update_bet(
        &self,
        bet_id: BetId,
        fixture_id: FixtureId,
        prediction: Score,
        hidden: bool,
    ) -> ApiResult<Bet> {
        let url = format!("{}/bets/{bet_id}", self.base_url);
        let body = BetUpdateRequest {
            team1_score: prediction.home,
            team2_score: prediction.away,
            hidden,
        };
        let raw: BetResponse = self.send(Method::PUT, &url, Some(&body)).await?;
        Ok(map_bet(raw, fixture_id))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url).timeout(self.timeout);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned()));
        }

        if status.is_client_error() {
            let detail = response
                .json::<ErrorDetail>()
                .await
                .ok()
                .and_then(|d| d.message())
                .unwrap_or_else(|| status.to_string());
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound(format!("{url}: {detail}")),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(detail),
                _ => ApiError::Rejected { status: status.as_u16(), detail },
            });
        }

        match response.error_for_status() {
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
            Ok(_) => Err(ApiError::Rejected {
                status: status.as_u16(),
                detail: "unexpected status".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: wire types → validated domain types
// ---------------------------------------------------------------------------

fn map_tournament(raw: TournamentResponse, zone: ReferenceZone) -> Result<Tournament, EngineError> {
    let tournament_id = raw.id;
    let fixtures = raw
        .games
        .into_iter()
        .map(|g| map_fixture(g, tournament_id, zone))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Tournament {
        id: tournament_id,
        name: raw.name,
        logo: raw.logo.filter(|l| !l.is_empty()),
        fixtures,
    })
}

fn map_fixture(
    raw: FixtureResponse,
    tournament_id: TournamentId,
    zone: ReferenceZone,
) -> Result<Fixture, EngineError> {
    let start_time = parse_start_instant(raw.id, &raw.start_time, zone)?;
    let score = if raw.finished {
        raw.team1_score
            .zip(raw.team2_score)
            .map(|(home, away)| Score::new(home, away))
    } else {
        None
    };
    let fixture_id = raw.id;

    Ok(Fixture {
        id: fixture_id,
        tournament_id: raw.tournament_id.unwrap_or(tournament_id),
        title: raw.title.filter(|t| !t.trim().is_empty()),
        home: Team { name: raw.team1, emblem: raw.team1_emblem },
        away: Team { name: raw.team2, emblem: raw.team2_emblem },
        start_time,
        finished: raw.finished,
        score,
        bets: raw.bets.into_iter().map(|b| map_bet(b, fixture_id)).collect(),
    })
}

/// `fixture_id` fills in for documents that omit `game_id` (nested bets).
fn map_bet(raw: BetResponse, fixture_id: FixtureId) -> Bet {
    Bet {
        id: raw.id,
        owner_id: raw.owner_id,
        owner_name: raw.owner_name,
        fixture_id: raw.game_id.unwrap_or(fixture_id),
        prediction: Score::new(raw.team1_score, raw.team2_score),
        hidden: raw.hidden,
        points: raw.points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use serde_json::json;

    fn snapshot_json() -> serde_json::Value {
        json!({
            "id": 3,
            "name": "Euro 2024",
            "logo": "https://img/euro.png",
            "finished": false,
            "games": [
                {
                    "id": 11,
                    "title": "Group A",
                    "team1": "Germany",
                    "team2": "Scotland",
                    "start_time": "2024-06-14T22:00:00+03:00",
                    "finished": true,
                    "team1_score": 5,
                    "team2_score": 1,
                    "bets": [
                        {"id": 1, "game_id": 11, "owner_id": 7, "owner_name": "ann",
                         "team1_score": 2, "team2_score": 0, "points": 1, "hidden": false}
                    ]
                },
                {
                    "id": 12,
                    "team1": "Hungary",
                    "team2": "Switzerland",
                    "start_time": "2024-06-15T13:00:00Z",
                    "finished": false,
                    "team1_score": 0,
                    "team2_score": 0,
                    "bets": [
                        {"id": 2, "owner_id": 8, "owner_name": "bob",
                         "team1_score": 1, "team2_score": 1, "hidden": true}
                    ]
                }
            ]
        })
    }

    #[tokio::test]
    async fn fetch_tournament_maps_snapshot_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tournaments/3")
            .match_header("authorization", "Bearer s3cret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(snapshot_json().to_string())
            .create_async()
            .await;

        let api = BetboardApi::new(server.url()).with_token(Some("s3cret".into()));
        let t = api.fetch_tournament(3).await.expect("snapshot should load");
        mock.assert_async().await;

        assert_eq!(t.name, "Euro 2024");
        assert_eq!(t.fixtures.len(), 2);

        let opener = t.find_fixture(11).unwrap();
        assert_eq!(opener.start_time, Utc.with_ymd_and_hms(2024, 6, 14, 19, 0, 0).unwrap());
        assert_eq!(opener.score, Some(Score::new(5, 1)));
        assert_eq!(opener.title.as_deref(), Some("Group A"));

        let open = t.find_fixture(12).unwrap();
        assert_eq!(open.score, None, "pre-kickoff zeros are not a result");
        assert_eq!(open.bets[0].fixture_id, 12);
        assert!(open.bets[0].hidden);
        assert_eq!(open.tournament_id, 3);
    }

    #[tokio::test]
    async fn naive_start_time_is_read_in_reference_zone() {
        let mut body = snapshot_json();
        body["games"][1]["start_time"] = json!("2024-06-15T16:00:00");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tournaments/3")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(2)
            .create_async()
            .await;

        let t = BetboardApi::new(server.url()).fetch_tournament(3).await.unwrap();
        let kickoff = Utc.with_ymd_and_hms(2024, 6, 15, 13, 0, 0).unwrap();
        assert_eq!(t.find_fixture(12).unwrap().start_time, kickoff);

        let utc = BetboardApi::new(server.url())
            .with_reference_zone(ReferenceZone::utc())
            .fetch_tournament(3)
            .await
            .unwrap();
        assert_eq!(utc.find_fixture(12).unwrap().start_time, kickoff + chrono::TimeDelta::hours(3));
    }

    #[tokio::test]
    async fn malformed_start_time_fails_the_snapshot() {
        let mut body = snapshot_json();
        body["games"][1]["start_time"] = json!("next saturday");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tournaments/3")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let err = BetboardApi::new(server.url()).fetch_tournament(3).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Snapshot(EngineError::MalformedStartTime { fixture_id: 12, .. })
        ));
    }

    #[tokio::test]
    async fn finished_fixture_without_score_fails_the_snapshot() {
        let mut body = snapshot_json();
        body["games"][0]["team2_score"] = serde_json::Value::Null;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tournaments/3")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let err = BetboardApi::new(server.url()).fetch_tournament(3).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Snapshot(EngineError::MissingActualScore { fixture_id: 11 })
        ));
    }

    #[tokio::test]
    async fn fetch_tournaments_lists_summaries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tournaments")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"id": 1, "name": "Serie A", "logo": "", "finished": true, "games": []},
                    {"id": 3, "name": "Euro 2024", "logo": "x"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let list = BetboardApi::new(server.url()).fetch_tournaments().await.unwrap();
        assert_eq!(
            list,
            vec![
                TournamentSummary { id: 1, name: "Serie A".into(), finished: true },
                TournamentSummary { id: 3, name: "Euro 2024".into(), finished: false },
            ]
        );
    }

    #[tokio::test]
    async fn place_bet_posts_prediction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bets")
            .match_body(Matcher::Json(json!({
                "game_id": 12, "team1_score": 2, "team2_score": 1, "hidden": true
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"id": 40, "game_id": 12, "owner_id": 7, "owner_name": "ann",
                       "team1_score": 2, "team2_score": 1, "points": 0, "hidden": true})
                .to_string(),
            )
            .create_async()
            .await;

        let bet = BetboardApi::new(server.url())
            .with_token(Some("t".into()))
            .place_bet(12, Score::new(2, 1), true)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(bet.id, 40);
        assert_eq!(bet.prediction, Score::new(2, 1));
        assert_eq!(bet.fixture_id, 12);
    }

    #[tokio::test]
    async fn late_bet_update_surfaces_server_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/bets/40")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Cannot place or change bet after the game has started"}"#)
            .create_async()
            .await;

        let err = BetboardApi::new(server.url())
            .update_bet(40, 12, Score::new(0, 0), false)
            .await
            .unwrap_err();
        match err {
            ApiError::Rejected { status, detail } => {
                assert_eq!(status, 400);
                assert!(detail.contains("after the game has started"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_tournament_and_bad_token_are_distinguished() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tournaments/404")
            .with_status(404)
            .with_body(r#"{"detail":"Tournament not found"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/tournaments/1")
            .with_status(401)
            .create_async()
            .await;

        let api = BetboardApi::new(server.url());
        assert!(matches!(api.fetch_tournament(404).await, Err(ApiError::NotFound(_))));
        assert!(matches!(api.fetch_tournament(1).await, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn empty_token_counts_as_signed_out() {
        assert!(!BetboardApi::default().with_token(Some("  ".into())).has_token());
        assert!(BetboardApi::default().with_token(Some("abc".into())).has_token());
    }
}
