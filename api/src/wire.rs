//! Serde shapes for the tournament service documents. These map to the
//! validated domain types in client.rs.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tournaments  (GET /tournaments, GET /tournaments/{id})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TournamentResponse {
    pub id: u64,
    pub name: String,
    pub logo: Option<String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub games: Vec<FixtureResponse>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FixtureResponse {
    pub id: u64,
    pub tournament_id: Option<u64>,
    pub title: Option<String>,
    pub team1: String,
    pub team2: String,
    pub team1_emblem: Option<String>,
    pub team2_emblem: Option<String>,
    /// ISO 8601; must carry an offset.
    pub start_time: String,
    #[serde(default)]
    pub finished: bool,
    // The service defaults both to 0 before kickoff; only trusted once finished.
    pub team1_score: Option<u16>,
    pub team2_score: Option<u16>,
    #[serde(default)]
    pub bets: Vec<BetResponse>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct BetResponse {
    pub id: u64,
    pub game_id: Option<u64>,
    pub owner_id: u64,
    pub owner_name: Option<String>,
    pub team1_score: u16,
    pub team2_score: u16,
    pub points: Option<u32>,
    #[serde(default)]
    pub hidden: bool,
}

// ---------------------------------------------------------------------------
// Bets  (POST /bets, PUT /bets/{id})
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BetCreateRequest {
    pub game_id: u64,
    pub team1_score: u16,
    pub team2_score: u16,
    pub hidden: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct BetUpdateRequest {
    pub team1_score: u16,
    pub team2_score: u16,
    pub hidden: bool,
}

/// Error body the service sends with 4xx responses.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ErrorDetail {
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
