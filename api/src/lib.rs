pub mod client;
pub mod clock;
pub mod error;
pub mod leaderboard;
pub mod scoring;
pub mod wire;

pub use error::EngineError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type TournamentId = u64;
pub type FixtureId = u64;
pub type BetId = u64;
pub type ParticipantId = u64;

// ---------------------------------------------------------------------------
// Domain types: validated snapshot, independent of the REST wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub logo: Option<String>,
    pub fixtures: Vec<Fixture>,
}

impl Tournament {
    pub fn find_fixture(&self, fixture_id: FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == fixture_id)
    }

    /// Replace (or append) a participant's bet after a successful submit, so the
    /// board reflects it before the next refresh lands.
    pub fn upsert_bet(&mut self, bet: Bet) {
        let Some(fixture) = self.fixtures.iter_mut().find(|f| f.id == bet.fixture_id) else {
            return;
        };
        match fixture.bets.iter_mut().find(|b| b.owner_id == bet.owner_id) {
            Some(existing) => *existing = bet,
            None => fixture.bets.push(bet),
        }
    }

    /// All bets of the tournament, paired with the fixture they belong to.
    pub fn bets(&self) -> impl Iterator<Item = (&Fixture, &Bet)> {
        self.fixtures
            .iter()
            .flat_map(|f| f.bets.iter().map(move |b| (f, b)))
    }

    /// Fixtures ordered by kickoff, ties broken by id.
    pub fn fixtures_by_kickoff(&self) -> Vec<&Fixture> {
        let mut fixtures: Vec<&Fixture> = self.fixtures.iter().collect();
        fixtures.sort_by(|a, b| a.kickoff_order(b));
        fixtures
    }
}

/// Summary row from the tournament list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub name: String,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct Fixture {
    pub id: FixtureId,
    pub tournament_id: TournamentId,
    pub title: Option<String>,
    pub home: Team,
    pub away: Team,
    pub start_time: DateTime<Utc>,
    pub finished: bool,
    /// Final score; only meaningful once `finished` is set.
    pub score: Option<Score>,
    pub bets: Vec<Bet>,
}

impl Fixture {
    pub fn bet_of(&self, participant: ParticipantId) -> Option<&Bet> {
        self.bets.iter().find(|b| b.owner_id == participant)
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.home.name, self.away.name)
    }

    pub fn kickoff_order(&self, other: &Fixture) -> Ordering {
        self.start_time
            .cmp(&other.start_time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub emblem: Option<String>, // image URL, unused by the terminal renderer
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    pub id: BetId,
    pub owner_id: ParticipantId,
    pub owner_name: Option<String>,
    pub fixture_id: FixtureId,
    pub prediction: Score,
    pub hidden: bool,
    /// Points awarded upstream; authoritative once the fixture is finished.
    pub points: Option<u32>,
}

/// A scoreline, home goals first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u16,
    pub away: u16,
}

impl Score {
    pub const fn new(home: u16, away: u16) -> Self {
        Self { home, away }
    }

    pub fn outcome(&self) -> Outcome {
        match self.home.cmp(&self.away) {
            Ordering::Greater => Outcome::HomeWin,
            Ordering::Equal => Outcome::Draw,
            Ordering::Less => Outcome::AwayWin,
        }
    }

    pub fn goal_difference(&self) -> i32 {
        i32::from(self.home) - i32::from(self.away)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.home, self.away)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub username: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn score_outcome_follows_sign_of_difference() {
        assert_eq!(Score::new(2, 1).outcome(), Outcome::HomeWin);
        assert_eq!(Score::new(1, 1).outcome(), Outcome::Draw);
        assert_eq!(Score::new(0, 3).outcome(), Outcome::AwayWin);
        assert_eq!(Score::new(0, 3).goal_difference(), -3);
    }

    #[test]
    fn upsert_bet_replaces_existing_prediction() {
        let mut f = fixture(10, kickoff(15, 0), None);
        f.bets.push(bet(1, (7, "ann"), 10, (1, 0), None));
        let mut t = tournament(vec![f]);

        t.upsert_bet(bet(1, (7, "ann"), 10, (2, 2), None));
        t.upsert_bet(bet(2, (8, "bob"), 10, (0, 1), None));

        let bets = &t.find_fixture(10).unwrap().bets;
        assert_eq!(bets.len(), 2, "update must replace, never duplicate");
        assert_eq!(bets[0].prediction, Score::new(2, 2));
    }

    #[test]
    fn fixtures_by_kickoff_breaks_ties_by_id() {
        let t = tournament(vec![
            fixture(3, kickoff(18, 0), None),
            fixture(2, kickoff(15, 0), None),
            fixture(1, kickoff(18, 0), None),
        ]);
        let order: Vec<_> = t.fixtures_by_kickoff().iter().map(|f| f.id).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }
}
