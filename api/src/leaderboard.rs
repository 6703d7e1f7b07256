//! Turns a validated tournament snapshot into the data the board renders:
//! ranked participants, classified cells, ordered fixtures and the rows a
//! participant can still bet on.

use crate::clock::{GameClock, GameState};
use crate::scoring::{Tier, final_score, resolve_tier};
use crate::{
    Bet, EngineError, Fixture, FixtureId, Participant, ParticipantId, Score, Team, Tournament,
    TournamentId,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Points,
    Alphabetical,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            SortOrder::Points => SortOrder::Alphabetical,
            SortOrder::Alphabetical => SortOrder::Points,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Points => "by points",
            SortOrder::Alphabetical => "by name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub participant: Participant,
    pub total_points: u32,
    pub exact: u32,
    pub margin: u32,
    pub outcome: u32,
    pub bets_placed: u32,
}

impl Standing {
    fn new(participant: Participant) -> Self {
        Self {
            participant,
            total_points: 0,
            exact: 0,
            margin: 0,
            outcome: 0,
            bets_placed: 0,
        }
    }

    fn record(&mut self, tier: Tier) {
        self.total_points += tier.points();
        match tier {
            Tier::Exact => self.exact += 1,
            Tier::Margin => self.margin += 1,
            Tier::Outcome => self.outcome += 1,
            Tier::Miss => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot validation
// ---------------------------------------------------------------------------

/// Check the structural invariants every other operation relies on.
pub fn validate(tournament: &Tournament) -> Result<(), EngineError> {
    for fixture in &tournament.fixtures {
        if fixture.finished {
            final_score(fixture)?;
        }
        let mut owners = HashSet::new();
        for bet in &fixture.bets {
            if bet.fixture_id != fixture.id {
                return Err(EngineError::ForeignBet {
                    bet_id: bet.id,
                    attached_to: fixture.id,
                    references: bet.fixture_id,
                });
            }
            if !owners.insert(bet.owner_id) {
                return Err(EngineError::DuplicateBet {
                    owner_id: bet.owner_id,
                    fixture_id: fixture.id,
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Participants of the tournament (owners of at least one bet) with their
/// totals, in the requested order.
///
/// Only bets on finished fixtures count; provisional points on open fixtures
/// are ignored.
pub fn aggregate_participants(
    tournament: &Tournament,
    order: SortOrder,
) -> Result<Vec<Standing>, EngineError> {
    validate(tournament)?;

    // Owner name (first non-blank one seen) and the resolved tier of every bet.
    let mut owners: BTreeMap<ParticipantId, (Option<String>, Vec<Option<Tier>>)> = BTreeMap::new();
    for (fixture, bet) in tournament.bets() {
        let (name, tiers) = owners.entry(bet.owner_id).or_default();
        if name.is_none() {
            *name = bet.owner_name.clone().filter(|n| !n.trim().is_empty());
        }
        tiers.push(resolve_tier(fixture, bet)?);
    }

    let mut standings = Vec::with_capacity(owners.len());
    for (id, (name, tiers)) in owners {
        let username = name.ok_or(EngineError::UnnamedOwner { owner_id: id })?;
        let mut standing = Standing::new(Participant { id, username });
        standing.bets_placed = tiers.len() as u32;
        for tier in tiers.into_iter().flatten() {
            standing.record(tier);
        }
        standings.push(standing);
    }

    sort_standings(&mut standings, order);
    Ok(standings)
}

/// Alphabetical order is case-insensitive. The points order is a stable sort
/// applied on top of it, so participants level on points stay alphabetical.
pub fn sort_standings(standings: &mut [Standing], order: SortOrder) {
    standings.sort_by_key(|s| s.participant.username.to_lowercase());
    if order == SortOrder::Points {
        standings.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placing {
    pub place: usize,
    pub standing: Standing,
}

/// Final table for a completed tournament: total, then exact hits, margin hits
/// and outcome hits break ties. Anything still level stays alphabetical.
pub fn final_standings(tournament: &Tournament) -> Result<Vec<Placing>, EngineError> {
    if let Some(open) = tournament.fixtures_by_kickoff().into_iter().find(|f| !f.finished) {
        return Err(EngineError::TournamentInProgress { fixture_id: open.id });
    }

    let mut standings = aggregate_participants(tournament, SortOrder::Alphabetical)?;
    standings.sort_by(|a, b| {
        (b.total_points, b.exact, b.margin, b.outcome).cmp(&(
            a.total_points,
            a.exact,
            a.margin,
            a.outcome,
        ))
    });

    Ok(standings
        .into_iter()
        .enumerate()
        .map(|(idx, standing)| Placing { place: idx + 1, standing })
        .collect())
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    NoBet,
    /// Upcoming fixture, prediction visible to the viewer.
    Placed,
    /// Upcoming fixture, prediction concealed from the viewer.
    Hidden,
    /// Fixture in play, points not final.
    Pending,
    Exact,
    Margin,
    Outcome,
    Miss,
}

impl CellKind {
    pub fn tag(&self) -> &'static str {
        match self {
            CellKind::NoBet => "no-bet",
            CellKind::Placed => "placed",
            CellKind::Hidden => "hidden",
            CellKind::Pending => "pending",
            CellKind::Exact => "exact",
            CellKind::Margin => "margin",
            CellKind::Outcome => "outcome",
            CellKind::Miss => "miss",
        }
    }
}

impl From<Tier> for CellKind {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Exact => CellKind::Exact,
            Tier::Margin => CellKind::Margin,
            Tier::Outcome => CellKind::Outcome,
            Tier::Miss => CellKind::Miss,
        }
    }
}

/// One participant's prediction on one fixture, as the viewer may see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    /// `None` when there is no bet or the prediction is masked.
    pub score: Option<Score>,
    pub points: Option<u32>,
}

impl Cell {
    pub const MASK: &'static str = "?:?";

    pub fn display_score(&self) -> String {
        match (self.kind, self.score) {
            (CellKind::NoBet, _) => "-".to_string(),
            (CellKind::Hidden, _) | (_, None) => Self::MASK.to_string(),
            (_, Some(score)) => score.to_string(),
        }
    }
}

/// Classify a (possibly missing) bet for display.
///
/// A hidden prediction on an upcoming fixture is only revealed to its owner;
/// everyone else gets a masked cell with no score attached.
pub fn classify_cell(
    fixture: &Fixture,
    bet: Option<&Bet>,
    state: GameState,
    viewer: Option<ParticipantId>,
) -> Result<Cell, EngineError> {
    let Some(bet) = bet else {
        return Ok(Cell { kind: CellKind::NoBet, score: None, points: None });
    };

    let cell = match state {
        GameState::Upcoming if bet.hidden && viewer != Some(bet.owner_id) => {
            Cell { kind: CellKind::Hidden, score: None, points: None }
        }
        GameState::Upcoming => Cell { kind: CellKind::Placed, score: Some(bet.prediction), points: None },
        GameState::Live => Cell { kind: CellKind::Pending, score: Some(bet.prediction), points: None },
        GameState::Finished => {
            let tier = resolve_tier(fixture, bet)?.ok_or(EngineError::MissingActualScore {
                fixture_id: fixture.id,
            })?;
            Cell {
                kind: tier.into(),
                score: Some(bet.prediction),
                points: Some(tier.points()),
            }
        }
    };
    Ok(cell)
}

// ---------------------------------------------------------------------------
// Upcoming rows
// ---------------------------------------------------------------------------

/// A fixture the participant can still act on, with their bet if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingRow {
    pub fixture_id: FixtureId,
    pub start_time: DateTime<Utc>,
    pub home: Team,
    pub away: Team,
    pub bet: Option<Bet>,
}

impl UpcomingRow {
    fn from_fixture(fixture: &Fixture, bet: Option<&Bet>) -> Self {
        Self {
            fixture_id: fixture.id,
            start_time: fixture.start_time,
            home: fixture.home.clone(),
            away: fixture.away.clone(),
            bet: bet.cloned(),
        }
    }
}

/// Merge bet-bearing rows and placeholder rows into one list ordered by
/// kickoff, then fixture id.
pub fn merge_upcoming_view(
    bets: Vec<(&Fixture, &Bet)>,
    fixtures_not_yet_bet: Vec<&Fixture>,
) -> Vec<UpcomingRow> {
    let mut rows: Vec<UpcomingRow> = bets
        .into_iter()
        .map(|(fixture, bet)| UpcomingRow::from_fixture(fixture, Some(bet)))
        .chain(
            fixtures_not_yet_bet
                .into_iter()
                .map(|fixture| UpcomingRow::from_fixture(fixture, None)),
        )
        .collect();
    rows.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.fixture_id.cmp(&b.fixture_id))
    });
    rows
}

/// Rows for every fixture still open for betting, from `participant`'s side.
pub fn upcoming_view(
    tournament: &Tournament,
    participant: ParticipantId,
    clock: &GameClock,
) -> Result<Vec<UpcomingRow>, EngineError> {
    validate(tournament)?;

    let mut with_bet = Vec::new();
    let mut without_bet = Vec::new();
    for fixture in tournament.fixtures.iter().filter(|f| clock.state_of(f).accepts_bets()) {
        match fixture.bet_of(participant) {
            Some(bet) => with_bet.push((fixture, bet)),
            None => without_bet.push(fixture),
        }
    }
    Ok(merge_upcoming_view(with_bet, without_bet))
}

// ---------------------------------------------------------------------------
// View-model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub fixture_id: FixtureId,
    pub title: Option<String>,
    pub home: Team,
    pub away: Team,
    /// Kickoff expressed in the reference timezone.
    pub kickoff: DateTime<FixedOffset>,
    pub state: GameState,
    /// Final score, finished fixtures only.
    pub score: Option<Score>,
    /// One cell per entry of `Leaderboard::standings`, same order.
    pub cells: Vec<Cell>,
}

/// Everything the board shows for one render pass. Built fresh from the
/// snapshot each time; nothing in here is mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub tournament_id: TournamentId,
    pub tournament_name: String,
    pub order: SortOrder,
    pub generated_at: DateTime<FixedOffset>,
    pub standings: Vec<Standing>,
    pub fixtures: Vec<FixtureRow>,
}

impl Leaderboard {
    pub fn position_of(&self, participant: ParticipantId) -> Option<usize> {
        self.standings.iter().position(|s| s.participant.id == participant)
    }

    pub fn count_in_state(&self, state: GameState) -> usize {
        self.fixtures.iter().filter(|f| f.state == state).count()
    }
}

pub fn build_leaderboard(
    tournament: &Tournament,
    clock: &GameClock,
    viewer: Option<ParticipantId>,
    order: SortOrder,
) -> Result<Leaderboard, EngineError> {
    let standings = aggregate_participants(tournament, order)?;

    let mut fixtures = Vec::with_capacity(tournament.fixtures.len());
    for fixture in tournament.fixtures_by_kickoff() {
        let state = clock.state_of(fixture);
        let cells = standings
            .iter()
            .map(|s| classify_cell(fixture, fixture.bet_of(s.participant.id), state, viewer))
            .collect::<Result<Vec<_>, _>>()?;
        fixtures.push(FixtureRow {
            fixture_id: fixture.id,
            title: fixture.title.clone(),
            home: fixture.home.clone(),
            away: fixture.away.clone(),
            kickoff: clock.zone().normalize(&fixture.start_time),
            state,
            score: if state == GameState::Finished { fixture.score } else { None },
            cells,
        });
    }

    Ok(Leaderboard {
        tournament_id: tournament.id,
        tournament_name: tournament.name.clone(),
        order,
        generated_at: clock.now(),
        standings,
        fixtures,
    })
}
