use crate::{Bet, BetId, EngineError, Fixture, FixtureId, ParticipantId, Score, Tournament};

/// Accuracy tier of a prediction, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Miss,
    /// Right winner (or draw), wrong margin.
    Outcome,
    /// Right winner and goal difference, wrong score.
    Margin,
    Exact,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Miss, Tier::Outcome, Tier::Margin, Tier::Exact];

    pub fn points(&self) -> u32 {
        match self {
            Tier::Miss => 0,
            Tier::Outcome => 1,
            Tier::Margin => 3,
            Tier::Exact => 5,
        }
    }

    pub fn from_points(points: u32) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.points() == points)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Miss => "miss",
            Tier::Outcome => "outcome",
            Tier::Margin => "margin",
            Tier::Exact => "exact",
        }
    }
}

pub fn grade(predicted: Score, actual: Score) -> Tier {
    if predicted == actual {
        return Tier::Exact;
    }
    if predicted.outcome() != actual.outcome() {
        return Tier::Miss;
    }
    if predicted.goal_difference() == actual.goal_difference() {
        Tier::Margin
    } else {
        Tier::Outcome
    }
}

/// Local point computation. Upstream-supplied points win whenever present;
/// see [`resolve_points`].
pub fn compute_points(predicted: Score, actual: Score) -> u32 {
    grade(predicted, actual).points()
}

/// Points a bet counts for on the board.
///
/// `None` while the fixture is not finished. For finished fixtures the stored
/// value is authoritative and only a missing one is recomputed locally.
pub fn resolve_points(fixture: &Fixture, bet: &Bet) -> Result<Option<u32>, EngineError> {
    if !fixture.finished {
        return Ok(None);
    }
    if let Some(points) = bet.points {
        return Ok(Some(points));
    }
    let actual = final_score(fixture)?;
    Ok(Some(compute_points(bet.prediction, actual)))
}

/// Tier a finished bet landed in, validated against the known point values.
pub fn resolve_tier(fixture: &Fixture, bet: &Bet) -> Result<Option<Tier>, EngineError> {
    let Some(points) = resolve_points(fixture, bet)? else {
        return Ok(None);
    };
    Tier::from_points(points)
        .map(Some)
        .ok_or(EngineError::UnknownTier { bet_id: bet.id, points })
}

pub fn final_score(fixture: &Fixture) -> Result<Score, EngineError> {
    fixture
        .score
        .ok_or(EngineError::MissingActualScore { fixture_id: fixture.id })
}

/// A finished bet whose stored points disagree with local recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsMismatch {
    pub bet_id: BetId,
    pub fixture_id: FixtureId,
    pub owner_id: ParticipantId,
    pub stored: u32,
    pub computed: u32,
}

/// Recompute every finished bet and report disagreements with upstream.
pub fn audit_points(tournament: &Tournament) -> Result<Vec<PointsMismatch>, EngineError> {
    let mut mismatches = Vec::new();
    for fixture in tournament.fixtures.iter().filter(|f| f.finished) {
        let actual = final_score(fixture)?;
        for bet in &fixture.bets {
            let Some(stored) = bet.points else {
                continue;
            };
            let computed = compute_points(bet.prediction, actual);
            if stored != computed {
                mismatches.push(PointsMismatch {
                    bet_id: bet.id,
                    fixture_id: fixture.id,
                    owner_id: bet.owner_id,
                    stored,
                    computed,
                });
            }
        }
    }
    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;

    fn s(home: u16, away: u16) -> Score {
        Score::new(home, away)
    }

    #[test]
    fn worked_examples() {
        assert_eq!(compute_points(s(2, 1), s(2, 1)), 5);
        assert_eq!(compute_points(s(2, 1), s(3, 2)), 3);
        assert_eq!(compute_points(s(2, 1), s(1, 0)), 3);
        assert_eq!(compute_points(s(2, 1), s(3, 0)), 1);
        assert_eq!(compute_points(s(2, 1), s(0, 1)), 0);
    }

    #[test]
    fn exact_score_always_earns_top_tier() {
        for home in 0..6 {
            for away in 0..6 {
                assert_eq!(compute_points(s(home, away), s(home, away)), 5);
            }
        }
    }

    #[test]
    fn tiers_hold_over_a_grid_of_results() {
        for ph in 0..5u16 {
            for pa in 0..5u16 {
                for ah in 0..5u16 {
                    for aa in 0..5u16 {
                        let (p, a) = (s(ph, pa), s(ah, aa));
                        let expected = if p == a {
                            5
                        } else if p.outcome() != a.outcome() {
                            0
                        } else if p.goal_difference() == a.goal_difference() {
                            3
                        } else {
                            1
                        };
                        assert_eq!(compute_points(p, a), expected, "{p} vs {a}");
                    }
                }
            }
        }
    }

    #[test]
    fn drawn_predictions_on_other_draws_hit_margin() {
        assert_eq!(grade(s(1, 1), s(2, 2)), Tier::Margin);
        assert_eq!(grade(s(0, 0), s(1, 0)), Tier::Miss);
    }

    #[test]
    fn tiers_are_strictly_ordered_and_nonzero_above_miss() {
        let points: Vec<u32> = Tier::ALL.iter().map(Tier::points).collect();
        assert_eq!(points, vec![0, 1, 3, 5]);
        assert_eq!(Tier::from_points(3), Some(Tier::Margin));
        assert_eq!(Tier::from_points(2), None);
    }

    #[test]
    fn stored_points_are_authoritative() {
        let f = fixture(1, kickoff(15, 0), Some((2, 1)));
        let b = bet(1, (7, "ann"), 1, (0, 0), Some(5));
        assert_eq!(resolve_points(&f, &b), Ok(Some(5)));
    }

    #[test]
    fn missing_points_are_recomputed_for_finished_fixtures() {
        let f = fixture(1, kickoff(15, 0), Some((2, 1)));
        let b = bet(1, (7, "ann"), 1, (3, 2), None);
        assert_eq!(resolve_points(&f, &b), Ok(Some(3)));
    }

    #[test]
    fn unfinished_fixture_yields_no_points() {
        let f = fixture(1, kickoff(15, 0), None);
        let b = bet(1, (7, "ann"), 1, (3, 2), Some(5));
        assert_eq!(resolve_points(&f, &b), Ok(None));
    }

    #[test]
    fn finished_fixture_without_score_is_an_integrity_error() {
        let mut f = fixture(8, kickoff(15, 0), None);
        f.finished = true;
        let b = bet(1, (7, "ann"), 8, (3, 2), None);
        let err = resolve_points(&f, &b).unwrap_err();
        assert_eq!(err, EngineError::MissingActualScore { fixture_id: 8 });
        assert!(err.is_data_integrity());
    }

    #[test]
    fn off_scheme_points_are_rejected_by_tier_resolution() {
        let f = fixture(1, kickoff(15, 0), Some((2, 1)));
        let b = bet(4, (7, "ann"), 1, (2, 1), Some(2));
        assert_eq!(resolve_tier(&f, &b), Err(EngineError::UnknownTier { bet_id: 4, points: 2 }));
    }

    #[test]
    fn audit_flags_disagreeing_points() {
        let mut done = fixture(1, kickoff(15, 0), Some((2, 1)));
        done.bets = vec![
            bet(1, (7, "ann"), 1, (2, 1), Some(5)),
            bet(2, (8, "bob"), 1, (1, 0), Some(2)),
            bet(3, (9, "cid"), 1, (0, 2), None),
        ];
        let mut open = fixture(2, kickoff(18, 0), None);
        open.bets = vec![bet(4, (7, "ann"), 2, (1, 1), Some(9))];

        let report = audit_points(&tournament(vec![done, open])).unwrap();
        assert_eq!(
            report,
            vec![PointsMismatch { bet_id: 2, fixture_id: 1, owner_id: 8, stored: 2, computed: 3 }]
        );
    }
}
